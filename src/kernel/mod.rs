//! Numeric kernels run on behalf of the peer.
//!
//! The handlers only depend on the traits here; [`NaiveDct`] and
//! [`Clifford`] are the implementations the firmware ships with.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod clifford;
pub mod dct;

pub use clifford::Clifford;
pub use dct::NaiveDct;

/// 8x8 matrix, indexed `[row][column]`.
pub type Matrix8<T> = [[T; 8]; 8];

/// Width of a generated image, in pixels.
pub const IMAGE_WIDTH: usize = 128;

/// Height of a generated image, in pixels.
pub const IMAGE_HEIGHT: usize = 128;

/// Size of a generated image - one byte per pixel.
pub const IMAGE_BYTES: usize = IMAGE_WIDTH * IMAGE_HEIGHT;

/// 8x8 transform of small signed samples into wider coefficients.
pub trait TransformKernel {
    /// Must populate every element of the output.
    fn transform(&mut self, input: &Matrix8<i8>) -> Matrix8<i16>;
}

/// Generates a fixed size greyscale image in place.
pub trait ImageGenerator {
    fn generate(&mut self, image: &mut [u8; IMAGE_BYTES]);
}
