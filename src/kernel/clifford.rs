//! Clifford attractor image generator.
//!
//! Iterates
//!
//! ```text
//! x' = sin(a*y) + c*cos(a*x)
//! y' = sin(b*x) + d*cos(b*y)
//! ```
//!
//! and darkens the pixel each point lands on.  The image starts white (255)
//! and each hit subtracts [`STEP`], stopping once a pixel is darker than
//! a single step.
//!
//! The generator writes straight into memory the peer can see, so the peer
//! observes the image filling in while this runs.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::kernel::{IMAGE_BYTES, IMAGE_HEIGHT, IMAGE_WIDTH, ImageGenerator};

/// Amount each hit darkens a pixel by.
pub const STEP: u8 = 16;

const A: f32 = -2.0;
const B: f32 = -2.4;
const C: f32 = 1.1;
const D: f32 = -0.9;

/// Clifford attractor generator
#[derive(Debug, Clone, Copy)]
pub struct Clifford {
    iterations: u32,
}

impl Clifford {
    pub const DEFAULT_ITERATIONS: u32 = 200_000;

    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for Clifford {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITERATIONS)
    }
}

impl ImageGenerator for Clifford {
    fn generate(&mut self, image: &mut [u8; IMAGE_BYTES]) {
        let x_center = IMAGE_WIDTH as f32 / 2.0;
        let y_center = IMAGE_HEIGHT as f32 / 2.0;
        let scale = IMAGE_WIDTH as f32 / 5.1;

        image.fill(255);

        let mut x = 0.0f32;
        let mut y = 0.0f32;
        for i in 0..self.iterations {
            if i % 4096 == 0 {
                trace!("Generator iteration {i}");
            }

            let x1 = libm::sinf(A * y) + C * libm::cosf(A * x);
            let y1 = libm::sinf(B * x) + D * libm::cosf(B * y);
            x = x1;
            y = y1;

            let px = libm::roundf(x * scale + x_center) as i32;
            let py = libm::roundf(y * scale + y_center) as i32;
            if !(0..IMAGE_WIDTH as i32).contains(&px) || !(0..IMAGE_HEIGHT as i32).contains(&py) {
                continue;
            }

            let pixel = &mut image[px as usize + IMAGE_WIDTH * py as usize];
            if *pixel >= STEP {
                *pixel -= STEP;
            }
        }
    }
}
