//! Word encoding of the 8x8 transform's input and output matrices.
//!
//! Elements are taken in row-major order and packed least significant
//! first:
//! - input: 16 words, four `i8` per word - element `k` is byte `k % 4` of
//!   word `k / 4`
//! - output: 32 words, two `i16` per word - element `k` is the low half of
//!   word `k / 2` when `k` is even, the high half when odd
//!
//! This is the layout a little endian peer gets by viewing `int8_t[8][8]`
//! and `int16_t[8][8]` arrays as words.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::kernel::Matrix8;
use crate::{Error, Result};

/// Words carrying a transform input.
pub const INPUT_WORDS: usize = 16;

/// Words carrying a transform output.
pub const OUTPUT_WORDS: usize = 32;

/// Decode a transform input.
///
/// Returns [`Error::ValidationFailure`] if fewer than [`INPUT_WORDS`] words
/// are supplied.  Words beyond the first [`INPUT_WORDS`] are ignored.
pub fn decode_input(words: &[u32]) -> Result<Matrix8<i8>> {
    if words.len() < INPUT_WORDS {
        return Err(Error::ValidationFailure);
    }
    let mut matrix = [[0i8; 8]; 8];
    for (k, element) in matrix.iter_mut().flatten().enumerate() {
        let byte = words[k / 4].to_le_bytes()[k % 4];
        *element = byte as i8;
    }
    Ok(matrix)
}

/// Encode a transform input.  The peer's side of [`decode_input`].
pub fn encode_input(matrix: &Matrix8<i8>) -> [u32; INPUT_WORDS] {
    let mut words = [0u32; INPUT_WORDS];
    for (k, &element) in matrix.iter().flatten().enumerate() {
        words[k / 4] |= (element as u8 as u32) << (8 * (k % 4));
    }
    words
}

/// Encode a transform output into `words`.
///
/// Returns the number of words written, always [`OUTPUT_WORDS`], or
/// [`Error::InvalidLength`] if `words` is too short.
pub fn encode_output(matrix: &Matrix8<i16>, words: &mut [u32]) -> Result<usize> {
    let out = words
        .get_mut(..OUTPUT_WORDS)
        .ok_or(Error::InvalidLength)?;
    out.fill(0);
    for (k, &element) in matrix.iter().flatten().enumerate() {
        out[k / 2] |= (element as u16 as u32) << (16 * (k % 2));
    }
    Ok(OUTPUT_WORDS)
}

/// Decode a transform output.  The peer's side of [`encode_output`].
pub fn decode_output(words: &[u32]) -> Result<Matrix8<i16>> {
    if words.len() < OUTPUT_WORDS {
        return Err(Error::ValidationFailure);
    }
    let mut matrix = [[0i16; 8]; 8];
    for (k, element) in matrix.iter_mut().flatten().enumerate() {
        *element = (words[k / 2] >> (16 * (k % 2))) as u16 as i16;
    }
    Ok(matrix)
}
