//! Naive 8x8 DCT-II.
//!
//! ```text
//! X(u,v) = C(u)/2 * C(v)/2 * sum[i=0..8] sum[j=0..8] x(i,j) * cos((2i+1)u*pi/16) * cos((2j+1)v*pi/16)
//! ```
//!
//! with `C(0) = 1/sqrt(2)` and `C(k) = 1` otherwise.  The only optimization
//! is the cosine lookup table.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::kernel::{Matrix8, TransformKernel};

const SQRT_2_INV: f64 = core::f64::consts::FRAC_1_SQRT_2;

// cos(k * pi / 16) for k in 0..32
const COS_LOOKUP: [f64; 32] = [
    1.0,
    0.980_785_280_403_230_4,
    0.923_879_532_511_286_7,
    0.831_469_612_302_545_2,
    0.707_106_781_186_547_5,
    0.555_570_233_019_602_2,
    0.382_683_432_365_089_8,
    0.195_090_322_016_128_27,
    0.0,
    -0.195_090_322_016_128_27,
    -0.382_683_432_365_089_8,
    -0.555_570_233_019_602_2,
    -0.707_106_781_186_547_5,
    -0.831_469_612_302_545_2,
    -0.923_879_532_511_286_7,
    -0.980_785_280_403_230_4,
    -1.0,
    -0.980_785_280_403_230_4,
    -0.923_879_532_511_286_7,
    -0.831_469_612_302_545_2,
    -0.707_106_781_186_547_5,
    -0.555_570_233_019_602_2,
    -0.382_683_432_365_089_8,
    -0.195_090_322_016_128_27,
    0.0,
    0.195_090_322_016_128_27,
    0.382_683_432_365_089_8,
    0.555_570_233_019_602_2,
    0.707_106_781_186_547_5,
    0.831_469_612_302_545_2,
    0.923_879_532_511_286_7,
    0.980_785_280_403_230_4,
];

/// Reference DCT, O(n^4).
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveDct;

impl TransformKernel for NaiveDct {
    fn transform(&mut self, input: &Matrix8<i8>) -> Matrix8<i16> {
        let mut output = [[0i16; 8]; 8];
        for (u, out_row) in output.iter_mut().enumerate() {
            let c_u = if u == 0 { SQRT_2_INV } else { 1.0 };
            for (v, out) in out_row.iter_mut().enumerate() {
                let c_v = if v == 0 { SQRT_2_INV } else { 1.0 };
                let mut sum = 0.0;
                for (i, in_row) in input.iter().enumerate() {
                    let cos_u = COS_LOOKUP[((2 * i + 1) * u) % 32];
                    for (j, &x) in in_row.iter().enumerate() {
                        let cos_v = COS_LOOKUP[((2 * j + 1) * v) % 32];
                        sum += x as f64 * cos_u * cos_v;
                    }
                }
                *out = round_i16(c_u * c_v * sum / 4.0);
            }
        }
        output
    }
}

// Half away from zero.  Saturates rather than wraps, though an 8x8 block of
// i8 can't exceed +/-1024.
fn round_i16(value: f64) -> i16 {
    if value >= 0.0 {
        (value + 0.5) as i16
    } else {
        (value - 0.5) as i16
    }
}
