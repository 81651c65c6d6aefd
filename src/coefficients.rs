// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Polyphase filter taps for the overlay scaler.
//!
//! The scaler interpolates each output pixel from `taps` input pixels using
//! one of [`N_PHASES`] sets of weights, selected by the sub-pixel position.
//! The weights are a Hamming-windowed sinc sampled at 32 points per tap,
//! normalized per phase and stored in the registers as a small float:
//! `sign:1 | exponent:3 | mantissa:12`, with value
//! `mantissa / 4096 * 2^(1 - exponent)`.
//!
//! Quantization perturbs the per-phase sum, which the hardware expects to be
//! exactly one. The residual is pushed into the taps starting at the center
//! and moving outward, alternating left then right. That order is what the
//! hardware tables were validated with and must not change.

use log::trace;

use crate::OverlayError;
use crate::Result;

pub const N_PHASES: usize = 17;
pub const MAX_TAPS: usize = 5;
pub const N_HORIZ_Y_TAPS: usize = 5;
pub const N_VERT_Y_TAPS: usize = 3;
pub const N_HORIZ_UV_TAPS: usize = 3;
pub const N_VERT_UV_TAPS: usize = 3;

/// Samples of the windowed sinc per tap.
const SAMPLES_PER_TAP: usize = 32;

// Truncated value the register tables were generated with.
#[allow(clippy::approx_constant)]
const PI: f64 = 3.1415926535;

/// One quantized filter weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coefficient {
    pub sign: u16,
    pub exponent: u16,
    pub mantissa: u16,
}

impl Coefficient {
    pub fn to_register(self) -> u16 {
        (self.sign << 15) | (self.exponent << 12) | self.mantissa
    }

    /// The weight this register value encodes.
    pub fn value(self) -> f64 {
        let magnitude =
            f64::from(self.mantissa) / 4096.0 * 2f64.powi(1 - i32::from(self.exponent));
        if self.sign != 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Quantizes `coeff` with a `mant_size` bit mantissa, picking the finest
/// exponent the value fits in. Returns the register value together with the
/// weight it actually represents.
fn quantize(coeff: f64, mant_size: u32) -> Result<(Coefficient, f64)> {
    let max_val = 1i64 << mant_size;
    let res = 12 - mant_size;
    let (sign, c) = if coeff < 0.0 { (1, -coeff) } else { (0, coeff) };

    // (exponent, numerator scale, denominator) from the finest to the coarsest step.
    let steps = [
        (3, 4.0, 4 * max_val),
        (2, 2.0, 2 * max_val),
        (1, 1.0, max_val),
        (0, 0.5, max_val / 2),
    ];
    for (exponent, scale, denominator) in steps {
        let icoeff = (c * max_val as f64 * scale + 0.5) as i64;
        if icoeff < max_val {
            let quantized = icoeff as f64 / denominator as f64;
            let coefficient = Coefficient {
                sign,
                exponent,
                mantissa: (icoeff << res) as u16,
            };
            return Ok((coefficient, if sign != 0 { -quantized } else { quantized }));
        }
    }

    Err(OverlayError::CoefficientOutOfRange(coeff))
}

/// Filter taps for every phase, stored phase-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterCoefficients {
    taps: usize,
    table: Vec<Coefficient>,
}

impl FilterCoefficients {
    pub fn phase(&self, phase: usize) -> &[Coefficient] {
        &self.table[phase * self.taps..(phase + 1) * self.taps]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coefficient> {
        self.table.iter()
    }

    /// Sum of the quantized weights of `phase`.
    pub fn phase_sum(&self, phase: usize) -> f64 {
        self.phase(phase).iter().map(|c| c.value()).sum()
    }
}

/// Order in which taps absorb the quantization residual: center, then one
/// step left, one step right, two steps left, and so on. An even tap count
/// ends with the rightmost tap, which has no left partner.
fn adjust_order(taps: usize) -> Vec<usize> {
    let center = (taps - 1) / 2;
    let mut order = Vec::with_capacity(taps);
    order.push(center);
    for j in 1..=center {
        order.push(center - j);
        order.push(center + j);
    }
    if taps % 2 == 0 {
        order.push(taps - 1);
    }
    order
}

/// Generates the taps for a filter of `taps` weights with the given cutoff
/// (1.0 passes everything up to Nyquist of the source, larger values smooth
/// more). The center tap gets two extra mantissa bits except on the vertical
/// chroma filter.
pub fn update_coefficients(
    taps: usize,
    cutoff: f64,
    is_horizontal: bool,
    is_luma: bool,
) -> Result<FilterCoefficients> {
    if taps == 0 || taps > MAX_TAPS {
        return Err(OverlayError::InvalidGeometry(format!("unsupported tap count {}", taps)));
    }
    if !(cutoff > 0.0) {
        return Err(OverlayError::InvalidGeometry(format!("invalid cutoff {}", cutoff)));
    }
    trace!(
        "update_coefficients: taps {}, cutoff {}, horizontal {}, luma {}",
        taps,
        cutoff,
        is_horizontal,
        is_luma
    );

    let mant_size = if is_horizontal { 7 } else { 6 };
    let vertical_chroma = !is_horizontal && !is_luma;
    let center = (taps - 1) / 2;
    let mant_size_for = |tap: usize| {
        if tap == center && !vertical_chroma {
            mant_size + 2
        } else {
            mant_size
        }
    };

    let num = taps * 16;
    let raw: Vec<f64> = (0..num * 2)
        .map(|i| {
            let val = (1.0 / cutoff) * taps as f64 * PI * (i as f64 - num as f64)
                / (2 * num) as f64;
            let sinc = if val == 0.0 { 1.0 } else { val.sin() / val };
            let window = 0.54 - 0.46 * (2.0 * i as f64 * PI / (2 * num - 1) as f64).cos();
            sinc * window
        })
        .collect();

    let order = adjust_order(taps);
    let mut table = vec![Coefficient::default(); taps * N_PHASES];
    for phase in 0..N_PHASES {
        let registers = &mut table[phase * taps..(phase + 1) * taps];

        let samples: Vec<f64> = (0..taps).map(|j| raw[phase + j * SAMPLES_PER_TAP]).collect();
        let sum: f64 = samples.iter().sum();
        let mut coeffs: Vec<f64> = samples.iter().map(|s| s / sum).collect();

        for (tap, coeff) in coeffs.iter_mut().enumerate() {
            let (register, quantized) = quantize(*coeff, mant_size_for(tap))?;
            registers[tap] = register;
            *coeff = quantized;
        }

        let mut sum: f64 = coeffs.iter().sum();
        if sum != 1.0 {
            for &tap in &order {
                coeffs[tap] += 1.0 - sum;
                let (register, quantized) = quantize(coeffs[tap], mant_size_for(tap))?;
                registers[tap] = register;
                coeffs[tap] = quantized;

                sum = coeffs.iter().sum();
                if sum == 1.0 {
                    break;
                }
            }
        }
    }

    Ok(FilterCoefficients { taps, table })
}
