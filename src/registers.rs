// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Layout of the overlay register image and its bit fields.
//!
//! The hardware fetches this block from GPU memory when OVADD is written, so
//! the field order and sizes are an ABI: do not reorder.

use std::mem::offset_of;
use std::mem::size_of;

use static_assertions::const_assert_eq;
use zerocopy::FromBytes;
use zerocopy::FromZeros;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;

use crate::coefficients::FilterCoefficients;
use crate::coefficients::N_HORIZ_UV_TAPS;
use crate::coefficients::N_HORIZ_Y_TAPS;
use crate::coefficients::N_PHASES;
use crate::coefficients::N_VERT_UV_TAPS;
use crate::coefficients::N_VERT_Y_TAPS;
use crate::config::OverlayConfig;

pub const OCMD_ENABLE: u32 = 0x1;
pub const OCMD_FORMAT_MASK: u32 = 0xf << 10;
pub const OCMD_PACKED_ORDER_MASK: u32 = 0x3 << 14;

pub const OVERLAY_FORMAT_PACKED_YUV422: u32 = 0x8 << 10;
pub const OVERLAY_FORMAT_PLANAR_NV12_2: u32 = 0xb << 10;
pub const OVERLAY_FORMAT_PLANAR_YUV420: u32 = 0xc << 10;
pub const OVERLAY_PACKED_ORDER_YUY2: u32 = 0;
pub const OVERLAY_PACKED_ORDER_UYVY: u32 = 0x1 << 14;

const OCONFIG_CC_OUT_8BIT: u32 = 0x1 << 3;
const OCONFIG_IEP_BYPASS: u32 = 0x1 << 27;
const SCHRKEN_KEY_ENABLE_MASK: u32 = 0x7 << 24;

/// The overlay register block, 0x700 bytes.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct OverlayRegisters {
    pub obuf_0y: u32,
    pub obuf_1y: u32,
    pub obuf_0u: u32,
    pub obuf_0v: u32,
    pub obuf_1u: u32,
    pub obuf_1v: u32,
    pub ostride: u32,
    pub yrgb_vph: u32,
    pub uv_vph: u32,
    pub horz_ph: u32,
    pub init_phs: u32,
    pub dwinpos: u32,
    pub dwinsz: u32,
    pub swidth: u32,
    pub swidthsw: u32,
    pub sheight: u32,
    pub yrgbscale: u32,
    pub uvscale: u32,
    pub oclrc0: u32,
    pub oclrc1: u32,
    pub dclrkv: u32,
    pub dclrkm: u32,
    pub schrkvh: u32,
    pub schrkvl: u32,
    pub schrken: u32,
    pub oconfig: u32,
    pub ocmd: u32,
    reserved1: u32,
    pub ostart_0y: u32,
    pub ostart_1y: u32,
    pub ostart_0u: u32,
    pub ostart_0v: u32,
    pub ostart_1u: u32,
    pub ostart_1v: u32,
    pub otileoff_0y: u32,
    pub otileoff_1y: u32,
    pub otileoff_0u: u32,
    pub otileoff_0v: u32,
    pub otileoff_1u: u32,
    pub otileoff_1v: u32,
    pub fasthscale: u32,
    pub uvscalev: u32,
    reserved_c: [u32; (0x200 - 0xa8) / 4],
    pub y_vcoefs: [u16; N_VERT_Y_TAPS * N_PHASES],
    reserved_d: [u16; 0x100 / 2 - N_VERT_Y_TAPS * N_PHASES],
    pub y_hcoefs: [u16; N_HORIZ_Y_TAPS * N_PHASES],
    reserved_e: [u16; 0x200 / 2 - N_HORIZ_Y_TAPS * N_PHASES],
    pub uv_vcoefs: [u16; N_VERT_UV_TAPS * N_PHASES],
    reserved_f: [u16; 0x100 / 2 - N_VERT_UV_TAPS * N_PHASES],
    pub uv_hcoefs: [u16; N_HORIZ_UV_TAPS * N_PHASES],
    reserved_g: [u16; 0x100 / 2 - N_HORIZ_UV_TAPS * N_PHASES],
}

const_assert_eq!(size_of::<OverlayRegisters>(), 0x700);
const_assert_eq!(offset_of!(OverlayRegisters, ocmd), 0x68);
const_assert_eq!(offset_of!(OverlayRegisters, uvscalev), 0xa4);
const_assert_eq!(offset_of!(OverlayRegisters, y_vcoefs), 0x200);
const_assert_eq!(offset_of!(OverlayRegisters, y_hcoefs), 0x300);
const_assert_eq!(offset_of!(OverlayRegisters, uv_vcoefs), 0x500);
const_assert_eq!(offset_of!(OverlayRegisters, uv_hcoefs), 0x600);

/// The three scale registers compared frame to frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScaleRegisters {
    pub yrgbscale: u32,
    pub uvscale: u32,
    pub uvscalev: u32,
}

/// Packs a horizontal scale register: integer part in bits 15.., horizontal
/// fraction in bits 3..15, vertical fraction in bits 20...
pub fn scale_register(x_int: u32, x_fract: u32, y_fract: u32) -> u32 {
    (x_int << 15) | ((x_fract & 0xfff) << 3) | ((y_fract & 0xfff) << 20)
}

/// Packs two 16 bit halves, `low` in bits 0..16.
pub fn pack_halves(low: u32, high: u32) -> u32 {
    (high << 16) | low
}

/// Computes SWIDTHSW for one plane: how many 64 byte units, times two minus
/// one, the fetcher reads per line when starting at `offset`.
pub fn calculate_swidth_sw(offset: u32, width: u32) -> u32 {
    let swidth = ((offset + width + 0x3f) >> 6) - (offset >> 6);
    // An empty line yields all ones.
    (swidth << 1).wrapping_sub(1)
}

impl OverlayRegisters {
    pub fn zeroed() -> Self {
        Self::new_zeroed()
    }

    pub fn reset(&mut self, config: &OverlayConfig) {
        self.zero();
        self.oclrc0 = (config.init_contrast << 18) | (config.init_brightness as u32 & 0xff);
        self.oclrc1 = config.init_saturation;
        self.dclrkv = config.init_colorkey;
        self.dclrkm = config.init_colorkey_mask;
        self.oconfig = OCONFIG_CC_OUT_8BIT | OCONFIG_IEP_BYPASS;
        self.schrken &= !SCHRKEN_KEY_ENABLE_MASK;
        self.schrken |= 0xff;
    }

    pub fn is_enabled(&self) -> bool {
        self.ocmd & OCMD_ENABLE != 0
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.ocmd |= OCMD_ENABLE;
        } else {
            self.ocmd &= !OCMD_ENABLE;
        }
    }

    pub fn scale(&self) -> ScaleRegisters {
        ScaleRegisters {
            yrgbscale: self.yrgbscale,
            uvscale: self.uvscale,
            uvscalev: self.uvscalev,
        }
    }

    pub fn set_scale(&mut self, scale: &ScaleRegisters) {
        self.yrgbscale = scale.yrgbscale;
        self.uvscale = scale.uvscale;
        self.uvscalev = scale.uvscalev;
    }

    /// Replaces the source format bits of OCMD.
    pub fn set_format(&mut self, command_bits: u32) {
        self.ocmd &= !(OCMD_FORMAT_MASK | OCMD_PACKED_ORDER_MASK);
        self.ocmd |= command_bits;
    }

    pub fn set_horizontal_coefficients(
        &mut self,
        luma: &FilterCoefficients,
        chroma: &FilterCoefficients,
    ) {
        for (reg, coeff) in self.y_hcoefs.iter_mut().zip(luma.iter()) {
            *reg = coeff.to_register();
        }
        for (reg, coeff) in self.uv_hcoefs.iter_mut().zip(chroma.iter()) {
            *reg = coeff.to_register();
        }
    }
}
