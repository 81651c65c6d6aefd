// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Source offsets, source coordinates and scale factors of a frame.
//!
//! Each stage is computed from the frame layout into a plain value first and
//! only then applied to a register image, so a failing stage never leaves a
//! half-programmed image behind.

use log::debug;
use log::trace;

use crate::buffer_mapper::FrameLayout;
use crate::format;
use crate::registers::calculate_swidth_sw;
use crate::registers::pack_halves;
use crate::registers::scale_register;
use crate::registers::OverlayRegisters;
use crate::registers::ScaleRegisters;
use crate::utils::align_down;
use crate::DisplayMode;
use crate::OverlayError;
use crate::Position;
use crate::Rect;
use crate::Result;

/// Scale factors are fixed point with 12 fractional bits.
const SCALE_ONE: u64 = 1 << 12;

/// Byte offsets of the cropped source planes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferOffsets {
    /// GPU address of the buffer, written to every OSTART register.
    pub start: u32,
    pub y: u32,
    pub u: u32,
    pub v: u32,
    /// OCMD format bits.
    pub command_bits: u32,
}

impl BufferOffsets {
    /// Programs both double-buffer slots with the same offsets.
    pub fn apply(&self, regs: &mut OverlayRegisters) {
        regs.set_format(self.command_bits);

        regs.ostart_0y = self.start;
        regs.ostart_0u = self.start;
        regs.ostart_0v = self.start;
        regs.ostart_1y = self.start;
        regs.ostart_1u = self.start;
        regs.ostart_1v = self.start;

        regs.obuf_0y = self.y;
        regs.obuf_0u = self.u;
        regs.obuf_0v = self.v;
        regs.obuf_1y = self.y;
        regs.obuf_1u = self.u;
        regs.obuf_1v = self.v;
    }
}

pub fn compute_offsets(layout: &FrameLayout) -> Result<BufferOffsets> {
    let desc = format::lookup(layout.format)?;
    let stride = layout.stride;
    let crop = &layout.crop;
    let overflow = || {
        OverlayError::InvalidGeometry(format!(
            "{} source of {} lines with stride {:?} and crop {:?} overflows",
            layout.format, layout.height, stride, crop
        ))
    };
    let planes = desc.plane_offsets(stride, layout.height).ok_or_else(overflow)?;
    let plane_offset = |base: u32, line: u32, pitch: u32| {
        line.checked_mul(pitch)
            .and_then(|offset| offset.checked_add(base))
            .and_then(|offset| offset.checked_add(crop.x))
            .ok_or_else(overflow)
    };

    let offsets = BufferOffsets {
        start: layout.gtt_offset_in_page << 12,
        y: plane_offset(planes.y, crop.y, stride.y)?,
        u: plane_offset(planes.u, crop.y / 2, stride.uv)?,
        v: plane_offset(planes.v, crop.y / 2, stride.uv)?,
        command_bits: desc.command_bits,
    };
    trace!("compute_offsets: {} {:?}", layout.format, offsets);
    Ok(offsets)
}

/// Source size and pitch registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coordinates {
    pub swidth: u32,
    pub swidthsw: u32,
    pub sheight: u32,
    pub ostride: u32,
}

impl Coordinates {
    pub fn apply(&self, regs: &mut OverlayRegisters) {
        regs.swidth = self.swidth;
        regs.swidthsw = self.swidthsw;
        regs.sheight = self.sheight;
        regs.ostride = self.ostride;
    }
}

pub fn compute_coordinates(layout: &FrameLayout, offsets: &BufferOffsets) -> Result<Coordinates> {
    let desc = format::lookup(layout.format)?;
    // Packed formats are fetched as bytes.
    let width = layout.crop.width * desc.bytes_per_pixel;
    let height = layout.crop.height;
    let stride = layout.stride;

    if width == 0 || height == 0 {
        return Err(OverlayError::InvalidGeometry(format!(
            "empty source {}x{}",
            layout.crop.width, height
        )));
    }
    if stride.y == 0 && stride.uv == 0 {
        return Err(OverlayError::InvalidGeometry("source has no stride".to_owned()));
    }

    let swidth_y = calculate_swidth_sw(offsets.y, width);
    let swidth_uv = calculate_swidth_sw(offsets.u, width / 2);
    Ok(Coordinates {
        swidth: pack_halves(width, width / 2),
        swidthsw: (swidth_y << 2) | (swidth_uv << 18),
        sheight: pack_halves(height, height / 2),
        ostride: pack_halves(align_down(stride.y, 64), align_down(stride.uv, 64)),
    })
}

/// Fits `position` inside the active mode of the output, when it has one.
/// Fails if nothing of the window is left on screen.
pub fn clamp_position(position: Position, mode: Option<DisplayMode>) -> Result<Position> {
    let mut pos = position;
    if let Some(mode) = mode.filter(|m| m.width > 0 && m.height > 0) {
        let (mode_width, mode_height) = (mode.width as i64, mode.height as i64);
        pos.x = pos.x.max(0);
        pos.y = pos.y.max(0);
        if pos.x as i64 + pos.width as i64 > mode_width {
            pos.width = (mode_width - pos.x as i64) as i32;
        }
        if pos.y as i64 + pos.height as i64 > mode_height {
            pos.height = (mode_height - pos.y as i64) as i32;
        }
    }

    if pos.width <= 0 || pos.height <= 0 {
        return Err(OverlayError::InvalidGeometry(format!(
            "destination {}x{} at ({}, {}) is empty",
            pos.width, pos.height, pos.x, pos.y
        )));
    }
    Ok(pos)
}

/// Scale factors of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scaling {
    pub registers: ScaleRegisters,
    /// Whether `registers` differ from the previous frame's.
    pub changed: bool,
    /// Horizontal luma and chroma factors, in 1/4096 units.
    pub x_fract: u32,
    pub x_fract_uv: u32,
    pub dwinpos: u32,
    pub dwinsz: u32,
}

impl Scaling {
    /// Filter cutoffs for the horizontal luma and chroma taps, clamped to
    /// `[min, max]`.
    pub fn cutoffs(&self, min: f64, max: f64) -> (f64, f64) {
        let luma = (f64::from(self.x_fract) / SCALE_ONE as f64).clamp(min, max);
        let chroma = (f64::from(self.x_fract_uv) / SCALE_ONE as f64).clamp(min, max);
        (luma, chroma)
    }

    pub fn apply(&self, regs: &mut OverlayRegisters) {
        regs.dwinpos = self.dwinpos;
        regs.dwinsz = self.dwinsz;
        regs.set_scale(&self.registers);
    }
}

/// Computes the down-scale factors from `src` to the clamped destination
/// `dst`. Chroma is subsampled by two in both directions.
pub fn compute_scaling(
    src: &Rect,
    dst: &Position,
    previous: &ScaleRegisters,
    max_ratio: u32,
) -> Result<Scaling> {
    if dst.width <= 0 || dst.height <= 0 {
        return Err(OverlayError::InvalidGeometry(format!(
            "empty destination {}x{}",
            dst.width, dst.height
        )));
    }
    if src.width == 0 || src.height == 0 {
        return Err(OverlayError::InvalidGeometry(format!(
            "empty source {}x{}",
            src.width, src.height
        )));
    }
    let (src_w, src_h) = (u64::from(src.width), u64::from(src.height));
    let (dst_w, dst_h) = (dst.width as u64, dst.height as u64);

    let (x_fract, y_fract) = if src_w == dst_w && src_h == dst_h {
        (SCALE_ONE, SCALE_ONE)
    } else {
        (((src_w - 1) << 12) / dst_w, ((src_h - 1) << 12) / dst_h)
    };

    // Round luma to a multiple of two so the luma/chroma ratio stays exact.
    let x_fract_uv = x_fract / 2;
    let y_fract_uv = y_fract / 2;
    let x_fract = x_fract_uv * 2;
    let y_fract = y_fract_uv * 2;

    let x_int = x_fract >> 12;
    let y_int = y_fract >> 12;
    let x_int_uv = x_fract_uv >> 12;
    let y_int_uv = y_fract_uv >> 12;

    let max_ratio = u64::from(max_ratio);
    if x_int > max_ratio || x_int_uv > max_ratio {
        return Err(OverlayError::InvalidGeometry(format!(
            "scaling {} to {} exceeds the maximum ratio {}",
            src.width, dst.width, max_ratio
        )));
    }

    // Every value left fits in 32 bits: the fractions of the unchecked
    // vertical factor are masked by `scale_register`.
    let registers = ScaleRegisters {
        yrgbscale: scale_register(x_int as u32, x_fract as u32, y_fract as u32),
        uvscale: scale_register(x_int_uv as u32, x_fract_uv as u32, y_fract_uv as u32),
        uvscalev: pack_halves(y_int_uv as u32, y_int as u32),
    };
    let changed = registers != *previous;
    debug!(
        "compute_scaling: {}x{} -> {}x{}, x {}/4096 y {}/4096{}",
        src.width,
        src.height,
        dst.width,
        dst.height,
        x_fract,
        y_fract,
        if changed { ", changed" } else { "" }
    );

    Ok(Scaling {
        registers,
        changed,
        x_fract: x_fract as u32,
        x_fract_uv: x_fract_uv as u32,
        dwinpos: pack_halves(dst.x as u32, dst.y as u32),
        dwinsz: pack_halves(dst.width as u32, dst.height as u32),
    })
}
