// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Driver for the display controller's video overlay plane.
//!
//! The overlay is fed through a register image living in GPU-visible memory
//! (the back buffer). Each frame the driver programs buffer offsets, source
//! geometry, scale factors and, when the scale changes, the horizontal
//! polyphase filter taps, then asks the kernel to latch the image. See
//! [`OverlayPlane`] for the entry point.

use std::fmt;

pub mod buffer_mapper;
pub mod coefficients;
pub mod config;
pub mod device;
pub mod error;
pub mod format;
pub mod geometry;
pub mod overlay_plane;
pub mod registers;
pub mod transaction;
pub mod utils;

#[cfg(feature = "backend")]
pub mod backend;

pub use error::OverlayError;
pub use error::Result;
pub use overlay_plane::OverlayPlane;
pub use overlay_plane::PlaneStatus;

/// A FourCC pixel format code, as stored in the source buffer descriptor.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Fourcc(u32);

impl From<u32> for Fourcc {
    fn from(fourcc: u32) -> Self {
        Self(fourcc)
    }
}

impl From<Fourcc> for u32 {
    fn from(fourcc: Fourcc) -> Self {
        fourcc.0
    }
}

impl From<&[u8; 4]> for Fourcc {
    fn from(n: &[u8; 4]) -> Self {
        Self(u32::from_le_bytes(*n))
    }
}

impl From<drm_fourcc::DrmFourcc> for Fourcc {
    fn from(fourcc: drm_fourcc::DrmFourcc) -> Self {
        Self(fourcc as u32)
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_le_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            f.write_str(&String::from_utf8_lossy(&bytes))
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({})", self)
    }
}

/// A rectangle inside a source buffer, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Destination window on the display. Coordinates may be negative or overflow
/// the active mode until they are clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// Luma and chroma line pitches of a source buffer, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stride {
    pub y: u32,
    pub uv: u32,
}

/// Rotation applied by the producer of the source buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transform {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Transform {
    /// Whether width/height (and x/y) are swapped by this rotation.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Transform::Rotate90 | Transform::Rotate270)
    }
}

/// Physical display output an overlay plane can be routed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputId {
    #[default]
    Primary,
    External,
}

impl OutputId {
    /// Pipe select bits OR'ed into OVADD.
    pub fn pipe_config(self) -> u32 {
        match self {
            OutputId::Primary => 0,
            OutputId::External => 0x2 << 6,
        }
    }
}

/// Active timing of an output, as far as position clamping is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
}
