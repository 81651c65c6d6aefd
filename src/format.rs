// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Table of pixel formats the overlay can scan out.
//!
//! Every stage that depends on the pixel layout (buffer offsets, source
//! coordinates, rotated buffer strides) goes through [`lookup`], so adding a
//! format means adding one row here.

use drm_fourcc::DrmFourcc;

use crate::registers::OVERLAY_FORMAT_PACKED_YUV422;
use crate::registers::OVERLAY_FORMAT_PLANAR_NV12_2;
use crate::registers::OVERLAY_FORMAT_PLANAR_YUV420;
use crate::registers::OVERLAY_PACKED_ORDER_UYVY;
use crate::registers::OVERLAY_PACKED_ORDER_YUY2;
use crate::utils::align_up;
use crate::Fourcc;
use crate::OverlayError;
use crate::Result;
use crate::Stride;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar 4:2:0, V plane before U.
    Yv12,
    /// Planar 4:2:0, U plane before V.
    I420,
    /// Semi-planar 4:2:0 as produced by the video decoder.
    Nv12,
    /// Packed 4:2:2, Y0 U Y1 V.
    Yuy2,
    /// Packed 4:2:2, U Y0 V Y1.
    Uyvy,
}

/// Where the chroma planes start relative to the luma plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChromaLayout {
    /// V then U, each `uv_stride * height / 2` bytes.
    PlanarVu,
    /// U then V, each `uv_stride * height / 2` bytes.
    PlanarUv,
    /// Interleaved UV after a luma plane padded to 32 lines.
    SemiPlanar,
    /// No separate chroma plane.
    Packed,
}

/// Byte offsets of the Y, U and V planes from the start of the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaneOffsets {
    pub y: u32,
    pub u: u32,
    pub v: u32,
}

#[derive(Debug)]
pub struct FormatDescriptor {
    pub format: PixelFormat,
    pub fourcc: Fourcc,
    /// Bits of OCMD selecting this layout.
    pub command_bits: u32,
    /// Bytes per pixel of the luma plane.
    pub bytes_per_pixel: u32,
    chroma: ChromaLayout,
}

const fn fourcc(code: DrmFourcc) -> Fourcc {
    Fourcc(code as u32)
}

static FORMATS: [FormatDescriptor; 5] = [
    FormatDescriptor {
        format: PixelFormat::Yv12,
        fourcc: fourcc(DrmFourcc::Yvu420),
        command_bits: OVERLAY_FORMAT_PLANAR_YUV420,
        bytes_per_pixel: 1,
        chroma: ChromaLayout::PlanarVu,
    },
    FormatDescriptor {
        format: PixelFormat::I420,
        fourcc: fourcc(DrmFourcc::Yuv420),
        command_bits: OVERLAY_FORMAT_PLANAR_YUV420,
        bytes_per_pixel: 1,
        chroma: ChromaLayout::PlanarUv,
    },
    FormatDescriptor {
        format: PixelFormat::Nv12,
        fourcc: fourcc(DrmFourcc::Nv12),
        command_bits: OVERLAY_FORMAT_PLANAR_NV12_2,
        bytes_per_pixel: 1,
        chroma: ChromaLayout::SemiPlanar,
    },
    FormatDescriptor {
        format: PixelFormat::Yuy2,
        fourcc: fourcc(DrmFourcc::Yuyv),
        command_bits: OVERLAY_FORMAT_PACKED_YUV422 | OVERLAY_PACKED_ORDER_YUY2,
        bytes_per_pixel: 2,
        chroma: ChromaLayout::Packed,
    },
    FormatDescriptor {
        format: PixelFormat::Uyvy,
        fourcc: fourcc(DrmFourcc::Uyvy),
        command_bits: OVERLAY_FORMAT_PACKED_YUV422 | OVERLAY_PACKED_ORDER_UYVY,
        bytes_per_pixel: 2,
        chroma: ChromaLayout::Packed,
    },
];

/// Returns the descriptor for `fourcc`, or `UnsupportedFormat`.
pub fn lookup(fourcc: Fourcc) -> Result<&'static FormatDescriptor> {
    FORMATS
        .iter()
        .find(|desc| desc.fourcc == fourcc)
        .ok_or(OverlayError::UnsupportedFormat(fourcc))
}

impl FormatDescriptor {
    /// Plane offsets of an uncropped buffer of `height` lines, or `None` if
    /// they do not fit in 32 bits.
    pub fn plane_offsets(&self, stride: Stride, height: u32) -> Option<PlaneOffsets> {
        let chroma_size = || stride.uv.checked_mul(height / 2);
        let offsets = match self.chroma {
            ChromaLayout::PlanarVu => {
                let v = stride.y.checked_mul(height)?;
                PlaneOffsets { y: 0, v, u: v.checked_add(chroma_size()?)? }
            }
            ChromaLayout::PlanarUv => {
                let u = stride.y.checked_mul(height)?;
                PlaneOffsets { y: 0, u, v: u.checked_add(chroma_size()?)? }
            }
            // The decoder pads the luma plane to 32 lines.
            ChromaLayout::SemiPlanar => {
                let lines = height.checked_next_multiple_of(32)?;
                PlaneOffsets { y: 0, u: stride.y.checked_mul(lines)?, v: 0 }
            }
            ChromaLayout::Packed => PlaneOffsets::default(),
        };
        Some(offsets)
    }

    /// Bytes spanned by an uncropped buffer of `height` lines.
    pub fn buffer_size(&self, stride: Stride, height: u32) -> usize {
        let height = height as usize;
        let (y, uv) = (stride.y as usize, stride.uv as usize);
        match self.chroma {
            ChromaLayout::PlanarVu | ChromaLayout::PlanarUv => y * height + 2 * uv * (height / 2),
            ChromaLayout::SemiPlanar => y * height.next_multiple_of(32) + uv * height / 2,
            ChromaLayout::Packed => y * height,
        }
    }

    /// Pitches of a buffer written by the rotation engine, which does not
    /// report them.
    pub fn rotated_stride(&self, width: u32) -> Stride {
        let aligned = align_up(width, 32);
        match self.chroma {
            ChromaLayout::PlanarVu | ChromaLayout::PlanarUv => {
                let y = align_up(aligned, 64);
                Stride { y, uv: align_up(y >> 1, 64) }
            }
            ChromaLayout::SemiPlanar => {
                let y = align_up(aligned, 64);
                Stride { y, uv: y }
            }
            ChromaLayout::Packed => Stride { y: align_up(aligned << 1, 64), uv: 0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(Fourcc::from(b"NV12")).unwrap().format, PixelFormat::Nv12);
        assert_eq!(lookup(Fourcc::from(b"YV12")).unwrap().format, PixelFormat::Yv12);
        assert_eq!(lookup(Fourcc::from(b"YU12")).unwrap().format, PixelFormat::I420);
        assert_eq!(lookup(Fourcc::from(b"YUYV")).unwrap().format, PixelFormat::Yuy2);
        assert_eq!(lookup(Fourcc::from(b"UYVY")).unwrap().format, PixelFormat::Uyvy);
        assert_eq!(
            lookup(Fourcc::from(b"XR24")).unwrap_err(),
            OverlayError::UnsupportedFormat(Fourcc::from(b"XR24"))
        );
    }

    #[test]
    fn test_plane_offsets() {
        let stride = Stride { y: 1920, uv: 960 };
        let yv12 = lookup(Fourcc::from(b"YV12")).unwrap();
        assert_eq!(
            yv12.plane_offsets(stride, 1080),
            Some(PlaneOffsets { y: 0, v: 1920 * 1080, u: 1920 * 1080 + 960 * 540 })
        );
        let i420 = lookup(Fourcc::from(b"YU12")).unwrap();
        assert_eq!(
            i420.plane_offsets(stride, 1080),
            Some(PlaneOffsets { y: 0, u: 1920 * 1080, v: 1920 * 1080 + 960 * 540 })
        );
        let nv12 = lookup(Fourcc::from(b"NV12")).unwrap();
        assert_eq!(
            nv12.plane_offsets(Stride { y: 1920, uv: 1920 }, 1080),
            Some(PlaneOffsets { y: 0, u: 1920 * 1088, v: 0 })
        );
        let uyvy = lookup(Fourcc::from(b"UYVY")).unwrap();
        assert_eq!(uyvy.plane_offsets(stride, 1080), Some(PlaneOffsets::default()));
    }

    #[test]
    fn test_plane_offsets_overflow() {
        let stride = Stride { y: 70000, uv: 35000 };
        for fourcc in [b"YV12", b"YU12", b"NV12"] {
            let desc = lookup(Fourcc::from(fourcc)).unwrap();
            assert_eq!(desc.plane_offsets(stride, 70000), None, "{:?}", fourcc);
        }
        let nv12 = lookup(Fourcc::from(b"NV12")).unwrap();
        assert_eq!(nv12.plane_offsets(Stride { y: 1, uv: 1 }, u32::MAX), None);
        let yuy2 = lookup(Fourcc::from(b"YUYV")).unwrap();
        assert_eq!(yuy2.plane_offsets(stride, 70000), Some(PlaneOffsets::default()));
    }

    #[test]
    fn test_rotated_stride() {
        let nv12 = lookup(Fourcc::from(b"NV12")).unwrap();
        assert_eq!(nv12.rotated_stride(1080), Stride { y: 1088, uv: 1088 });
        let i420 = lookup(Fourcc::from(b"YU12")).unwrap();
        assert_eq!(i420.rotated_stride(720), Stride { y: 768, uv: 384 });
        let yuy2 = lookup(Fourcc::from(b"YUYV")).unwrap();
        assert_eq!(yuy2.rotated_stride(100), Stride { y: 256, uv: 0 });
    }

    #[test]
    fn test_buffer_size() {
        let nv12 = lookup(Fourcc::from(b"NV12")).unwrap();
        assert_eq!(nv12.buffer_size(Stride { y: 64, uv: 64 }, 20), 64 * 32 + 64 * 10);
        let yv12 = lookup(Fourcc::from(b"YV12")).unwrap();
        assert_eq!(yv12.buffer_size(Stride { y: 64, uv: 32 }, 20), 64 * 20 + 2 * 32 * 10);
        let uyvy = lookup(Fourcc::from(b"UYVY")).unwrap();
        assert_eq!(uyvy.buffer_size(Stride { y: 128, uv: 0 }, 20), 128 * 20);
    }
}
