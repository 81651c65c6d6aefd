// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#[cfg(test)]
mod tests {
    use overlay_plane::buffer_mapper::FrameLayout;
    use overlay_plane::geometry::clamp_position;
    use overlay_plane::geometry::compute_coordinates;
    use overlay_plane::geometry::compute_offsets;
    use overlay_plane::geometry::compute_scaling;
    use overlay_plane::registers::ScaleRegisters;
    use overlay_plane::DisplayMode;
    use overlay_plane::Fourcc;
    use overlay_plane::OverlayError;
    use overlay_plane::Position;
    use overlay_plane::Rect;
    use overlay_plane::Stride;

    const FORMATS: [&[u8; 4]; 5] = [b"YV12", b"YU12", b"NV12", b"YUYV", b"UYVY"];

    fn frame(format: &[u8; 4], crop: Rect) -> FrameLayout {
        FrameLayout {
            format: Fourcc::from(format),
            width: 1920,
            height: 1080,
            stride: Stride { y: 3840, uv: 1920 },
            crop,
            gtt_offset_in_page: 0x10,
        }
    }

    #[test]
    fn luma_offset_starts_a_line() {
        for format in FORMATS {
            for y in (0..1080).step_by(37) {
                let offsets = compute_offsets(&frame(format, Rect::new(0, y, 64, 64))).unwrap();
                assert_eq!(offsets.y % 3840, 0);
                assert_eq!(offsets.start, 0x10 << 12);
            }
        }
    }

    #[test]
    fn every_format_has_coordinates() {
        for format in FORMATS {
            let layout = frame(format, Rect::new(0, 0, 1920, 1080));
            let offsets = compute_offsets(&layout).unwrap();
            let coordinates = compute_coordinates(&layout, &offsets).unwrap();
            assert_eq!(coordinates.sheight, 1080 | (540 << 16));
        }
    }

    #[test]
    fn scaling_is_idempotent() {
        let src = Rect::new(0, 0, 1920, 1080);
        let mode = Some(DisplayMode { width: 1920, height: 1080 });
        let dst = clamp_position(Position::new(0, 0, 1280, 720), mode).unwrap();

        let first = compute_scaling(&src, &dst, &ScaleRegisters::default(), 7).unwrap();
        assert!(first.changed);
        assert_eq!(first.x_fract, 6140);
        let second = compute_scaling(&src, &dst, &first.registers, 7).unwrap();
        assert!(!second.changed);
        assert_eq!(first.registers, second.registers);
    }

    #[test]
    fn clamps_to_mode() {
        let mode = Some(DisplayMode { width: 1920, height: 1080 });
        let pos = clamp_position(Position::new(1900, 1060, 100, 100), mode).unwrap();
        assert_eq!((pos.width, pos.height), (20, 20));
    }

    #[test]
    fn rejects_unknown_format() {
        let layout = frame(b"RG16", Rect::new(0, 0, 16, 16));
        assert_eq!(
            compute_offsets(&layout).unwrap_err(),
            OverlayError::UnsupportedFormat(Fourcc::from(b"RG16"))
        );
    }
}
