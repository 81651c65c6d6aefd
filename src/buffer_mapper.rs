// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Mappings of rotated video buffers into the GPU aperture.
//!
//! When the plane is rotated, the video decoder writes a second, rotated copy
//! of every frame into a kernel buffer object and publishes its handle in the
//! frame's payload. Decoders cycle through a small set of such buffers, so
//! each one is mapped once and kept until evicted with
//! [`BufferMapperCache::put`] or [`BufferMapperCache::clear`].

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use log::error;
use log::warn;

use crate::device::GpuAllocator;
use crate::device::GpuBuffer;
use crate::format;
use crate::utils::align_up;
use crate::Fourcc;
use crate::OverlayError;
use crate::Rect;
use crate::Result;
use crate::Stride;
use crate::Transform;

/// Side-band data the video decoder attaches to each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VideoPayload {
    pub rotated_handle: u32,
    pub rotated_width: u32,
    pub rotated_height: u32,
    /// Rotation the decoder has applied to the rotated copy.
    pub client_transform: Transform,
    /// The producer wants this frame composed by the GPU instead.
    pub force_gpu_output: bool,
}

/// Everything the register setup needs to know about a source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    pub format: Fourcc,
    pub width: u32,
    pub height: u32,
    pub stride: Stride,
    pub crop: Rect,
    /// Offset of the buffer in the GPU aperture, in 4 KiB pages.
    pub gtt_offset_in_page: u32,
}

/// A frame handed to the plane by the compositor, already resident in the
/// GPU aperture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceBuffer {
    pub layout: FrameLayout,
    pub payload: Option<VideoPayload>,
}

impl SourceBuffer {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout, payload: None }
    }

    pub fn with_payload(layout: FrameLayout, payload: VideoPayload) -> Self {
        Self { layout, payload: Some(payload) }
    }
}

/// A rotated buffer mapped through the GPU allocator. The mapping is released
/// when the last reference is dropped.
pub struct MappedBuffer {
    key: u32,
    layout: FrameLayout,
    buffer: GpuBuffer,
}

impl MappedBuffer {
    /// Kernel handle of the rotated buffer.
    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }
}

/// Moves the crop origin past the alignment padding the rotation engine adds
/// to each line and column. For quarter turns the crop is transposed first.
pub fn skip_rotation_padding(crop: Rect, transform: Transform) -> Rect {
    let mut crop = crop;
    if transform.swaps_axes() {
        crop = Rect::new(crop.y, crop.x, crop.height, crop.width);
    }
    let pad_x = align_up(crop.width, 16) - crop.width;
    let pad_y = align_up(crop.height, 16) - crop.height;
    match transform {
        Transform::None => {}
        Transform::Rotate90 => crop.x += pad_x,
        Transform::Rotate180 => {
            crop.x += pad_x;
            crop.y += pad_y;
        }
        Transform::Rotate270 => crop.y += pad_y,
    }
    crop
}

pub struct BufferMapperCache {
    allocator: Rc<dyn GpuAllocator>,
    buffers: HashMap<u32, Rc<MappedBuffer>>,
}

impl BufferMapperCache {
    pub fn new(allocator: Rc<dyn GpuAllocator>, capacity: usize) -> Self {
        Self { allocator, buffers: HashMap::with_capacity(capacity) }
    }

    /// Returns the mapping of the rotated copy of `source`, mapping it on
    /// first use. The mapping is synchronized with the decoder before it is
    /// returned.
    pub fn get(&mut self, source: &SourceBuffer, transform: Transform) -> Result<Rc<MappedBuffer>> {
        let payload = source.payload.as_ref().ok_or(OverlayError::SourceNotReady)?;
        let key = payload.rotated_handle;

        let mapped = match self.buffers.get(&key) {
            Some(mapped) => {
                debug!("Reusing mapping of rotated buffer {}", key);
                Rc::clone(mapped)
            }
            None => {
                let mapped = Rc::new(self.map(source, payload, transform)?);
                self.buffers.insert(key, Rc::clone(&mapped));
                mapped
            }
        };

        // The decoder has no fence for the rotated copy, so wait for it here.
        if let Err(e) = mapped.buffer.wait_idle() {
            warn!("Failed to wait for rotated buffer {}: {:#}", key, e);
        }
        Ok(mapped)
    }

    fn map(
        &self,
        source: &SourceBuffer,
        payload: &VideoPayload,
        transform: Transform,
    ) -> Result<MappedBuffer> {
        let key = payload.rotated_handle;
        debug!("Mapping rotated buffer {}", key);

        let desc = format::lookup(source.layout.format)?;
        let (width, height) = (payload.rotated_width, payload.rotated_height);
        let stride = desc.rotated_stride(width);
        let crop = skip_rotation_padding(source.layout.crop, transform);

        let buffer = GpuBuffer::wrap(&self.allocator, key, desc.buffer_size(stride, height))
            .map_err(|e| {
                error!("Failed to map rotated buffer {}: {}", key, e);
                e
            })?;
        let layout = FrameLayout {
            format: source.layout.format,
            width,
            height,
            stride,
            crop,
            gtt_offset_in_page: buffer.object().gtt_offset_in_page(),
        };
        Ok(MappedBuffer { key, layout, buffer })
    }

    /// Evicts `mapping`. The buffer is unmapped once the caller's reference
    /// goes away too.
    pub fn put(&mut self, mapping: Rc<MappedBuffer>) {
        if let Some(cached) = self.buffers.get(&mapping.key()) {
            if Rc::ptr_eq(cached, &mapping) {
                self.buffers.remove(&mapping.key());
            }
        }
    }

    /// Evicts every mapping.
    pub fn clear(&mut self) {
        debug!("Dropping {} rotated buffer mappings", self.buffers.len());
        self.buffers.clear();
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn contains(&self, handle: u32) -> bool {
        self.buffers.contains_key(&handle)
    }
}
