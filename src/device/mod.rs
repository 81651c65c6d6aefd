// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Interfaces the overlay plane needs from the rest of the display stack.

use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::rc::Rc;

use log::warn;

use crate::DisplayMode;
use crate::OutputId;
use crate::OverlayError;
use crate::Result;

#[cfg(test)]
mod mock;
#[cfg(test)]
pub use mock::*;

/// A CPU-mapped, GPU-visible memory object handed out by a [`GpuAllocator`].
///
/// The object must be returned with [`GpuAllocator::destroy`]; prefer holding
/// it in a [`GpuBuffer`], which does so on drop.
#[derive(Debug)]
pub struct GpuObject {
    id: u64,
    cpu_address: NonNull<u8>,
    size: usize,
    gtt_offset_in_page: u32,
}

impl GpuObject {
    /// # Safety
    ///
    /// `cpu_address` must point to `size` writable bytes that stay mapped until
    /// the object is passed to `destroy` on the allocator that created it.
    pub unsafe fn new(id: u64, cpu_address: NonNull<u8>, size: usize, gtt_offset_in_page: u32) -> Self {
        Self { id, cpu_address, size, gtt_offset_in_page }
    }

    /// Allocator-specific identifier of the object.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Offset of the object in the GPU aperture, in 4 KiB pages.
    pub fn gtt_offset_in_page(&self) -> u32 {
        self.gtt_offset_in_page
    }

    pub fn write_bytes(&self, offset: usize, data: &[u8]) -> Result<()> {
        if offset.checked_add(data.len()).map_or(true, |end| end > self.size) {
            return Err(OverlayError::AllocationFailure(format!(
                "write of {} bytes at {} overflows {} byte object",
                data.len(),
                offset,
                self.size
            )));
        }
        // SAFETY: the range was checked against `size`, and the constructor
        // contract keeps `cpu_address` mapped for the lifetime of `self`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.cpu_address.as_ptr().add(offset),
                data.len(),
            );
        }
        Ok(())
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        if offset.checked_add(len).map_or(true, |end| end > self.size) {
            return Err(OverlayError::AllocationFailure(format!(
                "read of {} bytes at {} overflows {} byte object",
                len, offset, self.size
            )));
        }
        let mut data = vec![0u8; len];
        // SAFETY: same as `write_bytes`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.cpu_address.as_ptr().add(offset),
                data.as_mut_ptr(),
                len,
            );
        }
        Ok(data)
    }
}

/// GPU memory manager (TTM/GEM) used for the back buffer and for mapping
/// buffers produced by the rotation engine.
pub trait GpuAllocator {
    /// Allocates `size` bytes aligned to `alignment`, mapped for the CPU.
    fn allocate(&self, size: usize, alignment: usize) -> anyhow::Result<GpuObject>;

    /// Maps an existing kernel buffer object of at least `size` bytes by its
    /// handle.
    fn wrap(&self, handle: u32, size: usize) -> anyhow::Result<GpuObject>;

    /// Blocks until the GPU has finished writing `object`.
    fn wait_idle(&self, object: &GpuObject) -> anyhow::Result<()>;

    /// Unmaps and releases `object`.
    fn destroy(&self, object: GpuObject) -> anyhow::Result<()>;
}

/// Owns a [`GpuObject`] and releases it when dropped.
pub struct GpuBuffer {
    allocator: Rc<dyn GpuAllocator>,
    object: ManuallyDrop<GpuObject>,
}

impl GpuBuffer {
    pub fn allocate(allocator: &Rc<dyn GpuAllocator>, size: usize, alignment: usize) -> Result<Self> {
        let object = allocator
            .allocate(size, alignment)
            .map_err(|e| OverlayError::AllocationFailure(format!("{:#}", e)))?;
        Ok(Self { allocator: Rc::clone(allocator), object: ManuallyDrop::new(object) })
    }

    pub fn wrap(allocator: &Rc<dyn GpuAllocator>, handle: u32, size: usize) -> Result<Self> {
        let object = allocator.wrap(handle, size).map_err(|e| {
            OverlayError::AllocationFailure(format!("failed to map buffer {}: {:#}", handle, e))
        })?;
        Ok(Self { allocator: Rc::clone(allocator), object: ManuallyDrop::new(object) })
    }

    pub fn object(&self) -> &GpuObject {
        &self.object
    }

    pub fn wait_idle(&self) -> anyhow::Result<()> {
        self.allocator.wait_idle(self.object())
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        // SAFETY: `object` is not used after this point.
        let object = unsafe { ManuallyDrop::take(&mut self.object) };
        let id = object.id();
        if let Err(e) = self.allocator.destroy(object) {
            warn!("Failed to destroy GPU object {}: {:#}", id, e);
        }
    }
}

/// Overlay fields of the display driver's register read/write request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterWriteRequest {
    pub overlay_read_mask: u32,
    pub overlay_write_mask: u32,
    /// Page address of the register image, pipe select and coefficient update bit.
    pub ovadd: u32,
    pub b_wait_vblank: u32,
    pub b_wms: u32,
}

/// Channel carrying register writes to the display driver.
pub trait RegisterChannel {
    /// Issues `request` synchronously. With `b_wait_vblank` set this returns
    /// after the next vertical blank.
    fn write_registers(&mut self, request: &mut RegisterWriteRequest) -> anyhow::Result<()>;
}

/// Source of the current timing of each output.
pub trait ModeSource {
    /// The active mode of `output`, or `None` if it has no valid mode.
    fn active_mode(&self, output: OutputId) -> Option<DisplayMode>;
}
