// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Commits the overlay register image to the hardware.
//!
//! The image is edited in memory and copied into the GPU-visible back buffer
//! right before each flush. A flush then points the display controller at
//! the back buffer through the display driver's register write request.

use std::mem::size_of;
use std::rc::Rc;

use bitflags::bitflags;
use log::debug;
use log::trace;
use log::warn;
use zerocopy::IntoBytes;

use crate::config::OverlayConfig;
use crate::device::GpuAllocator;
use crate::device::GpuBuffer;
use crate::device::RegisterChannel;
use crate::device::RegisterWriteRequest;
use crate::registers::OverlayRegisters;
use crate::OutputId;
use crate::OverlayError;
use crate::Result;

bitflags! {
    pub struct FlushFlags: u32 {
        const FLUSH_NEEDED = 0x1;
        const WAIT_VBLANK = 0x2;
        /// The horizontal filter taps changed and must be reloaded.
        const UPDATE_COEF = 0x4;
    }
}

/// OVADD bit asking the hardware to reload the filter taps.
const OVADD_UPDATE_COEF: u32 = 0x1;

/// The register image and the GPU memory the hardware reads it from.
pub struct BackBuffer {
    buffer: GpuBuffer,
    regs: Box<OverlayRegisters>,
}

impl BackBuffer {
    pub fn create(allocator: &Rc<dyn GpuAllocator>, config: &OverlayConfig) -> Result<Self> {
        let buffer = GpuBuffer::allocate(
            allocator,
            size_of::<OverlayRegisters>(),
            config.back_buffer_alignment,
        )?;
        debug!(
            "Created overlay back buffer at page {:#x}",
            buffer.object().gtt_offset_in_page()
        );
        Ok(Self { buffer, regs: Box::new(OverlayRegisters::zeroed()) })
    }

    pub fn gtt_offset_in_page(&self) -> u32 {
        self.buffer.object().gtt_offset_in_page()
    }

    /// Copies the register image into GPU memory.
    fn sync(&self) -> Result<()> {
        self.buffer.object().write_bytes(0, self.regs.as_bytes())
    }
}

pub struct RegisterTransaction {
    channel: Box<dyn RegisterChannel>,
    back_buffer: Option<BackBuffer>,
}

impl RegisterTransaction {
    pub fn new(channel: Box<dyn RegisterChannel>) -> Self {
        Self { channel, back_buffer: None }
    }

    pub fn attach(&mut self, back_buffer: BackBuffer) {
        self.back_buffer = Some(back_buffer);
    }

    /// Releases the back buffer, if any.
    pub fn detach(&mut self) -> Option<BackBuffer> {
        self.back_buffer.take()
    }

    pub fn is_attached(&self) -> bool {
        self.back_buffer.is_some()
    }

    pub fn registers(&self) -> Result<&OverlayRegisters> {
        self.back_buffer.as_ref().map(|b| &*b.regs).ok_or(OverlayError::NotInitialized)
    }

    pub fn registers_mut(&mut self) -> Result<&mut OverlayRegisters> {
        self.back_buffer.as_mut().map(|b| &mut *b.regs).ok_or(OverlayError::NotInitialized)
    }

    pub fn enable(&mut self, output: OutputId) -> Result<()> {
        self.set_enabled(true, FlushFlags::FLUSH_NEEDED, output)
    }

    /// Turns the overlay off, returning once the hardware has latched it.
    pub fn disable(&mut self, output: OutputId) -> Result<()> {
        self.set_enabled(false, FlushFlags::FLUSH_NEEDED | FlushFlags::WAIT_VBLANK, output)
    }

    fn set_enabled(&mut self, enabled: bool, flags: FlushFlags, output: OutputId) -> Result<()> {
        let regs = self.registers_mut()?;
        if regs.is_enabled() == enabled {
            return Ok(());
        }
        regs.set_enabled(enabled);

        if let Err(e) = self.flush(flags, output) {
            // Keep the image in line with what the hardware last accepted.
            self.registers_mut()?.set_enabled(!enabled);
            return Err(e);
        }
        Ok(())
    }

    /// Restores the power-on register values and pushes them to the hardware.
    pub fn reset(&mut self, config: &OverlayConfig, output: OutputId) -> Result<()> {
        self.registers_mut()?.reset(config);
        self.flush(FlushFlags::FLUSH_NEEDED, output)?;
        Ok(())
    }

    /// Writes the register image to the back buffer and has the display
    /// controller load it. Returns `Ok(false)` without touching the hardware
    /// when `flags` is empty.
    pub fn flush(&mut self, flags: FlushFlags, output: OutputId) -> Result<bool> {
        trace!("flush: flags {:?}, output {:?}", flags, output);
        if flags.is_empty() {
            return Ok(false);
        }
        let back_buffer = self.back_buffer.as_ref().ok_or(OverlayError::NotInitialized)?;
        back_buffer.sync()?;

        let mut ovadd = (back_buffer.gtt_offset_in_page() << 12) | output.pipe_config();
        if flags.contains(FlushFlags::UPDATE_COEF) {
            ovadd |= OVADD_UPDATE_COEF;
        }
        let mut request = RegisterWriteRequest {
            overlay_read_mask: 0,
            overlay_write_mask: 1,
            ovadd,
            b_wait_vblank: flags.contains(FlushFlags::WAIT_VBLANK) as u32,
            b_wms: 0,
        };
        self.channel.write_registers(&mut request).map_err(|e| {
            warn!("Overlay update failed: {:#}", e);
            OverlayError::DeviceTransactionFailure(format!("{:#}", e))
        })?;
        Ok(true)
    }
}
