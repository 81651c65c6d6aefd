// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! One hardware overlay plane.
//!
//! The plane keeps a register image in GPU memory. [`OverlayPlane::set_data_buffer`]
//! programs a frame into the image and [`OverlayPlane::flush`] makes the
//! hardware pick it up; everything else manages the plane's lifetime and
//! routing:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --enable/set_data_buffer--> Enabled
//!                                     Enabled <--disable/enable--> Disabled
//!                    any initialized state --deinitialize--> Deinitialized
//! ```

use std::rc::Rc;

use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::buffer_mapper::BufferMapperCache;
use crate::buffer_mapper::FrameLayout;
use crate::buffer_mapper::SourceBuffer;
use crate::coefficients::update_coefficients;
use crate::coefficients::N_HORIZ_UV_TAPS;
use crate::coefficients::N_HORIZ_Y_TAPS;
use crate::config::OverlayConfig;
use crate::device::GpuAllocator;
use crate::device::ModeSource;
use crate::device::RegisterChannel;
use crate::format;
use crate::format::PixelFormat;
use crate::geometry::clamp_position;
use crate::geometry::compute_coordinates;
use crate::geometry::compute_offsets;
use crate::geometry::compute_scaling;
use crate::registers::OverlayRegisters;
use crate::transaction::BackBuffer;
use crate::transaction::FlushFlags;
use crate::transaction::RegisterTransaction;
use crate::OutputId;
use crate::OverlayError;
use crate::Position;
use crate::Result;
use crate::Transform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneStatus {
    Uninitialized,
    /// Back buffer allocated and reset, nothing shown yet.
    Initialized,
    Enabled,
    Disabled,
    Deinitialized,
}

/// Routing and placement chosen by the compositor.
#[derive(Clone, Copy, Debug, Default)]
struct PlaneState {
    output: OutputId,
    position: Position,
    transform: Transform,
}

pub struct OverlayPlane {
    index: u32,
    config: OverlayConfig,
    allocator: Rc<dyn GpuAllocator>,
    modes: Rc<dyn ModeSource>,
    transaction: RegisterTransaction,
    mapper_cache: BufferMapperCache,
    state: PlaneState,
    status: PlaneStatus,
    /// New filter taps are in the image but have not been flushed yet.
    coefficients_dirty: bool,
}

impl OverlayPlane {
    pub fn new(
        index: u32,
        config: OverlayConfig,
        allocator: Rc<dyn GpuAllocator>,
        channel: Box<dyn RegisterChannel>,
        modes: Rc<dyn ModeSource>,
    ) -> Self {
        let mapper_cache = BufferMapperCache::new(Rc::clone(&allocator), config.data_buffer_count);
        Self {
            index,
            config,
            allocator,
            modes,
            transaction: RegisterTransaction::new(channel),
            mapper_cache,
            state: PlaneState::default(),
            status: PlaneStatus::Uninitialized,
            coefficients_dirty: false,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn status(&self) -> PlaneStatus {
        self.status
    }

    pub fn output(&self) -> OutputId {
        self.state.output
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn position(&self) -> Position {
        self.state.position
    }

    /// The register image as it will be sent on the next flush.
    pub fn registers(&self) -> Result<&OverlayRegisters> {
        self.transaction.registers()
    }

    /// Allocates and resets the back buffer. Calling it again on an
    /// initialized plane does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.transaction.is_attached() {
            return Ok(());
        }
        debug!("Initializing overlay plane {}", self.index);

        let back_buffer = BackBuffer::create(&self.allocator, &self.config).map_err(|e| {
            error!("Overlay plane {}: failed to create back buffer: {}", self.index, e);
            e
        })?;
        self.transaction.attach(back_buffer);
        self.transaction.registers_mut()?.reset(&self.config);
        self.coefficients_dirty = false;
        self.status = PlaneStatus::Initialized;
        Ok(())
    }

    /// Drops all buffer mappings and the back buffer. The plane can be
    /// initialized again afterwards.
    pub fn deinitialize(&mut self) {
        self.mapper_cache.clear();
        if self.transaction.detach().is_some() {
            debug!("Deinitialized overlay plane {}", self.index);
            self.status = PlaneStatus::Deinitialized;
        }
    }

    fn check_initialized(&self, operation: &str) -> Result<()> {
        if self.transaction.is_attached() {
            Ok(())
        } else {
            error!("Overlay plane {}: {} before initialization", self.index, operation);
            Err(OverlayError::NotInitialized)
        }
    }

    pub fn enable(&mut self) -> Result<()> {
        self.check_initialized("enable")?;
        self.transaction.enable(self.state.output)?;
        self.status = PlaneStatus::Enabled;
        Ok(())
    }

    /// Turns the plane off and waits for the next vertical blank.
    pub fn disable(&mut self) -> Result<()> {
        self.check_initialized("disable")?;
        self.transaction.disable(self.state.output)?;
        self.status = PlaneStatus::Disabled;
        Ok(())
    }

    /// Loads the power-on register values into the hardware, which also
    /// turns the plane off.
    pub fn reset(&mut self) -> Result<()> {
        self.check_initialized("reset")?;
        self.transaction.reset(&self.config, self.state.output)?;
        self.coefficients_dirty = false;
        self.status = PlaneStatus::Disabled;
        Ok(())
    }

    /// Pushes the register image to the hardware. Filter taps computed since
    /// the last successful flush are loaded along with it.
    pub fn flush(&mut self, flags: FlushFlags) -> Result<bool> {
        self.check_initialized("flush")?;
        if flags.is_empty() {
            return Ok(false);
        }
        let mut flags = flags;
        if self.coefficients_dirty {
            flags |= FlushFlags::UPDATE_COEF;
        }
        let flushed = self.transaction.flush(flags, self.state.output)?;
        if flushed {
            self.coefficients_dirty = false;
        }
        Ok(flushed)
    }

    /// Routes the plane to `output`. Moving to another pipe turns the plane
    /// off first.
    pub fn assign_to_output(&mut self, output: OutputId) -> Result<()> {
        self.check_initialized("assign_to_output")?;
        if output != self.state.output {
            info!(
                "Overlay plane {}: moving from {:?} to {:?}",
                self.index, self.state.output, output
            );
            self.disable()?;
        }
        self.state.output = output;
        Ok(())
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.state.transform = transform;
    }

    /// Sets the destination window. It is clipped to the output's active
    /// mode when the next frame is programmed.
    pub fn set_position(&mut self, position: Position) {
        self.state.position = position;
    }

    /// Unmaps every cached rotated buffer.
    pub fn invalidate_buffer_cache(&mut self) {
        self.mapper_cache.clear();
    }

    /// A rotated copy can only be used if the decoder produced one for the
    /// plane's current rotation.
    fn check_rotated_buffer_ready(&self, source: &SourceBuffer) -> Result<()> {
        if format::lookup(source.layout.format)?.format != PixelFormat::Nv12 {
            warn!("Overlay plane {}: {} has no rotated copy", self.index, source.layout.format);
            return Err(OverlayError::SourceNotReady);
        }
        let payload = source.payload.as_ref().ok_or_else(|| {
            error!("Overlay plane {}: no video payload found", self.index);
            OverlayError::SourceNotReady
        })?;
        if payload.force_gpu_output {
            debug!("Overlay plane {}: producer forces GPU composition", self.index);
            return Err(OverlayError::SourceNotReady);
        }
        if payload.client_transform != self.state.transform {
            warn!(
                "Overlay plane {}: rotated buffer is {:?}, plane is {:?}",
                self.index, payload.client_transform, self.state.transform
            );
            return Err(OverlayError::SourceNotReady);
        }
        Ok(())
    }

    /// Programs `source` into the register image and enables the plane in
    /// it. Nothing is sent to the hardware until the next flush. On error
    /// the image is left untouched.
    pub fn set_data_buffer(&mut self, source: &SourceBuffer) -> Result<()> {
        self.check_initialized("set_data_buffer")?;

        // The rotation engine only serves the built-in panel.
        let layout: FrameLayout =
            if self.state.transform != Transform::None && self.state.output == OutputId::Primary {
                self.check_rotated_buffer_ready(source)?;
                let mapped =
                    self.mapper_cache.get(source, self.state.transform).map_err(|e| {
                        error!("Overlay plane {}: failed to get rotated buffer: {}", self.index, e);
                        e
                    })?;
                *mapped.layout()
            } else {
                source.layout
            };

        let mut staged = self.transaction.registers()?.clone();
        let scale_changed = self.stage_frame(&layout, &mut staged)?;
        staged.set_enabled(true);

        *self.transaction.registers_mut()? = staged;
        if scale_changed {
            self.coefficients_dirty = true;
        }
        self.status = PlaneStatus::Enabled;
        Ok(())
    }

    /// Computes every register of the frame into `regs`. Returns whether the
    /// scale factors, and thus the filter taps, changed.
    fn stage_frame(&self, layout: &FrameLayout, regs: &mut OverlayRegisters) -> Result<bool> {
        let offsets = compute_offsets(layout).map_err(|e| {
            error!("Overlay plane {}: failed to set up buffer offsets: {}", self.index, e);
            e
        })?;
        offsets.apply(regs);

        let coordinates = compute_coordinates(layout, &offsets).map_err(|e| {
            error!("Overlay plane {}: failed to set up coordinates: {}", self.index, e);
            e
        })?;
        coordinates.apply(regs);

        // The mode may change between here and the flush. The next frame
        // picks up the new one.
        let mode = self.modes.active_mode(self.state.output);
        let scaling = clamp_position(self.state.position, mode)
            .and_then(|dst| {
                debug!("Overlay plane {}: final position {:?}", self.index, dst);
                compute_scaling(&layout.crop, &dst, &regs.scale(), self.config.max_scaling_ratio)
            })
            .map_err(|e| {
                error!("Overlay plane {}: failed to set up scaling: {}", self.index, e);
                e
            })?;
        scaling.apply(regs);

        if scaling.changed {
            let (cutoff_y, cutoff_uv) =
                scaling.cutoffs(self.config.min_cutoff_freq, self.config.max_cutoff_freq);
            let luma = update_coefficients(N_HORIZ_Y_TAPS, cutoff_y, true, true)?;
            let chroma = update_coefficients(N_HORIZ_UV_TAPS, cutoff_uv, true, false)?;
            regs.set_horizontal_coefficients(&luma, &chroma);
        }
        Ok(scaling.changed)
    }
}

impl Drop for OverlayPlane {
    fn drop(&mut self) {
        self.deinitialize();
    }
}
