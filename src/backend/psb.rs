// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Overlay register writes through `DRM_PSB_REGISTER_RW`.

use std::mem::offset_of;
use std::mem::size_of;
use std::os::fd::AsFd;
use std::os::fd::AsRawFd;
use std::rc::Rc;

use anyhow::Context;
use static_assertions::const_assert_eq;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;

use super::Card;
use crate::device::RegisterChannel;
use crate::device::RegisterWriteRequest;

const DRM_IOCTL_BASE: u8 = b'd';
const DRM_COMMAND_BASE: u8 = 0x40;
const DRM_PSB_REGISTER_RW: u8 = 0x0e;

/// Overlay part of the driver's register access argument.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PsbOverlayRegs {
    ovadd: u32,
    ogamc: [u32; 6],
    iep_enabled: u32,
    iep_ble_minmax: u32,
    iep_bssc_control: u32,
    index: u32,
    b_wait_vblank: u32,
    b_wms: u32,
    buffer_handle: u32,
}

/// Leading part of `struct drm_psb_register_rw_arg`, up to the overlay block.
/// The kernel zero-fills the fields past what user space passes in.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PsbRegisterRwArg {
    b_force_hw_on: u32,
    display_read_mask: u32,
    display_write_mask: u32,
    display: [u32; 12],
    overlay_read_mask: u32,
    overlay_write_mask: u32,
    overlay: PsbOverlayRegs,
}

const_assert_eq!(size_of::<PsbOverlayRegs>(), 14 * 4);
const_assert_eq!(offset_of!(PsbRegisterRwArg, overlay_read_mask), 15 * 4);
const_assert_eq!(size_of::<PsbRegisterRwArg>(), 31 * 4);

nix::ioctl_readwrite!(
    psb_register_rw,
    DRM_IOCTL_BASE,
    DRM_COMMAND_BASE + DRM_PSB_REGISTER_RW,
    PsbRegisterRwArg
);

impl From<&RegisterWriteRequest> for PsbRegisterRwArg {
    fn from(request: &RegisterWriteRequest) -> Self {
        Self {
            overlay_read_mask: request.overlay_read_mask,
            overlay_write_mask: request.overlay_write_mask,
            overlay: PsbOverlayRegs {
                ovadd: request.ovadd,
                b_wait_vblank: request.b_wait_vblank,
                b_wms: request.b_wms,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

pub struct PsbRegisterChannel {
    card: Rc<Card>,
}

impl PsbRegisterChannel {
    pub fn new(card: Rc<Card>) -> Self {
        Self { card }
    }
}

impl RegisterChannel for PsbRegisterChannel {
    fn write_registers(&mut self, request: &mut RegisterWriteRequest) -> anyhow::Result<()> {
        let mut arg = PsbRegisterRwArg::from(&*request);
        // SAFETY: `arg` matches the layout the request code encodes and
        // outlives the call.
        unsafe { psb_register_rw(self.card.as_fd().as_raw_fd(), &mut arg) }
            .context("DRM_PSB_REGISTER_RW failed")?;

        request.ovadd = arg.overlay.ovadd;
        request.b_wait_vblank = arg.overlay.b_wait_vblank;
        Ok(())
    }
}
