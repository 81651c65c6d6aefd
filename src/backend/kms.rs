// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs::File;
use std::fs::OpenOptions;
use std::os::fd::AsFd;
use std::os::fd::BorrowedFd;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use drm::control::connector;
use drm::control::Device as ControlDevice;
use log::debug;

use crate::device::ModeSource;
use crate::DisplayMode;
use crate::OutputId;

pub const DEFAULT_CARD_PATH: &str = "/dev/dri/card0";

/// An open DRM primary node.
#[derive(Debug)]
pub struct Card(File);

impl Card {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self(file))
    }
}

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl drm::Device for Card {}
impl ControlDevice for Card {}

/// Which output a connector drives. Built-in panels are the primary output,
/// anything pluggable is external.
fn output_of(interface: connector::Interface) -> Option<OutputId> {
    match interface {
        connector::Interface::DSI
        | connector::Interface::EmbeddedDisplayPort
        | connector::Interface::LVDS => Some(OutputId::Primary),
        connector::Interface::HDMIA
        | connector::Interface::HDMIB
        | connector::Interface::DisplayPort => Some(OutputId::External),
        _ => None,
    }
}

/// Reads the mode currently scanned out on each output.
pub struct DrmModeSource {
    card: Rc<Card>,
}

impl DrmModeSource {
    pub fn new(card: Rc<Card>) -> Self {
        Self { card }
    }

    fn find_mode(&self, output: OutputId) -> anyhow::Result<Option<DisplayMode>> {
        let resources = self.card.resource_handles().context("Failed to get DRM resources")?;
        for &handle in resources.connectors() {
            let info = self.card.get_connector(handle, false)?;
            if output_of(info.interface()) != Some(output)
                || info.state() != connector::State::Connected
            {
                continue;
            }
            let Some(encoder) = info.current_encoder() else {
                continue;
            };
            let Some(crtc) = self.card.get_encoder(encoder)?.crtc() else {
                continue;
            };
            if let Some(mode) = self.card.get_crtc(crtc)?.mode() {
                let (width, height) = mode.size();
                return Ok(Some(DisplayMode { width: width.into(), height: height.into() }));
            }
        }
        Ok(None)
    }
}

impl ModeSource for DrmModeSource {
    fn active_mode(&self, output: OutputId) -> Option<DisplayMode> {
        match self.find_mode(output) {
            Ok(mode) => mode,
            Err(e) => {
                debug!("No mode for {:?}: {:#}", output, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_of() {
        assert_eq!(output_of(connector::Interface::DSI), Some(OutputId::Primary));
        assert_eq!(output_of(connector::Interface::HDMIA), Some(OutputId::External));
        assert_eq!(output_of(connector::Interface::Virtual), None);
    }
}
