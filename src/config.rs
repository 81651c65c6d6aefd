// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Hardware tunables of the overlay plane.
//!
//! Every field has a default matching the overlay hardware, so a config file
//! only needs to name the values it overrides:
//!
//! ```json
//! { "init_brightness": 0, "init_saturation": 128 }
//! ```

use std::fs;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use log::warn;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Largest integer part of a luma or chroma horizontal scale factor.
    pub max_scaling_ratio: u32,
    /// Filter cutoff frequencies are clamped to this range before generating taps.
    pub min_cutoff_freq: f64,
    pub max_cutoff_freq: f64,
    pub init_contrast: u32,
    pub init_brightness: i32,
    pub init_saturation: u32,
    pub init_colorkey: u32,
    pub init_colorkey_mask: u32,
    /// Alignment in bytes of the back buffer allocation.
    pub back_buffer_alignment: usize,
    /// Expected number of distinct rotated buffers cycling through the plane.
    pub data_buffer_count: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_scaling_ratio: 7,
            min_cutoff_freq: 1.0,
            max_cutoff_freq: 3.0,
            init_contrast: 0x4b,
            init_brightness: -19,
            init_saturation: 0x92,
            init_colorkey: 0,
            init_colorkey_mask: 0,
            back_buffer_alignment: 64 * 1024,
            data_buffer_count: 4,
        }
    }
}

impl OverlayConfig {
    pub fn parse(input: &[u8]) -> Result<Self> {
        let config: OverlayConfig =
            serde_json::from_slice(input).context("Failed to parse overlay config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read(path)
            .with_context(|| format!("Failed to read overlay config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid overlay config {}", path.display()))
    }

    /// Reads `path` if it exists, falling back to the hardware defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}, using default overlay config", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.min_cutoff_freq > 0.0 && self.min_cutoff_freq <= self.max_cutoff_freq) {
            bail!(
                "Cutoff range [{}, {}] is empty or non-positive",
                self.min_cutoff_freq,
                self.max_cutoff_freq
            );
        }
        if self.max_scaling_ratio == 0 {
            bail!("max_scaling_ratio must be positive");
        }
        if !self.back_buffer_alignment.is_power_of_two() {
            bail!("back_buffer_alignment {} is not a power of two", self.back_buffer_alignment);
        }
        Ok(())
    }
}
