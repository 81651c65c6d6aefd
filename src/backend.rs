// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Device traits implemented on top of the PowerVR/PSB display driver.

mod kms;
mod psb;

pub use kms::Card;
pub use kms::DrmModeSource;
pub use kms::DEFAULT_CARD_PATH;
pub use psb::PsbRegisterChannel;
