// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

use crate::Fourcc;

/// Errors reported by the overlay plane. None of them are fatal; the plane is
/// left in its last valid state.
#[derive(Error, Debug, PartialEq)]
pub enum OverlayError {
    /// Operation attempted before `initialize()` or after `deinitialize()`.
    #[error("overlay plane is not initialized")]
    NotInitialized,
    /// GPU memory or buffer mapping could not be obtained.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),
    /// Pixel format outside the table of supported overlay formats.
    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(Fourcc),
    /// Non-positive dimensions or stride, or a scale ratio beyond the hardware limit.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// The register write request was rejected by the device.
    #[error("device transaction failure: {0}")]
    DeviceTransactionFailure(String),
    /// A rotated buffer is required but the producer has not made it ready.
    #[error("rotated source buffer is not ready")]
    SourceNotReady,
    /// A filter tap does not fit any exponent of the coefficient register.
    #[error("filter coefficient {0} out of range")]
    CoefficientOutOfRange(f64),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
