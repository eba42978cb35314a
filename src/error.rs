// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all beamformer-related errors. This should be the *only*
//! error enum that callers need to handle.

use thiserror::Error;

use crate::{
    beamform::BeamformError,
    config::ConfigError,
    ipfb::IpfbError,
    pipeline::{DelayError, SinkError, SourceError},
    weights::{CalibrationError, WeightError},
};

/// The dimensions of two arrays that should agree don't. This is always a bug
/// in the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Shape mismatch in {what}: expected {expected}, got {got}")]
pub struct ShapeMismatch {
    pub what: &'static str,
    pub expected: usize,
    pub got: usize,
}

impl ShapeMismatch {
    /// Return an error if `got` isn't `expected`.
    pub(crate) fn check(what: &'static str, expected: usize, got: usize) -> Result<(), Self> {
        if expected == got {
            Ok(())
        } else {
            Err(Self {
                what,
                expected,
                got,
            })
        }
    }
}

#[derive(Error, Debug)]
pub enum BeamformerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Shape(#[from] ShapeMismatch),

    #[error(transparent)]
    Weights(#[from] WeightError),

    #[error(transparent)]
    Beamform(#[from] BeamformError),

    #[error(transparent)]
    Ipfb(#[from] IpfbError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Delay(#[from] DelayError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[cfg(feature = "cuda")]
    #[error(transparent)]
    Gpu(#[from] crate::gpu::GpuError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
