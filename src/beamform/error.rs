// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all beamforming-related errors.

use thiserror::Error;

use crate::{config::ConfigError, ShapeMismatch};

#[derive(Error, Debug)]
pub enum BeamformError {
    #[error(transparent)]
    Shape(#[from] ShapeMismatch),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[cfg(feature = "cuda")]
    #[error(transparent)]
    Gpu(#[from] crate::gpu::GpuError),
}
