// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors that can occur when computing beamforming weights.

use thiserror::Error;

use crate::config::ConfigError;

/// A calibration solution can't be used.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("The calibration Jones matrix of antenna {antenna} at fine channel {chan} is singular (|det| = {det_abs:e}) and can't be inverted")]
    Degenerate {
        antenna: usize,
        chan: usize,
        det_abs: f64,
    },
}

#[derive(Error, Debug)]
pub enum WeightError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
