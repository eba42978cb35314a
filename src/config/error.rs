// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors raised before any blocks are processed.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file '{0}' doesn't have a recognised file extension! Valid extensions are: {1}")]
    UnknownFileType(PathBuf, String),

    #[error("Couldn't decode toml structure from {file:?}:\n{err}")]
    Toml { file: PathBuf, err: String },

    #[error("Couldn't decode json structure from {file:?}:\n{err}")]
    Json { file: PathBuf, err: String },

    #[error("'{0}' must be greater than zero")]
    Zero(&'static str),

    #[error("'{0}' must be a positive, finite number; got {1}")]
    NotPositive(&'static str, f64),

    #[error("The number of fine channels ({0}) must be even")]
    OddChannelCount(usize),

    #[error("The sample rate ({sample_rate}) is not divisible by the decimation factor ({decimation})")]
    IndivisibleDecimation {
        sample_rate: usize,
        decimation: usize,
    },

    #[error("No coarse channel was specified; fine-channel frequencies can't be determined")]
    NoCoarseChannel,

    #[error("Expected {expected} {what}, but got {got}")]
    Count {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("The calibration solutions are {table} Hz wide, but the config says {config} Hz")]
    CalChanWidth { config: f64, table: f64 },

    #[error("No calibration solution for antenna {antenna} covers fine channel {chan} (calibration channel {cal_chan} requested, but only {num_cal_chans} available)")]
    MissingCalibration {
        antenna: usize,
        chan: usize,
        cal_chan: usize,
        num_cal_chans: usize,
    },

    #[error("Couldn't parse '{token}' in the custom flag file as an antenna index")]
    BadFlagToken { token: String },

    #[error("Antenna index {index} in the custom flag file is out of range; there are only {num_antennas} antennas")]
    FlagOutOfRange { index: usize, num_antennas: usize },

    #[error("The synthesis filter has {got} coefficients, which is not a multiple of the number of channels ({num_chans})")]
    FilterLength { got: usize, num_chans: usize },

    #[error("The synthesis filter is for {filter} channels, but the inverter expects {inverter}")]
    FilterChannels { filter: usize, inverter: usize },

    #[error("The ordinary IFFT inversion mode is not available on the GPU; use full polyphase synthesis")]
    GpuIfft,

    #[error("A GPU device was requested, but this build doesn't have GPU support; enable the 'cuda' feature")]
    NoGpuSupport,

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
