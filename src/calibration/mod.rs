// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Direction-independent calibration solutions, as consumed by the
//! beamformer.
//!
//! Solutions are read from disk by something else (e.g. an RTS or Offringa
//! reader) and handed over as a [`CalibrationTable`].


use ndarray::prelude::*;

use crate::{config::ConfigError, constants::DEFAULT_CAL_CHAN_WIDTH_HZ, Jones};

/// Calibration Jones matrices for every antenna and calibration channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    /// The dimensions are `[antenna][cal_chan]`.
    pub jones: Array2<Jones>,

    /// The bandwidth of each calibration channel \[Hz\]. Unused if there is
    /// only one calibration channel.
    pub cal_chan_width: f64,
}

impl CalibrationTable {
    pub fn new(jones: Array2<Jones>, cal_chan_width: f64) -> CalibrationTable {
        CalibrationTable {
            jones,
            cal_chan_width,
        }
    }

    /// A table that applies no calibration: a single identity matrix per
    /// antenna.
    pub fn identity(num_antennas: usize) -> CalibrationTable {
        CalibrationTable {
            jones: Array2::from_elem((num_antennas, 1), Jones::identity()),
            cal_chan_width: DEFAULT_CAL_CHAN_WIDTH_HZ,
        }
    }

    pub fn num_antennas(&self) -> usize {
        self.jones.len_of(Axis(0))
    }

    pub fn num_cal_chans(&self) -> usize {
        self.jones.len_of(Axis(1))
    }

    /// The calibration channel that covers fine channel `chan`. A table with a
    /// single channel is a coarse-channel solution used for every fine
    /// channel.
    pub fn cal_chan_index(&self, chan: usize, fine_chan_width: f64) -> usize {
        if self.num_cal_chans() == 1 {
            0
        } else {
            (chan as f64 * fine_chan_width / self.cal_chan_width).floor() as usize
        }
    }

    /// The calibration Jones matrix of `antenna` at fine channel `chan`.
    pub fn lookup(
        &self,
        antenna: usize,
        chan: usize,
        fine_chan_width: f64,
    ) -> Result<Jones, ConfigError> {
        let cal_chan = self.cal_chan_index(chan, fine_chan_width);
        self.jones
            .get((antenna, cal_chan))
            .copied()
            .ok_or(ConfigError::MissingCalibration {
                antenna,
                chan,
                cal_chan,
                num_cal_chans: self.num_cal_chans(),
            })
    }
}
