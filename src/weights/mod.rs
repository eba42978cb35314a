// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning per-antenna delays and calibration solutions into beamforming
//! weights.

mod error;

pub use error::{CalibrationError, WeightError};

use log::{debug, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    antenna::AntennaTable,
    c64,
    calibration::CalibrationTable,
    config::{BeamformerConfig, ConfigError},
    constants::{DEGENERATE_DETERMINANT_TOLERANCE, NUM_POLS},
    math::phase_rotor,
    Jones,
};

/// What to do with an antenna whose calibration solution can't be inverted.
#[derive(
    Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CalibrationPolicy {
    /// Warn, then leave the antenna out of the beam for the whole block.
    #[default]
    ZeroAntenna,

    /// Stop processing.
    Abort,
}

/// Everything the beamformer needs to combine antennas for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamWeights {
    /// Complex weights. The dimensions are `[antenna][chan][pol]`.
    pub weights: Array3<c64>,

    /// Inverted calibration Jones matrices. The dimensions are
    /// `[antenna][chan]`.
    pub inv_jones: Array2<Jones>,

    /// The factor that beam powers are multiplied by. Zero if no antennas are
    /// live.
    pub norm: f64,

    /// The number of antennas contributing to the coherent beam.
    pub num_live: usize,
}

impl BeamWeights {
    pub fn num_antennas(&self) -> usize {
        self.weights.len_of(Axis(0))
    }

    pub fn num_chans(&self) -> usize {
        self.weights.len_of(Axis(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AntennaStatus {
    Live,
    Flagged,
    Degenerate,
}

/// Computes [`BeamWeights`]. Each call is independent of the last; identical
/// inputs give bit-identical outputs.
#[derive(Debug, Clone)]
pub struct WeightComputer {
    num_antennas: usize,
    fine_chan_width: f64,
    policy: CalibrationPolicy,
}

impl WeightComputer {
    pub fn new(
        num_antennas: usize,
        fine_chan_width: f64,
        policy: CalibrationPolicy,
    ) -> WeightComputer {
        WeightComputer {
            num_antennas,
            fine_chan_width,
            policy,
        }
    }

    pub fn from_config(config: &BeamformerConfig) -> WeightComputer {
        Self::new(
            config.num_antennas,
            config.fine_chan_width,
            config.calibration_policy,
        )
    }

    /// Compute weights from the geometric delays of each antenna \[s\] and
    /// the centre frequency of each fine channel \[Hz\].
    pub fn compute(
        &self,
        delays: &[f64],
        calibration: &CalibrationTable,
        antennas: &AntennaTable,
        chan_freqs: &[f64],
    ) -> Result<BeamWeights, WeightError> {
        for (what, got) in [
            ("delays", delays.len()),
            ("antennas", antennas.len()),
            ("calibrated antennas", calibration.num_antennas()),
        ] {
            if got != self.num_antennas {
                return Err(ConfigError::Count {
                    what,
                    expected: self.num_antennas,
                    got,
                }
                .into());
            }
        }

        let num_chans = chan_freqs.len();
        let mut weights = Array3::zeros((self.num_antennas, num_chans, NUM_POLS));
        let mut inv_jones = Array2::from_elem((self.num_antennas, num_chans), Jones::zero());

        let statuses = weights
            .outer_iter_mut()
            .into_par_iter()
            .zip(inv_jones.outer_iter_mut())
            .zip(delays.par_iter())
            .enumerate()
            .map(|(i_ant, ((mut weights, mut inv_jones), &delay))| {
                let antenna = &antennas[i_ant];
                if !antenna.is_live() {
                    return Ok(AntennaStatus::Flagged);
                }

                for (i_chan, ((mut weights, inv_jones), &freq)) in weights
                    .outer_iter_mut()
                    .zip(inv_jones.iter_mut())
                    .zip(chan_freqs)
                    .enumerate()
                {
                    let j = calibration.lookup(i_ant, i_chan, self.fine_chan_width)?;
                    match j.try_inv(DEGENERATE_DETERMINANT_TOLERANCE) {
                        Some(inv) => *inv_jones = inv,
                        None => {
                            let err = CalibrationError::Degenerate {
                                antenna: i_ant,
                                chan: i_chan,
                                det_abs: j.det().norm(),
                            };
                            match self.policy {
                                CalibrationPolicy::Abort => return Err(err.into()),
                                CalibrationPolicy::ZeroAntenna => {
                                    warn!("{err}; antenna {i_ant} is excluded from the beam");
                                    return Ok(AntennaStatus::Degenerate);
                                }
                            }
                        }
                    }

                    weights.fill(phase_rotor(freq, delay) * antenna.amplitude);
                }

                Ok(AntennaStatus::Live)
            })
            .collect::<Result<Vec<_>, WeightError>>()?;

        // Antennas that were given up on part way through still have some
        // non-zero entries.
        for (i_ant, _) in statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == AntennaStatus::Degenerate)
        {
            weights.slice_mut(s![i_ant, .., ..]).fill(c64::default());
            inv_jones.slice_mut(s![i_ant, ..]).fill(Jones::zero());
        }

        let amplitude_sum: f64 = statuses
            .iter()
            .zip(antennas.iter())
            .filter(|(s, _)| **s == AntennaStatus::Live)
            .map(|(_, a)| a.amplitude)
            .sum();
        let num_live = statuses
            .iter()
            .filter(|s| **s == AntennaStatus::Live)
            .count();
        let norm = if num_live == 0 || amplitude_sum == 0.0 {
            0.0
        } else {
            1.0 / (NUM_POLS as f64 * amplitude_sum)
        };
        debug!("{num_live} of {} antennas are live; norm = {norm}", self.num_antennas);

        Ok(BeamWeights {
            weights,
            inv_jones,
            norm,
            num_live,
        })
    }
}
