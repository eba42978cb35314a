// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-antenna flags and amplitudes.


use std::io::BufRead;

use log::{debug, warn};

use crate::config::ConfigError;

/// A single antenna (tile) of the array.
#[derive(Debug, Clone, PartialEq)]
pub struct Antenna {
    /// The position of this antenna in every per-antenna table.
    pub index: usize,

    /// Should this antenna be left out of the coherent beam?
    pub flagged: bool,

    /// The weighting amplitude of this antenna. Usually 1.
    pub amplitude: f64,

    /// Was this antenna flagged by the observation metadata?
    pub flagged_in_metadata: bool,
}

impl Antenna {
    /// Does this antenna contribute to the coherent beam?
    pub fn is_live(&self) -> bool {
        !self.flagged && self.amplitude != 0.0
    }
}

/// All antennas, in the order shared by every per-antenna table.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaTable {
    antennas: Vec<Antenna>,
}

impl AntennaTable {
    /// `num_antennas` unflagged antennas with unit amplitude.
    pub fn new(num_antennas: usize) -> AntennaTable {
        AntennaTable {
            antennas: (0..num_antennas)
                .map(|index| Antenna {
                    index,
                    flagged: false,
                    amplitude: 1.0,
                    flagged_in_metadata: false,
                })
                .collect(),
        }
    }

    /// Antennas as described by observation metadata. An antenna flagged in
    /// the metadata starts out flagged with zero amplitude.
    pub fn from_metadata_flags(metadata_flags: &[bool]) -> AntennaTable {
        AntennaTable {
            antennas: metadata_flags
                .iter()
                .enumerate()
                .map(|(index, &flagged)| Antenna {
                    index,
                    flagged,
                    amplitude: if flagged { 0.0 } else { 1.0 },
                    flagged_in_metadata: flagged,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.antennas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.antennas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Antenna> {
        self.antennas.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Antenna> {
        self.antennas.get(index)
    }

    /// The number of antennas contributing to the coherent beam.
    pub fn num_live(&self) -> usize {
        self.antennas.iter().filter(|a| a.is_live()).count()
    }

    /// Flag the antenna at `index`. Returns `false` if there is no such
    /// antenna.
    pub fn flag(&mut self, index: usize) -> bool {
        match self.antennas.get_mut(index) {
            Some(a) => {
                a.flagged = true;
                a.amplitude = 0.0;
                true
            }
            None => false,
        }
    }

    /// Replace the metadata flags with those in a custom flag file.
    ///
    /// Every antenna has its amplitude reset to 1, and then each
    /// whitespace-separated antenna index in the file is flagged. An
    /// antenna that was flagged in the metadata but isn't flagged by the file
    /// is used anyway, with a warning.
    pub fn apply_custom_flags<R: BufRead>(&mut self, reader: R) -> Result<(), ConfigError> {
        let mut to_flag = vec![];
        for line in reader.lines() {
            let line = line?;
            for token in line.split_whitespace() {
                let index: usize = token.parse().map_err(|_| ConfigError::BadFlagToken {
                    token: token.to_string(),
                })?;
                if index >= self.antennas.len() {
                    return Err(ConfigError::FlagOutOfRange {
                        index,
                        num_antennas: self.antennas.len(),
                    });
                }
                to_flag.push(index);
            }
        }

        for a in self.antennas.iter_mut() {
            a.flagged = false;
            a.amplitude = 1.0;
        }
        for &index in &to_flag {
            self.flag(index);
        }
        debug!("Custom flags applied to antennas {to_flag:?}");

        for a in self.antennas.iter().filter(|a| a.flagged_in_metadata && !a.flagged) {
            warn!(
                "Antenna {} is flagged in the metadata but will be used in the beam",
                a.index
            );
        }

        Ok(())
    }
}

impl std::ops::Index<usize> for AntennaTable {
    type Output = Antenna;

    fn index(&self, index: usize) -> &Antenna {
        &self.antennas[index]
    }
}
