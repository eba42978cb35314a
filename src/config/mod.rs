// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run-wide beamformer settings.
//!
//! A [`BeamformerConfig`] can be built in code or read from a toml or json
//! file. Every field has a default, so a file only needs to specify what
//! differs.

mod error;

pub use error::ConfigError;

use std::{fs::File, io::Read, path::Path, str::FromStr};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    beamform::BeamformDevice,
    constants::*,
    ipfb::InversionMode,
    weights::CalibrationPolicy,
};

#[derive(Debug, Display, EnumIter, EnumString)]
enum ConfigFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeamformerConfig {
    /// The number of antennas (tiles) in the voltage data.
    pub num_antennas: usize,

    /// The number of fine channels in a coarse channel.
    pub num_fine_chans: usize,

    /// The bandwidth of a fine channel \[Hz\].
    pub fine_chan_width: f64,

    /// The number of samples per fine channel in a one-second block.
    pub sample_rate: usize,

    /// The receiver channel number of the coarse channel being beamformed.
    pub coarse_chan: Option<u32>,

    /// The number of consecutive samples averaged into each coherent and
    /// incoherent output sample.
    pub decimation: usize,

    /// The bandwidth of a calibration channel \[Hz\].
    pub cal_chan_width: f64,

    pub calibration_policy: CalibrationPolicy,

    pub device: BeamformDevice,

    /// The number of synthesis filter taps per channel.
    pub taps_per_chan: usize,

    pub coherent: bool,
    pub incoherent: bool,

    /// Reconstruct voltages with the ordinary inverse FFT.
    pub vdif: bool,

    /// Reconstruct voltages with full polyphase synthesis.
    pub uvdif: bool,

    /// The RMS reconstructed voltages are normalised to.
    pub vdif_target_rms: f32,
}

impl Default for BeamformerConfig {
    fn default() -> Self {
        Self {
            num_antennas: DEFAULT_NUM_ANTENNAS,
            num_fine_chans: DEFAULT_NUM_FINE_CHANS,
            fine_chan_width: DEFAULT_FINE_CHAN_WIDTH_HZ,
            sample_rate: DEFAULT_SAMPLE_RATE,
            coarse_chan: None,
            decimation: 1,
            cal_chan_width: DEFAULT_CAL_CHAN_WIDTH_HZ,
            calibration_policy: CalibrationPolicy::default(),
            device: BeamformDevice::default(),
            taps_per_chan: DEFAULT_TAPS_PER_CHAN,
            coherent: false,
            incoherent: false,
            vdif: false,
            uvdif: false,
            vdif_target_rms: DEFAULT_VDIF_TARGET_RMS,
        }
    }
}

impl BeamformerConfig {
    /// Read a config from a toml or json file, as determined by its
    /// extension. The result is validated.
    pub fn read<P: AsRef<Path>>(file: P) -> Result<BeamformerConfig, ConfigError> {
        let file = file.as_ref();
        debug!("Attempting to parse config file {}", file.display());

        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ConfigFileType::from_str(&e).ok());

        let mut contents = String::new();
        let config: BeamformerConfig = match file_type {
            Some(ConfigFileType::Toml) => {
                debug!("Parsing toml file...");
                File::open(file)?.read_to_string(&mut contents)?;
                toml::from_str(&contents).map_err(|err| ConfigError::Toml {
                    file: file.to_path_buf(),
                    err: err.to_string(),
                })?
            }
            Some(ConfigFileType::Json) => {
                debug!("Parsing json file...");
                File::open(file)?.read_to_string(&mut contents)?;
                serde_json::from_str(&contents).map_err(|err| ConfigError::Json {
                    file: file.to_path_buf(),
                    err: err.to_string(),
                })?
            }
            None => {
                return Err(ConfigError::UnknownFileType(
                    file.to_path_buf(),
                    ConfigFileType::iter().join(", "),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that these settings make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("num_antennas", self.num_antennas),
            ("num_fine_chans", self.num_fine_chans),
            ("sample_rate", self.sample_rate),
            ("decimation", self.decimation),
            ("taps_per_chan", self.taps_per_chan),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        for (name, value) in [
            ("fine_chan_width", self.fine_chan_width),
            ("cal_chan_width", self.cal_chan_width),
            ("vdif_target_rms", f64::from(self.vdif_target_rms)),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive(name, value));
            }
        }

        if self.num_fine_chans % 2 != 0 {
            return Err(ConfigError::OddChannelCount(self.num_fine_chans));
        }
        if self.sample_rate % self.decimation != 0 {
            return Err(ConfigError::IndivisibleDecimation {
                sample_rate: self.sample_rate,
                decimation: self.decimation,
            });
        }

        if matches!(self.device, BeamformDevice::Gpu) {
            if !cfg!(feature = "cuda") {
                return Err(ConfigError::NoGpuSupport);
            }
            if self.vdif {
                return Err(ConfigError::GpuIfft);
            }
        }

        Ok(())
    }

    /// Is the coherent beam wanted? It's the default product, so it is wanted
    /// if nothing else is.
    pub fn output_coherent(&self) -> bool {
        self.coherent || !(self.incoherent || self.vdif || self.uvdif)
    }

    /// The inversion modes that have been asked for, in the order (IFFT,
    /// full).
    pub fn inversion_modes(&self) -> Vec<InversionMode> {
        let mut modes = vec![];
        if self.vdif {
            modes.push(InversionMode::Ifft);
        }
        if self.uvdif {
            modes.push(InversionMode::Full);
        }
        modes
    }

    /// The number of coherent and incoherent samples per block.
    pub fn num_output_samples(&self) -> usize {
        self.sample_rate / self.decimation
    }

    /// The centre frequencies of each fine channel \[Hz\]. The first fine
    /// channel sits at the bottom edge of the coarse channel.
    pub fn chan_freqs(&self) -> Result<Vec<f64>, ConfigError> {
        let coarse_chan = self.coarse_chan.ok_or(ConfigError::NoCoarseChannel)?;
        let start = f64::from(coarse_chan) * COARSE_CHAN_WIDTH_HZ - COARSE_CHAN_WIDTH_HZ / 2.0;
        Ok((0..self.num_fine_chans)
            .map(|c| start + c as f64 * self.fine_chan_width)
            .collect())
    }
}
