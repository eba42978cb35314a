// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Inverting the fine polyphase filterbank (PFB) to reconstruct a time series
//! of voltages from a channelised beam.

mod cpu;
mod error;
mod filter;
#[cfg(feature = "cuda")]
mod gpu;
#[cfg(test)]
mod tests;

pub use error::IpfbError;
pub use filter::SynthesisFilter;

use std::sync::Arc;

use log::{debug, warn};
use ndarray::prelude::*;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    beamform::BeamformDevice, c32, c64, config::ConfigError, constants::NUM_POLS, ShapeMismatch,
};

/// If the mean of normalised voltages is bigger than this fraction of their
/// standard deviation, a warning is issued.
const MEAN_WARNING_FRACTION: f64 = 0.1;

#[derive(
    Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InversionMode {
    /// An inverse FFT of each time step's channels. Cheap, but has
    /// discontinuities every `num_chans` samples.
    Ifft,

    /// Full polyphase synthesis with the [`SynthesisFilter`].
    Full,
}

/// Reconstructed voltages for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedVoltages {
    /// The dimensions are `[time * num_chans][pol]`.
    pub samples: Array2<c32>,

    /// The factor that `samples` have been multiplied by since they were
    /// reconstructed.
    pub gain: f32,
}

impl ReconstructedVoltages {
    pub fn num_samples(&self) -> usize {
        self.samples.len_of(Axis(0))
    }

    /// Scale the samples so that the standard deviation of their real and
    /// imaginary components is `target_rms`, ready for quantisation. The
    /// applied factor is folded into `gain`.
    ///
    /// Samples containing NaN or infinite values, or with no spread, are left
    /// alone.
    pub fn normalise(&mut self, target_rms: f32) -> Normalisation {
        let n = (self.samples.len() * 2) as f64;
        if n == 0.0 {
            return Normalisation::NoSpread;
        }
        let (sum, sum_sq) = self
            .samples
            .iter()
            .flat_map(|c| [c.re as f64, c.im as f64])
            .fold((0.0, 0.0), |(s, ss), v| (s + v, ss + v * v));
        if !sum.is_finite() || !sum_sq.is_finite() {
            warn!("Reconstructed voltages contain non-finite values; not normalising them");
            return Normalisation::NonFinite;
        }
        let mean = sum / n;
        let std = (sum_sq / n - mean * mean).max(0.0).sqrt();
        if std == 0.0 {
            debug!("Reconstructed voltages have no spread; not normalising them");
            return Normalisation::NoSpread;
        }
        if mean.abs() > MEAN_WARNING_FRACTION * std {
            warn!("Reconstructed voltages have a significantly non-zero mean ({mean:.3} vs. a standard deviation of {std:.3})");
        }

        let gain = (f64::from(target_rms) / std) as f32;
        self.samples.mapv_inplace(|c| c * gain);
        self.gain *= gain;
        Normalisation::Scaled(gain)
    }
}

/// What [`ReconstructedVoltages::normalise`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalisation {
    /// The samples were multiplied by this factor.
    Scaled(f32),

    /// All samples are identical (or there are none); nothing was done.
    NoSpread,

    /// A sample is NaN or infinite; nothing was done.
    NonFinite,
}

enum Backend {
    Cpu,
    #[cfg(feature = "cuda")]
    Gpu(gpu::IpfbGpu),
}

/// Inverts the fine PFB one block at a time. Blocks must be given in order; in
/// [`InversionMode::Full`], the last `taps_per_chan - 1` rows of each block
/// are kept to seed the next.
pub struct PfbInverter {
    mode: InversionMode,
    filter: Arc<SynthesisFilter>,
    ifft: Arc<dyn Fft<f64>>,
    backend: Backend,

    /// The previous block's last input rows. The dimensions are
    /// `[taps_per_chan - 1][chan][pol]`.
    history: Array3<c64>,

    /// The number of input rows still to come before outputs are no longer
    /// affected by the lack of history.
    warmup_rows: usize,
}

impl PfbInverter {
    /// # Errors
    ///
    /// This function will return an error if the filter doesn't have
    /// `num_chans` channels, if the ordinary inverse FFT is requested on the
    /// GPU, or if GPU buffers can't be set up.
    pub fn new(
        mode: InversionMode,
        num_chans: usize,
        filter: Arc<SynthesisFilter>,
        device: BeamformDevice,
    ) -> Result<PfbInverter, IpfbError> {
        if filter.num_chans() != num_chans {
            return Err(ConfigError::FilterChannels {
                filter: filter.num_chans(),
                inverter: num_chans,
            }
            .into());
        }

        let backend = match (device, mode) {
            (BeamformDevice::Cpu, _) => Backend::Cpu,
            (BeamformDevice::Gpu, InversionMode::Ifft) => return Err(ConfigError::GpuIfft.into()),

            #[cfg(feature = "cuda")]
            (BeamformDevice::Gpu, InversionMode::Full) => Backend::Gpu(gpu::IpfbGpu::new(&filter)?),

            #[cfg(not(feature = "cuda"))]
            (BeamformDevice::Gpu, InversionMode::Full) => {
                return Err(ConfigError::NoGpuSupport.into())
            }
        };

        let ifft = FftPlanner::new().plan_fft_inverse(num_chans);
        let num_history_rows = filter.taps_per_chan() - 1;
        debug!("Set up a {mode} PFB inverter for {num_chans} channels on the {device}");
        Ok(PfbInverter {
            mode,
            ifft,
            backend,
            history: Array3::zeros((num_history_rows, num_chans, NUM_POLS)),
            warmup_rows: num_history_rows,
            filter,
        })
    }

    pub fn mode(&self) -> InversionMode {
        self.mode
    }

    pub fn num_chans(&self) -> usize {
        self.filter.num_chans()
    }

    /// Forget all previous blocks.
    pub fn reset(&mut self) {
        self.history.fill(c64::default());
        self.warmup_rows = self.history.len_of(Axis(0));
    }

    /// Reconstruct `num_samples * num_chans` voltages per polarisation from a
    /// `[time][chan][pol]` detected beam.
    pub fn invert(
        &mut self,
        detected_beam: ArrayView3<c64>,
    ) -> Result<ReconstructedVoltages, IpfbError> {
        ShapeMismatch::check(
            "inverter channels",
            self.num_chans(),
            detected_beam.len_of(Axis(1)),
        )?;
        ShapeMismatch::check(
            "inverter polarisations",
            NUM_POLS,
            detected_beam.len_of(Axis(2)),
        )?;

        let samples = match self.mode {
            InversionMode::Ifft => cpu::ifft_synthesise(detected_beam, &*self.ifft),
            InversionMode::Full => self.synthesise(detected_beam)?,
        };

        Ok(ReconstructedVoltages {
            samples: samples.mapv(|c| c32::new(c.re as f32, c.im as f32)),
            gain: 1.0,
        })
    }

    fn synthesise(&mut self, detected_beam: ArrayView3<c64>) -> Result<Array2<c64>, IpfbError> {
        let num_rows = detected_beam.len_of(Axis(0));
        let input = ndarray::concatenate(Axis(0), &[self.history.view(), detected_beam.view()])
            .expect("channel and pol counts were checked");

        let mut out = match &mut self.backend {
            Backend::Cpu => cpu::polyphase_synthesise(input.view(), &self.filter, &*self.ifft),
            #[cfg(feature = "cuda")]
            Backend::Gpu(g) => g.synthesise(input.view())?,
        };

        // Outputs that needed rows from before the first block are only
        // partially formed.
        let num_chans = self.num_chans();
        let num_warmup = self.warmup_rows.min(num_rows);
        out.slice_mut(s![..num_warmup * num_chans, ..])
            .fill(c64::default());
        self.warmup_rows -= num_warmup;

        self.history.assign(&input.slice(s![num_rows.., .., ..]));
        Ok(out)
    }
}
