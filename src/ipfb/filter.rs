// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The filter used to resynthesise a time series from fine channels.

use log::debug;
#[cfg(any(feature = "cuda", test))]
use ndarray::Array2;

use crate::{config::ConfigError, constants::PI};
#[cfg(any(feature = "cuda", test))]
use crate::{c64, constants::TAU, math::cexp};

/// A prototype low-pass filter of `taps_per_chan * num_chans` coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisFilter {
    num_chans: usize,
    taps_per_chan: usize,
    prototype: Vec<f64>,
}

impl SynthesisFilter {
    /// Design a Hann-windowed sinc filter with a cutoff at half a channel
    /// width, scaled so that its coefficients sum to `num_chans`.
    pub fn windowed_sinc(
        num_chans: usize,
        taps_per_chan: usize,
    ) -> Result<SynthesisFilter, ConfigError> {
        if taps_per_chan == 0 {
            return Err(ConfigError::Zero("taps_per_chan"));
        }
        check_num_chans(num_chans)?;

        let len = num_chans * taps_per_chan;
        let centre = (len as f64 - 1.0) / 2.0;
        let mut prototype: Vec<f64> = (0..len)
            .map(|i| {
                let x = (i as f64 - centre) / num_chans as f64;
                let sinc = if x == 0.0 {
                    1.0
                } else {
                    (PI * x).sin() / (PI * x)
                };
                let window = (PI * (i as f64 + 0.5) / len as f64).sin().powi(2);
                sinc * window
            })
            .collect();
        let sum: f64 = prototype.iter().sum();
        let scale = num_chans as f64 / sum;
        prototype.iter_mut().for_each(|h| *h *= scale);

        debug!("Designed a {taps_per_chan}-tap windowed-sinc synthesis filter for {num_chans} channels");
        Ok(Self::from_prototype(prototype, num_chans))
    }

    /// Use an externally supplied table of filter coefficients, multiplying
    /// each by `scale`. The number of coefficients must be a multiple of
    /// `num_chans`.
    pub fn from_coefficients(
        coeffs: &[f64],
        num_chans: usize,
        scale: f64,
    ) -> Result<SynthesisFilter, ConfigError> {
        check_num_chans(num_chans)?;
        if coeffs.is_empty() || coeffs.len() % num_chans != 0 {
            return Err(ConfigError::FilterLength {
                got: coeffs.len(),
                num_chans,
            });
        }

        let prototype = coeffs.iter().map(|c| c * scale).collect();
        Ok(Self::from_prototype(prototype, num_chans))
    }

    fn from_prototype(prototype: Vec<f64>, num_chans: usize) -> SynthesisFilter {
        SynthesisFilter {
            num_chans,
            taps_per_chan: prototype.len() / num_chans,
            prototype,
        }
    }

    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    pub fn taps_per_chan(&self) -> usize {
        self.taps_per_chan
    }

    /// The real prototype filter `h`.
    pub fn prototype(&self) -> &[f64] {
        &self.prototype
    }

    /// The prototype phase-ramped to the centre of each fine channel,
    /// `g_c[i] = h[i] exp(2πi (c - N/2) i / N)`. The dimensions are
    /// `[chan][taps_per_chan * num_chans]`. Only the GPU applies these
    /// directly; the CPU gets the same result from an FFT.
    #[cfg(any(feature = "cuda", test))]
    pub(crate) fn ramps(&self) -> Array2<c64> {
        let num_chans = self.num_chans;
        let half = (num_chans / 2) as i64;
        let n = num_chans as i64;
        Array2::from_shape_fn((num_chans, self.prototype.len()), |(c, i)| {
            // Reduce the phase exactly before going to floats.
            let turns = ((c as i64 - half) * i as i64).rem_euclid(n);
            self.prototype[i] * cexp(TAU * turns as f64 / num_chans as f64)
        })
    }
}

fn check_num_chans(num_chans: usize) -> Result<(), ConfigError> {
    if num_chans == 0 {
        return Err(ConfigError::Zero("num_fine_chans"));
    }
    if num_chans % 2 != 0 {
        return Err(ConfigError::OddChannelCount(num_chans));
    }
    Ok(())
}
