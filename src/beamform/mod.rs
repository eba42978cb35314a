// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to combine antenna voltages into coherent and incoherent beams.
//!
//! The same algorithm runs on the CPU ([`BeamformerCpu`]) or a CUDA device
//! ([`BeamformerGpu`], with the "cuda" feature). Use [`new_beamformer`] to get
//! either as a [`Beamformer`] trait object.

mod cpu;
mod error;
#[cfg(feature = "cuda")]
mod gpu;
#[cfg(test)]
mod tests;

pub use cpu::BeamformerCpu;
pub use error::BeamformError;
#[cfg(feature = "cuda")]
pub use gpu::BeamformerGpu;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    c64,
    constants::{NUM_INCOHERENT_POLS, NUM_POLS, NUM_STOKES},
    weights::BeamWeights,
    ShapeMismatch, VoltageBlock,
};

#[derive(
    Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BeamformDevice {
    /// The CPU is used for beamforming. This always uses double-precision
    /// floats.
    #[default]
    Cpu,

    /// A CUDA-capable device is used for beamforming. The precision depends on
    /// the compile features used. Only available with the "cuda" feature.
    Gpu,
}

impl BeamformDevice {
    pub fn get_precision(self) -> &'static str {
        match self {
            BeamformDevice::Cpu => "double",
            BeamformDevice::Gpu if cfg!(feature = "gpu-single") => "single",
            BeamformDevice::Gpu => "double",
        }
    }

    /// Get a formatted string with information on the device used for
    /// beamforming.
    pub fn get_device_info(self) -> Result<String, BeamformError> {
        match self {
            BeamformDevice::Cpu => Ok(get_cpu_info()),

            #[cfg(feature = "cuda")]
            BeamformDevice::Gpu => {
                let (device_info, driver_info) = crate::gpu::get_device_info()?;
                Ok(format!(
                    "{} (capability {}, {} MiB), CUDA driver {}, runtime {}",
                    device_info.name,
                    device_info.capability,
                    device_info.total_global_mem,
                    driver_info.driver_version,
                    driver_info.runtime_version
                ))
            }

            #[cfg(not(feature = "cuda"))]
            BeamformDevice::Gpu => Err(crate::config::ConfigError::NoGpuSupport.into()),
        }
    }
}

/// Get a formatted string with information on the CPU.
pub(crate) fn get_cpu_info() -> String {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        // Non-exhaustive but perhaps most-interesting CPU features.
        let avx = std::arch::is_x86_feature_detected!("avx");
        let avx2 = std::arch::is_x86_feature_detected!("avx2");
        let avx512 = std::arch::is_x86_feature_detected!("avx512f");

        match (avx512, avx2, avx) {
            (true, _, _) => {
                format!("{} CPU (AVX512 available)", std::env::consts::ARCH)
            }
            (false, true, _) => {
                format!("{} CPU (AVX2 available)", std::env::consts::ARCH)
            }
            (false, false, true) => {
                format!("{} CPU (AVX available)", std::env::consts::ARCH)
            }
            (false, false, false) => {
                format!("{} CPU (AVX unavailable!)", std::env::consts::ARCH)
            }
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    format!("{} CPU", std::env::consts::ARCH)
}

/// The beams formed from one [`VoltageBlock`].
#[derive(Debug, Clone, PartialEq)]
pub struct BeamBlock {
    /// The complex, calibrated beam before detection. The dimensions are
    /// `[time][chan][pol]`.
    pub detected_beam: Array3<c64>,

    /// Stokes I, Q, U and V. The dimensions are `[time / decimation][chan][4]`.
    pub coherent: Array3<f32>,

    /// Total power summed over antennas. The dimensions are `[time /
    /// decimation][chan][1]`.
    pub incoherent: Array3<f32>,
}

impl BeamBlock {
    /// Allocate a zeroed [`BeamBlock`].
    pub fn new(
        num_samples: usize,
        num_chans: usize,
        decimation: usize,
    ) -> Result<BeamBlock, ShapeMismatch> {
        let num_out = output_samples(num_samples, decimation)?;
        Ok(BeamBlock {
            detected_beam: Array3::zeros((num_samples, num_chans, NUM_POLS)),
            coherent: Array3::zeros((num_out, num_chans, NUM_STOKES)),
            incoherent: Array3::zeros((num_out, num_chans, NUM_INCOHERENT_POLS)),
        })
    }

    pub fn num_samples(&self) -> usize {
        self.detected_beam.len_of(Axis(0))
    }

    pub fn num_chans(&self) -> usize {
        self.detected_beam.len_of(Axis(1))
    }

    /// The number of samples averaged into each coherent and incoherent
    /// sample.
    pub fn decimation(&self) -> usize {
        match self.coherent.len_of(Axis(0)) {
            0 => 0,
            n => self.num_samples() / n,
        }
    }

    /// Does anything in this block contain a NaN or infinity?
    pub fn has_non_finite(&self) -> bool {
        self.detected_beam
            .iter()
            .any(|c| !c.re.is_finite() || !c.im.is_finite())
            || self.coherent.iter().any(|f| !f.is_finite())
            || self.incoherent.iter().any(|f| !f.is_finite())
    }
}

/// The number of decimated samples, or an error if `num_samples` can't be
/// decimated evenly.
fn output_samples(num_samples: usize, decimation: usize) -> Result<usize, ShapeMismatch> {
    if decimation == 0 {
        return Err(ShapeMismatch {
            what: "decimation factor",
            expected: 1,
            got: 0,
        });
    }
    ShapeMismatch::check(
        "samples left over after decimation",
        0,
        num_samples % decimation,
    )?;
    Ok(num_samples / decimation)
}

/// Check that the inputs and outputs of a beamformer agree with each other.
/// The decimation factor implied by `out` is returned.
pub(crate) fn check_shapes(
    voltages: &VoltageBlock,
    weights: &BeamWeights,
    out: &BeamBlock,
) -> Result<usize, ShapeMismatch> {
    ShapeMismatch::check("antennas", weights.num_antennas(), voltages.num_antennas())?;
    ShapeMismatch::check("channels", weights.num_chans(), voltages.num_chans())?;
    ShapeMismatch::check("polarisations", NUM_POLS, voltages.num_pols())?;
    ShapeMismatch::check("weight polarisations", NUM_POLS, weights.weights.len_of(Axis(2)))?;
    ShapeMismatch::check(
        "inverse Jones antennas",
        weights.num_antennas(),
        weights.inv_jones.len_of(Axis(0)),
    )?;
    ShapeMismatch::check(
        "inverse Jones channels",
        weights.num_chans(),
        weights.inv_jones.len_of(Axis(1)),
    )?;

    let num_samples = voltages.num_samples();
    let num_chans = voltages.num_chans();
    ShapeMismatch::check("detected beam samples", num_samples, out.num_samples())?;
    ShapeMismatch::check("detected beam channels", num_chans, out.num_chans())?;
    ShapeMismatch::check(
        "detected beam polarisations",
        NUM_POLS,
        out.detected_beam.len_of(Axis(2)),
    )?;
    ShapeMismatch::check("coherent channels", num_chans, out.coherent.len_of(Axis(1)))?;
    ShapeMismatch::check("Stokes parameters", NUM_STOKES, out.coherent.len_of(Axis(2)))?;
    ShapeMismatch::check(
        "incoherent samples",
        out.coherent.len_of(Axis(0)),
        out.incoherent.len_of(Axis(0)),
    )?;
    ShapeMismatch::check("incoherent channels", num_chans, out.incoherent.len_of(Axis(1)))?;
    ShapeMismatch::check(
        "incoherent polarisations",
        NUM_INCOHERENT_POLS,
        out.incoherent.len_of(Axis(2)),
    )?;

    let num_out = out.coherent.len_of(Axis(0));
    if num_out == 0 {
        return Err(ShapeMismatch {
            what: "coherent samples",
            expected: 1,
            got: 0,
        });
    }
    ShapeMismatch::check(
        "samples left over after decimation",
        0,
        num_samples % num_out,
    )?;
    Ok(num_samples / num_out)
}

/// An object that forms beams from channelised antenna voltages.
pub trait Beamformer: Send {
    /// The device doing the work.
    fn device(&self) -> BeamformDevice;

    /// Form the beams for a single block, averaging every `decimation`
    /// samples of the coherent and incoherent beams.
    ///
    /// This function is not as efficient as [`Beamformer::form_beam_into`],
    /// because that function does not need to allocate its own buffers.
    ///
    /// # Errors
    ///
    /// This function will return an error if the shapes of the voltages and
    /// weights disagree, the number of samples isn't divisible by
    /// `decimation`, or there was a CUDA error.
    fn form_beam(
        &mut self,
        voltages: &VoltageBlock,
        weights: &BeamWeights,
        decimation: usize,
    ) -> Result<BeamBlock, BeamformError> {
        let mut out = BeamBlock::new(voltages.num_samples(), voltages.num_chans(), decimation)?;
        self.form_beam_into(voltages, weights, &mut out)?;
        Ok(out)
    }

    /// Form the beams for a single block into existing buffers. The decimation
    /// factor is implied by the number of coherent samples in `out`. Every
    /// element of `out` is overwritten.
    fn form_beam_into(
        &mut self,
        voltages: &VoltageBlock,
        weights: &BeamWeights,
        out: &mut BeamBlock,
    ) -> Result<(), BeamformError>;
}

/// Create a [`Beamformer`] trait object that forms beams on the CPU or a
/// CUDA-compatible GPU.
///
/// # Errors
///
/// This function will return an error if the GPU is requested without the
/// "cuda" feature, or if GPU buffers can't be allocated.
pub fn new_beamformer(
    device: BeamformDevice,
    num_antennas: usize,
    num_samples: usize,
    num_chans: usize,
) -> Result<Box<dyn Beamformer>, BeamformError> {
    match device {
        BeamformDevice::Cpu => Ok(Box::new(BeamformerCpu::new())),

        #[cfg(feature = "cuda")]
        BeamformDevice::Gpu => Ok(Box::new(BeamformerGpu::new(
            num_antennas,
            num_samples,
            num_chans,
        )?)),

        #[cfg(not(feature = "cuda"))]
        BeamformDevice::Gpu => {
            let _ = (num_antennas, num_samples, num_chans);
            Err(crate::config::ConfigError::NoGpuSupport.into())
        }
    }
}
