// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Tied-array beamforming for Murchison Widefield Array (MWA) voltage-capture
system (VCS) data.

A one-second block of channelised antenna voltages is turned into a coherent
beam (Stokes I, Q, U, V), an incoherent beam, and, optionally, a reconstructed
time-domain voltage stream obtained by inverting the fine polyphase filterbank.
 */

pub mod antenna;
pub mod beamform;
pub mod calibration;
pub mod config;
pub mod constants;
mod error;
#[cfg(feature = "cuda")]
pub(crate) mod gpu;
pub mod ipfb;
pub mod jones;
pub(crate) mod math;
mod misc;
pub mod pipeline;
pub mod voltages;
pub mod weights;

// Re-exports.
pub use antenna::{Antenna, AntennaTable};
pub use beamform::{
    new_beamformer, BeamBlock, BeamformDevice, BeamformError, Beamformer, BeamformerCpu,
};
pub use calibration::CalibrationTable;
pub use config::{BeamformerConfig, ConfigError};
pub use error::{BeamformerError, ShapeMismatch};
pub use ipfb::{
    InversionMode, IpfbError, Normalisation, PfbInverter, ReconstructedVoltages, SynthesisFilter,
};
pub use jones::Jones;
pub use misc::setup_logging;
pub use pipeline::{
    BeamSink, BlockProcessor, BlockProducts, BlockSource, DelayError, DelayModel, SinkError,
    SourceError, Stage, Timings,
};
pub use voltages::VoltageBlock;
pub use weights::{BeamWeights, CalibrationError, CalibrationPolicy, WeightComputer, WeightError};

#[cfg(feature = "cuda")]
pub use beamform::BeamformerGpu;
#[cfg(feature = "cuda")]
pub use gpu::GpuError;

use num_complex::Complex;

#[allow(non_camel_case_types)]
pub type c32 = Complex<f32>;
#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;
