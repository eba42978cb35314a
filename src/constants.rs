// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All floating-point constants are double precision. Calculations should be done
in double precision for as long as possible before converting to a lower
precision for output.
 */

pub use std::f64::consts::{PI, TAU};

/// The number of instrumental polarisations (X and Y).
pub const NUM_POLS: usize = 2;

/// The number of output polarisations of the coherent beam (Stokes I, Q, U,
/// V).
pub const NUM_STOKES: usize = 4;

/// The number of output polarisations of the incoherent beam (total power).
pub const NUM_INCOHERENT_POLS: usize = 1;

/// The default number of MWA tiles.
pub const DEFAULT_NUM_ANTENNAS: usize = 128;

/// The default number of fine channels per coarse channel.
pub const DEFAULT_NUM_FINE_CHANS: usize = 128;

/// The default bandwidth of a single fine channel \[Hz\].
pub const DEFAULT_FINE_CHAN_WIDTH_HZ: f64 = 10_000.0;

/// The default VCS sample rate, i.e. the number of samples per fine channel
/// in one second of data \[Hz\].
pub const DEFAULT_SAMPLE_RATE: usize = 10_000;

/// The default bandwidth of a single calibration channel \[Hz\].
pub const DEFAULT_CAL_CHAN_WIDTH_HZ: f64 = 40_000.0;

/// The bandwidth of an MWA coarse (receiver) channel \[Hz\].
pub const COARSE_CHAN_WIDTH_HZ: f64 = 1_280_000.0;

/// The default number of filter taps per channel of the fine PFB.
pub const DEFAULT_TAPS_PER_CHAN: usize = 12;

/// The scale applied to the integer coefficients of the MWA fine PFB filter
/// to bring them to order unity.
pub const FINE_PFB_COEFF_SCALE: f64 = 1.0 / 120_000.0;

/// The default RMS that reconstructed voltages are normalised to before they
/// are quantised by a VDIF writer.
pub const DEFAULT_VDIF_TARGET_RMS: f32 = 32.0;

/// Jones matrices whose determinant magnitude is smaller than this, relative
/// to the square of their largest element, are considered singular.
pub const DEGENERATE_DETERMINANT_TOLERANCE: f64 = 1e-12;
