// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Channelised antenna voltages.


use ndarray::prelude::*;
use num_complex::Complex;

use crate::{constants::NUM_POLS, ShapeMismatch};

/// One block (usually one second) of channelised voltages from every antenna.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageBlock {
    /// The dimensions are `[antenna][time][chan][pol]`.
    pub samples: Array4<Complex<i8>>,
}

impl VoltageBlock {
    pub fn new(samples: Array4<Complex<i8>>) -> VoltageBlock {
        VoltageBlock { samples }
    }

    pub fn zeros(num_antennas: usize, num_samples: usize, num_chans: usize) -> VoltageBlock {
        VoltageBlock {
            samples: Array4::from_elem(
                (num_antennas, num_samples, num_chans, NUM_POLS),
                Complex::new(0, 0),
            ),
        }
    }

    pub fn num_antennas(&self) -> usize {
        self.samples.len_of(Axis(0))
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len_of(Axis(1))
    }

    pub fn num_chans(&self) -> usize {
        self.samples.len_of(Axis(2))
    }

    pub fn num_pols(&self) -> usize {
        self.samples.len_of(Axis(3))
    }

    /// Decode recombined VCS data. Each byte is one complex sample, with the
    /// real part in the upper nibble and the imaginary part in the lower
    /// nibble, both 4-bit two's complement. The bytes are ordered
    /// `[time][chan][antenna][pol]`.
    pub fn from_vcs_bytes(
        bytes: &[u8],
        num_antennas: usize,
        num_samples: usize,
        num_chans: usize,
    ) -> Result<VoltageBlock, ShapeMismatch> {
        ShapeMismatch::check(
            "VCS bytes",
            num_samples * num_chans * num_antennas * NUM_POLS,
            bytes.len(),
        )?;

        let vcs_order = ArrayView4::from_shape(
            (num_samples, num_chans, num_antennas, NUM_POLS),
            bytes,
        )
        .expect("length was checked above");
        let samples = vcs_order
            .permuted_axes([2, 0, 1, 3])
            .mapv(decode_4bit_sample);
        // Make the layout standard for the antenna-major array.
        Ok(VoltageBlock {
            samples: samples.as_standard_layout().into_owned(),
        })
    }
}

/// Decode a byte holding a 4-bit complex sample.
#[inline]
pub(crate) fn decode_4bit_sample(byte: u8) -> Complex<i8> {
    let re = (byte as i8) >> 4;
    let im = ((byte << 4) as i8) >> 4;
    Complex::new(re, im)
}
