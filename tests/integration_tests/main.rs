// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod end_to_end;
mod steering;

use ndarray::prelude::*;

use mwa_beamformer::{
    c64, BeamSink, BlockSource, DelayError, DelayModel, InversionMode, ReconstructedVoltages,
    SinkError, SourceError, VoltageBlock,
};

/// Pack a 4-bit complex sample the way the VCS does: real part in the upper
/// nibble.
fn encode_4bit_sample(re: i8, im: i8) -> u8 {
    (((re as u8) & 0xf) << 4) | ((im as u8) & 0xf)
}

/// A source of VCS-ordered bytes, `[time][chan][antenna][pol]`, generated by
/// `gen` for each block.
struct VcsSource<F> {
    num_antennas: usize,
    num_samples: usize,
    num_chans: usize,
    gen: F,
}

impl<F> BlockSource for VcsSource<F>
where
    F: Fn(usize, usize, usize, usize, usize) -> c64 + Send,
{
    fn read_block(&mut self, block: usize) -> Result<VoltageBlock, SourceError> {
        let mut bytes = Vec::with_capacity(self.num_samples * self.num_chans * self.num_antennas * 2);
        for t in 0..self.num_samples {
            for c in 0..self.num_chans {
                for a in 0..self.num_antennas {
                    for p in 0..2 {
                        let v = (self.gen)(block, t, c, a, p);
                        let quantise = |f: f64| f.round().clamp(-8.0, 7.0) as i8;
                        bytes.push(encode_4bit_sample(quantise(v.re), quantise(v.im)));
                    }
                }
            }
        }
        Ok(VoltageBlock::from_vcs_bytes(
            &bytes,
            self.num_antennas,
            self.num_samples,
            self.num_chans,
        )?)
    }
}

struct FixedDelays(Vec<f64>);

impl DelayModel for FixedDelays {
    fn delays(&mut self, _: usize) -> Result<Vec<f64>, DelayError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct RecordingSink {
    coherent: Vec<(usize, Array3<f32>)>,
    incoherent: Vec<(usize, Array3<f32>)>,
    voltages: Vec<(usize, InversionMode, ReconstructedVoltages)>,
}

impl BeamSink for RecordingSink {
    fn write_coherent(&mut self, block: usize, coherent: ArrayView3<f32>) -> Result<(), SinkError> {
        self.coherent.push((block, coherent.to_owned()));
        Ok(())
    }

    fn write_incoherent(
        &mut self,
        block: usize,
        incoherent: ArrayView3<f32>,
    ) -> Result<(), SinkError> {
        self.incoherent.push((block, incoherent.to_owned()));
        Ok(())
    }

    fn write_voltages(
        &mut self,
        block: usize,
        mode: InversionMode,
        voltages: &ReconstructedVoltages,
    ) -> Result<(), SinkError> {
        self.voltages.push((block, mode, voltages.clone()));
        Ok(())
    }
}

#[test]
fn test_logging_can_only_be_set_up_once() {
    assert!(mwa_beamformer::setup_logging(1).is_ok());
    assert!(mwa_beamformer::setup_logging(0).is_err());
}
