// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use num_complex::Complex;

use super::*;
use crate::{
    antenna::AntennaTable,
    calibration::CalibrationTable,
    weights::{CalibrationPolicy, WeightComputer},
};

const FREQS: [f64; 3] = [182.4e6, 182.41e6, 182.42e6];

/// Deterministic 4-bit-range samples for every antenna, time, chan and pol.
fn test_voltages(num_antennas: usize, num_samples: usize) -> VoltageBlock {
    VoltageBlock::new(Array4::from_shape_fn(
        (num_antennas, num_samples, FREQS.len(), NUM_POLS),
        |(a, t, c, p)| {
            let re = ((a * 7 + t * 3 + c * 5 + p) % 15) as i8 - 7;
            let im = ((a * 11 + t * 5 + c * 3 + p * 2) % 15) as i8 - 7;
            Complex::new(re, im)
        },
    ))
}

fn test_weights(antennas: &AntennaTable, delays: &[f64]) -> BeamWeights {
    WeightComputer::new(antennas.len(), 10e3, CalibrationPolicy::ZeroAntenna)
        .compute(
            delays,
            &CalibrationTable::identity(antennas.len()),
            antennas,
            &FREQS,
        )
        .unwrap()
}

#[test]
fn test_beam_block_new() {
    let block = BeamBlock::new(100, 3, 10).unwrap();
    assert_eq!(block.detected_beam.dim(), (100, 3, 2));
    assert_eq!(block.coherent.dim(), (10, 3, 4));
    assert_eq!(block.incoherent.dim(), (10, 3, 1));
    assert_eq!(block.decimation(), 10);
    assert!(!block.has_non_finite());

    assert_eq!(
        BeamBlock::new(100, 3, 7),
        Err(ShapeMismatch {
            what: "samples left over after decimation",
            expected: 0,
            got: 2
        })
    );
    assert!(BeamBlock::new(100, 3, 0).is_err());
}

#[test]
fn test_has_non_finite() {
    let mut block = BeamBlock::new(4, 2, 2).unwrap();
    block.coherent[(1, 1, 3)] = f32::INFINITY;
    assert!(block.has_non_finite());

    let mut block = BeamBlock::new(4, 2, 2).unwrap();
    block.detected_beam[(0, 0, 0)] = c64::new(0.0, f64::NAN);
    assert!(block.has_non_finite());
}

#[test]
fn test_device_info() {
    assert_eq!(BeamformDevice::Cpu.get_precision(), "double");
    let info = BeamformDevice::Cpu.get_device_info().unwrap();
    assert!(info.contains("CPU"), "{info}");
}

#[test]
fn test_new_beamformer() {
    let beamformer = new_beamformer(BeamformDevice::Cpu, 4, 10, 3).unwrap();
    assert_eq!(beamformer.device(), BeamformDevice::Cpu);

    #[cfg(not(feature = "cuda"))]
    assert!(matches!(
        new_beamformer(BeamformDevice::Gpu, 4, 10, 3),
        Err(BeamformError::Config(
            crate::config::ConfigError::NoGpuSupport
        ))
    ));
}
