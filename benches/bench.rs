// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use criterion::*;
use ndarray::prelude::*;
use num_complex::Complex;

use mwa_beamformer::{
    c64, AntennaTable, BeamformDevice, Beamformer, BeamformerCpu, CalibrationPolicy,
    CalibrationTable, InversionMode, PfbInverter, SynthesisFilter, VoltageBlock, WeightComputer,
};

const NUM_ANTENNAS: usize = 128;
const NUM_CHANS: usize = 128;
const NUM_SAMPLES: usize = 500;

fn chan_freqs() -> Vec<f64> {
    (0..NUM_CHANS)
        .map(|c| 139.52e6 + c as f64 * 10e3)
        .collect()
}

fn delays() -> Vec<f64> {
    (0..NUM_ANTENNAS).map(|a| (a as f64 - 64.0) * 1e-8).collect()
}

fn voltages() -> VoltageBlock {
    VoltageBlock::new(Array4::from_shape_fn(
        (NUM_ANTENNAS, NUM_SAMPLES, NUM_CHANS, 2),
        |(a, t, c, p)| {
            Complex::new(
                ((a + 3 * t + 5 * c + p) % 15) as i8 - 7,
                ((7 * a + t + 3 * c + 2 * p) % 15) as i8 - 7,
            )
        },
    ))
}

fn detected_beam() -> Array3<c64> {
    Array3::from_shape_fn((NUM_SAMPLES, NUM_CHANS, 2), |(t, c, p)| {
        c64::new(
            ((t * 31 + c * 7 + p) % 17) as f64 - 8.0,
            ((t * 13 + c * 3 + p * 5) % 19) as f64 - 9.0,
        )
    })
}

fn weights(c: &mut Criterion) {
    let computer = WeightComputer::new(NUM_ANTENNAS, 10e3, CalibrationPolicy::ZeroAntenna);
    let calibration = CalibrationTable::identity(NUM_ANTENNAS);
    let antennas = AntennaTable::new(NUM_ANTENNAS);
    let chan_freqs = chan_freqs();
    let delays = delays();

    c.bench_function("compute weights for 128 antennas and 128 channels", |b| {
        b.iter(|| {
            computer
                .compute(&delays, &calibration, &antennas, &chan_freqs)
                .unwrap()
        })
    });
}

fn beamform(c: &mut Criterion) {
    let weights = WeightComputer::new(NUM_ANTENNAS, 10e3, CalibrationPolicy::ZeroAntenna)
        .compute(
            &delays(),
            &CalibrationTable::identity(NUM_ANTENNAS),
            &AntennaTable::new(NUM_ANTENNAS),
            &chan_freqs(),
        )
        .unwrap();
    let voltages = voltages();

    let mut group = c.benchmark_group("beamform");
    group.sample_size(10);
    group.throughput(Throughput::Elements((NUM_SAMPLES * NUM_CHANS) as u64));
    for decimation in [1, 100] {
        group.bench_function(BenchmarkId::new("cpu", decimation), |b| {
            let mut beamformer = BeamformerCpu::new();
            b.iter(|| {
                beamformer
                    .form_beam(&voltages, &weights, decimation)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn ipfb(c: &mut Criterion) {
    let filter = Arc::new(SynthesisFilter::windowed_sinc(NUM_CHANS, 12).unwrap());
    let detected_beam = detected_beam();

    let mut group = c.benchmark_group("ipfb");
    group.sample_size(10);
    for mode in [InversionMode::Ifft, InversionMode::Full] {
        group.bench_function(BenchmarkId::new("cpu", mode), |b| {
            let mut inverter =
                PfbInverter::new(mode, NUM_CHANS, Arc::clone(&filter), BeamformDevice::Cpu)
                    .unwrap();
            b.iter(|| inverter.invert(detected_beam.view()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, weights, beamform, ipfb);
criterion_main!(benches);
