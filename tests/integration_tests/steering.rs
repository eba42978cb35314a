// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Steering the beam at a signal that arrives at each antenna with a
//! different delay.

use approx::assert_abs_diff_eq;

use super::*;
use mwa_beamformer::{
    constants::TAU, AntennaTable, BeamformerConfig, BlockProcessor, CalibrationTable,
};

const NUM_ANTENNAS: usize = 8;

fn config() -> BeamformerConfig {
    BeamformerConfig {
        num_antennas: NUM_ANTENNAS,
        num_fine_chans: 4,
        sample_rate: 16,
        coarse_chan: Some(109),
        decimation: 4,
        coherent: true,
        incoherent: true,
        ..Default::default()
    }
}

fn run(delays: Vec<f64>, geometric_delays: &[f64]) -> RecordingSink {
    let config = config();
    let chan_freqs = config.chan_freqs().unwrap();
    let geometric_delays = geometric_delays.to_vec();
    let mut source = VcsSource {
        num_antennas: NUM_ANTENNAS,
        num_samples: 16,
        num_chans: 4,
        // A constant-amplitude tone, identical in both polarisations, that
        // reaches antenna `a` late by `geometric_delays[a]`.
        gen: move |_: usize, _: usize, c: usize, a: usize, _: usize| {
            c64::from_polar(5.0, TAU * chan_freqs[c] * geometric_delays[a])
        },
    };

    let mut processor = BlockProcessor::new(
        config,
        CalibrationTable::identity(NUM_ANTENNAS),
        AntennaTable::new(NUM_ANTENNAS),
        None,
    )
    .unwrap();
    let mut sink = RecordingSink::default();
    processor
        .run(2, &mut source, &mut FixedDelays(delays), &mut [&mut sink], false)
        .unwrap();
    sink
}

#[test]
fn test_steering_adds_antennas_in_phase() {
    let f0 = config().chan_freqs().unwrap()[0];
    // Spread the arrival phases evenly around the circle, so that without
    // steering the antennas cancel.
    let geometric_delays: Vec<f64> = (0..NUM_ANTENNAS)
        .map(|a| a as f64 / (NUM_ANTENNAS as f64 * f0))
        .collect();

    let steered = run(geometric_delays.clone(), &geometric_delays);
    let unsteered = run(vec![0.0; NUM_ANTENNAS], &geometric_delays);

    assert_eq!(steered.coherent.len(), 2);
    for ((_, s), (_, u)) in steered.coherent.iter().zip(unsteered.coherent.iter()) {
        assert_eq!(s.dim(), (4, 4, 4));
        for (s, u) in s.rows().into_iter().zip(u.rows()) {
            assert!(s[0] > 200.0, "steered Stokes I = {}", s[0]);
            assert!(u[0] < 1e-3, "unsteered Stokes I = {}", u[0]);

            // Both polarisations are identical; all of the power is in U.
            assert_eq!(s[1], 0.0);
            assert_eq!(s[3], 0.0);
            assert_abs_diff_eq!(s[2], s[0], epsilon = 1e-3);
        }
    }

    // The incoherent beam doesn't care about steering.
    assert_eq!(steered.incoherent, unsteered.incoherent);
    for (_, incoherent) in &steered.incoherent {
        // Four of the quantised samples have |x|^2 = 25 and four have 32, in
        // 2 polarisations, normalised by 1/16.
        for &p in incoherent {
            assert_abs_diff_eq!(p, 2.0 * 228.0 / 16.0, epsilon = 1e-3);
        }
    }
}
