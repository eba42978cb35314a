// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{constants::TAU, math::cexp};

fn inverter(mode: InversionMode, num_chans: usize, taps: usize) -> PfbInverter {
    let filter = Arc::new(SynthesisFilter::windowed_sinc(num_chans, taps).unwrap());
    PfbInverter::new(mode, num_chans, filter, BeamformDevice::Cpu).unwrap()
}

/// Deterministic, unremarkable test data.
fn pseudo_random_beam(num_rows: usize, num_chans: usize) -> Array3<c64> {
    Array3::from_shape_fn((num_rows, num_chans, NUM_POLS), |(t, c, p)| {
        let x = (t * 131 + c * 17 + p * 7) as f64;
        c64::new((x * 0.37).sin(), (x * 0.61).cos())
    })
}

/// `y[s] = (1/N) Σ_c Σ_{k<T} g_c[s mod N + kN] x_c[⌊s/N⌋ - k]`, with zeros
/// before the start, then with the first (T - 1) N samples zeroed.
fn naive_synthesis(x: ArrayView3<c64>, filter: &SynthesisFilter) -> Array2<c64> {
    let (num_rows, num_chans, _) = x.dim();
    let taps = filter.taps_per_chan();
    let g = filter.ramps();
    let mut y = Array2::zeros((num_rows * num_chans, NUM_POLS));
    for s in (taps - 1) * num_chans..num_rows * num_chans {
        let (n, r) = (s / num_chans, s % num_chans);
        for p in 0..NUM_POLS {
            let mut acc = c64::default();
            for c in 0..num_chans {
                for k in 0..taps.min(n + 1) {
                    acc += g[(c, r + k * num_chans)] * x[(n - k, c, p)];
                }
            }
            y[(s, p)] = acc / num_chans as f64;
        }
    }
    y
}

#[test]
fn test_windowed_sinc() {
    let filter = SynthesisFilter::windowed_sinc(16, 12).unwrap();
    assert_eq!(filter.num_chans(), 16);
    assert_eq!(filter.taps_per_chan(), 12);
    let h = filter.prototype();
    assert_eq!(h.len(), 192);
    assert_abs_diff_eq!(h.iter().sum::<f64>(), 16.0, epsilon = 1e-10);
    // Linear phase.
    for i in 0..h.len() {
        assert_abs_diff_eq!(h[i], h[h.len() - 1 - i], epsilon = 1e-12);
    }
    // Each polyphase branch passes DC with unit gain.
    for r in 0..16 {
        let branch: f64 = (0..12).map(|k| h[r + k * 16]).sum();
        assert_abs_diff_eq!(branch, 1.0, epsilon = 1e-2);
    }
}

#[test]
fn test_ramps() {
    let filter = SynthesisFilter::windowed_sinc(8, 4).unwrap();
    let g = filter.ramps();
    assert_eq!(g.dim(), (8, 32));
    let h = filter.prototype();
    for (c, i) in [(0, 0), (0, 3), (3, 17), (7, 31)] {
        let expected = h[i] * cexp(TAU * (c as f64 - 4.0) * i as f64 / 8.0);
        assert_abs_diff_eq!(g[(c, i)].re, expected.re, epsilon = 1e-12);
        assert_abs_diff_eq!(g[(c, i)].im, expected.im, epsilon = 1e-12);
    }
    // The centre channel isn't ramped.
    for i in 0..32 {
        assert_abs_diff_eq!(g[(4, i)].re, h[i]);
        assert_abs_diff_eq!(g[(4, i)].im, 0.0);
    }
}

#[test]
fn test_from_coefficients() {
    let coeffs: Vec<f64> = (0..24).map(|i| i as f64 * 1000.0).collect();
    let filter = SynthesisFilter::from_coefficients(&coeffs, 8, 1e-3).unwrap();
    assert_eq!(filter.taps_per_chan(), 3);
    assert_abs_diff_eq!(filter.prototype()[5], 5.0);

    assert!(matches!(
        SynthesisFilter::from_coefficients(&coeffs[..20], 8, 1.0),
        Err(ConfigError::FilterLength {
            got: 20,
            num_chans: 8
        })
    ));
    assert!(matches!(
        SynthesisFilter::from_coefficients(&[], 8, 1.0),
        Err(ConfigError::FilterLength { got: 0, .. })
    ));
    assert!(matches!(
        SynthesisFilter::from_coefficients(&coeffs, 3, 1.0),
        Err(ConfigError::OddChannelCount(3))
    ));
    assert!(matches!(
        SynthesisFilter::windowed_sinc(8, 0),
        Err(ConfigError::Zero("taps_per_chan"))
    ));
}

#[test]
fn test_new_errors() {
    let filter = Arc::new(SynthesisFilter::windowed_sinc(8, 4).unwrap());
    let result = PfbInverter::new(InversionMode::Full, 16, filter.clone(), BeamformDevice::Cpu);
    assert!(matches!(
        result,
        Err(IpfbError::Config(ConfigError::FilterChannels {
            filter: 8,
            inverter: 16
        }))
    ));

    let result = PfbInverter::new(InversionMode::Ifft, 8, filter, BeamformDevice::Gpu);
    assert!(matches!(
        result,
        Err(IpfbError::Config(ConfigError::GpuIfft))
    ));
}

#[test]
fn test_invert_shape_mismatch() {
    let mut inv = inverter(InversionMode::Full, 8, 4);
    let result = inv.invert(pseudo_random_beam(4, 6).view());
    assert!(matches!(
        result,
        Err(IpfbError::Shape(ShapeMismatch {
            what: "inverter channels",
            expected: 8,
            got: 6
        }))
    ));
}

#[test]
fn test_ifft_sinusoid() {
    let num_chans = 8;
    let mut inv = inverter(InversionMode::Ifft, num_chans, 4);
    // Only channel 5 of the X pol has signal.
    let mut beam = Array3::zeros((3, num_chans, NUM_POLS));
    beam.slice_mut(s![.., 5, 0]).fill(c64::new(1.0, 0.0));
    let out = inv.invert(beam.view()).unwrap();
    assert_eq!(out.samples.dim(), (24, 2));
    assert_abs_diff_eq!(out.gain, 1.0);

    // Channel 5 lands in FFT bin (5 + 4) % 8 = 1, i.e. one turn per 8 samples.
    for (s, sample) in out.samples.outer_iter().enumerate() {
        let expected = cexp(TAU * (s % num_chans) as f64 / num_chans as f64);
        assert_abs_diff_eq!(sample[0].re, expected.re as f32, epsilon = 1e-6);
        assert_abs_diff_eq!(sample[0].im, expected.im as f32, epsilon = 1e-6);
        assert_eq!(sample[1], c32::new(0.0, 0.0));
    }
}

#[test]
fn test_ifft_is_stateless() {
    let mut inv = inverter(InversionMode::Ifft, 8, 4);
    let beam = pseudo_random_beam(5, 8);
    let first = inv.invert(beam.view()).unwrap();
    let second = inv.invert(beam.view()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_full_matches_direct_sum() {
    let (num_chans, taps) = (8, 4);
    let filter = SynthesisFilter::windowed_sinc(num_chans, taps).unwrap();
    let beam = pseudo_random_beam(10, num_chans);
    let expected = naive_synthesis(beam.view(), &filter);

    let mut inv = inverter(InversionMode::Full, num_chans, taps);
    let out = inv.invert(beam.view()).unwrap();
    assert_eq!(out.samples.dim(), (80, 2));
    for (got, expected) in out.samples.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(got.re, expected.re as f32, epsilon = 1e-5);
        assert_abs_diff_eq!(got.im, expected.im as f32, epsilon = 1e-5);
    }
    // The first (T - 1) N samples are the edge transient.
    assert!(out
        .samples
        .slice(s![..(taps - 1) * num_chans, ..])
        .iter()
        .all(|c| *c == c32::new(0.0, 0.0)));
}

#[test]
fn test_full_block_continuity() {
    let (num_chans, taps) = (8, 4);
    let beam = pseudo_random_beam(20, num_chans);
    let whole = inverter(InversionMode::Full, num_chans, taps)
        .invert(beam.view())
        .unwrap();

    // Splits both longer and shorter than the history.
    for split in [10, 2] {
        let mut inv = inverter(InversionMode::Full, num_chans, taps);
        let first = inv.invert(beam.slice(s![..split, .., ..])).unwrap();
        let second = inv.invert(beam.slice(s![split.., .., ..])).unwrap();
        let joined = ndarray::concatenate(Axis(0), &[first.samples.view(), second.samples.view()])
            .unwrap();
        assert_eq!(joined.dim(), whole.samples.dim());
        for (a, b) in joined.iter().zip(whole.samples.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-6);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_reset() {
    let mut inv = inverter(InversionMode::Full, 8, 4);
    let beam = pseudo_random_beam(6, 8);
    let fresh = inv.invert(beam.view()).unwrap();
    let carried = inv.invert(beam.view()).unwrap();
    assert_ne!(fresh, carried);
    inv.reset();
    let after_reset = inv.invert(beam.view()).unwrap();
    assert_eq!(fresh, after_reset);
}

#[test]
fn test_full_round_trip() {
    let (num_chans, taps, num_rows) = (16, 12, 40);
    let filter = SynthesisFilter::windowed_sinc(num_chans, taps).unwrap();
    let h = filter.prototype();

    // A tone at the centre of channel 5, for all time.
    let chan_freq = |c: usize| (c as f64 - (num_chans / 2) as f64) / num_chans as f64;
    let f = chan_freq(5);
    let x = |k: i64| cexp(TAU * f * k as f64);

    // Channelise with the analysis counterpart of the synthesis filter.
    let beam = Array3::from_shape_fn((num_rows, num_chans, NUM_POLS), |(n, c, p)| {
        if p == 1 {
            return c64::default();
        }
        let fc = chan_freq(c);
        h.iter()
            .enumerate()
            .map(|(m, &h)| {
                let k = (n * num_chans) as i64 - m as i64;
                h * x(k) * cexp(-TAU * fc * k as f64)
            })
            .sum()
    });

    let mut inv = inverter(InversionMode::Full, num_chans, taps);
    let out = inv.invert(beam.view()).unwrap();

    let start = (taps - 1) * num_chans;
    let mut cross = c64::default();
    let mut y_power = 0.0;
    let mut x_power = 0.0;
    for (s, sample) in out.samples.outer_iter().enumerate().skip(start) {
        let y = c64::new(sample[0].re as f64, sample[0].im as f64);
        let x = x(s as i64);
        cross += y * x.conj();
        y_power += y.norm_sqr();
        x_power += x.norm_sqr();
    }
    let correlation = cross.norm() / (y_power * x_power).sqrt();
    assert!(correlation > 0.99, "correlation = {correlation}");
    // The filter is scaled for unit gain.
    assert_abs_diff_eq!((y_power / x_power).sqrt(), 1.0, epsilon = 0.05);
}

#[test]
fn test_normalise() {
    let mut v = ReconstructedVoltages {
        samples: Array2::from_shape_fn((4, 2), |(s, p)| {
            let sign = if (s + p) % 2 == 0 { 2.0 } else { -2.0 };
            c32::new(sign, -sign)
        }),
        gain: 1.0,
    };
    assert_eq!(v.normalise(32.0), Normalisation::Scaled(16.0));
    assert_abs_diff_eq!(v.gain, 16.0);
    for c in v.samples.iter() {
        assert_abs_diff_eq!(c.re.abs(), 32.0);
        assert_abs_diff_eq!(c.im.abs(), 32.0);
    }
}

#[test]
fn test_normalise_no_spread() {
    let zeros = Array2::from_elem((4, 2), c32::new(0.0, 0.0));
    let mut v = ReconstructedVoltages {
        samples: zeros.clone(),
        gain: 1.0,
    };
    assert_eq!(v.normalise(32.0), Normalisation::NoSpread);
    assert_eq!(v.gain, 1.0);
    assert_eq!(v.samples, zeros);

    let constant = Array2::from_elem((4, 2), c32::new(3.0, 3.0));
    let mut v = ReconstructedVoltages {
        samples: constant.clone(),
        gain: 2.0,
    };
    assert_eq!(v.normalise(32.0), Normalisation::NoSpread);
    assert_eq!(v.gain, 2.0);
    assert_eq!(v.samples, constant);
}

#[test]
fn test_normalise_non_finite() {
    for bad in [
        c32::new(f32::NAN, 0.0),
        c32::new(0.0, f32::INFINITY),
        c32::new(f32::NEG_INFINITY, 1.0),
    ] {
        // Zeros elsewhere would otherwise have no spread.
        let mut samples = Array2::from_elem((4, 2), c32::new(0.0, 0.0));
        samples[(1, 0)] = bad;
        let mut v = ReconstructedVoltages {
            samples,
            gain: 1.0,
        };
        assert_eq!(v.normalise(32.0), Normalisation::NonFinite);
        assert_eq!(v.gain, 1.0);
        assert!(!v.samples[(1, 0)].re.is_finite() || !v.samples[(1, 0)].im.is_finite());
        assert_eq!(v.samples[(2, 1)], c32::new(0.0, 0.0));
    }

    // A spread of finite samples is not enough to hide a NaN.
    let mut samples = Array2::from_shape_fn((4, 2), |(s, p)| c32::new((s + p) as f32, 1.0));
    samples[(3, 1)] = c32::new(f32::NAN, f32::NAN);
    let mut v = ReconstructedVoltages {
        samples,
        gain: 1.0,
    };
    assert_eq!(v.normalise(32.0), Normalisation::NonFinite);
    assert_eq!(v.gain, 1.0);
    assert_eq!(v.samples[(2, 0)], c32::new(2.0, 1.0));
}

#[cfg(feature = "cuda")]
#[test]
#[serial_test::serial]
fn test_full_gpu_matches_cpu() {
    let (num_chans, taps) = (16, 12);
    let filter = Arc::new(SynthesisFilter::windowed_sinc(num_chans, taps).unwrap());
    let mut cpu =
        PfbInverter::new(InversionMode::Full, num_chans, filter.clone(), BeamformDevice::Cpu)
            .unwrap();
    let mut gpu =
        PfbInverter::new(InversionMode::Full, num_chans, filter, BeamformDevice::Gpu).unwrap();

    for block in 0..2 {
        let beam = pseudo_random_beam(30, num_chans) * (block + 1) as f64;
        let c = cpu.invert(beam.view()).unwrap();
        let g = gpu.invert(beam.view()).unwrap();
        for (c, g) in c.samples.iter().zip(g.samples.iter()) {
            assert_abs_diff_eq!(c.re, g.re, epsilon = 1e-4);
            assert_abs_diff_eq!(c.im, g.im, epsilon = 1e-4);
        }
    }
}
