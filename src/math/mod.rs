// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


#[cfg(any(feature = "cuda", test))]
use ndarray::prelude::*;

use crate::{c64, constants::TAU};

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
///
/// # Examples
///
/// `assert_abs_diff_eq!(cexp(PI), c64::new(-1.0, 0.0));`
#[inline]
pub(crate) fn cexp(x: f64) -> c64 {
    let (im, re) = x.sin_cos();
    c64::new(re, im)
}

/// The phase rotor that steers a signal delayed by `delay` seconds back into
/// phase at frequency `freq_hz`, i.e. exp(-i 2π f τ).
#[inline]
pub(crate) fn phase_rotor(freq_hz: f64, delay: f64) -> c64 {
    cexp(-TAU * freq_hz * delay)
}

/// Stokes I, Q, U and V from the X and Y components of a detected beam
/// sample.
#[inline(always)]
pub(crate) fn stokes(ex: c64, ey: c64) -> [f64; 4] {
    let xx = ex.norm_sqr();
    let yy = ey.norm_sqr();
    let xy = ex * ey.conj();
    [xx + yy, xx - yy, 2.0 * xy.re, 2.0 * xy.im]
}

/// Average groups of `decimation` consecutive rows (the first axis) of
/// `per_sample` into `out`, multiplying by `scale` on the way. Each group is
/// summed in order, so the result doesn't depend on threading.
///
/// The caller must ensure that `out` has `per_sample.len_of(Axis(0)) /
/// decimation` rows and that the remaining axes match.
#[cfg(any(feature = "cuda", test))]
pub(crate) fn decimate(
    per_sample: ArrayView3<f64>,
    mut out: ArrayViewMut3<f32>,
    decimation: usize,
    scale: f64,
) {
    let factor = scale / decimation as f64;
    out.outer_iter_mut()
        .zip(per_sample.axis_chunks_iter(Axis(0), decimation))
        .for_each(|(mut out_row, chunk)| {
            out_row.indexed_iter_mut().for_each(|((c, k), out)| {
                let sum: f64 = chunk.slice(s![.., c, k]).iter().sum();
                *out = (sum * factor) as f32;
            });
        });
}

/// The mean and (population) standard deviation of a slice. An empty slice
/// gives zeros.
pub(crate) fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
