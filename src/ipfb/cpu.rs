// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! PFB inversion on the CPU.
//!
//! Both modes lean on the same identity. For an even number of channels `N`,
//!
//! `Σ_c x_c exp(2πi (c - N/2) r / N) = (-1)^r IFFT(x)[r]`,
//!
//! so the phase ramps of the full mode become an unshifted inverse FFT
//! across channels followed by a sign flip on odd samples.

use ndarray::prelude::*;
use rayon::prelude::*;
use rustfft::Fft;

use super::SynthesisFilter;
use crate::{c64, constants::NUM_POLS};

/// The ordinary inverse: each row of channels is fftshifted and inverse
/// Fourier transformed into `num_chans` consecutive samples. The input
/// dimensions are `[time][chan][pol]`, the output `[time * chan][pol]`.
pub(super) fn ifft_synthesise(detected_beam: ArrayView3<c64>, ifft: &dyn Fft<f64>) -> Array2<c64> {
    let (num_rows, num_chans, _) = detected_beam.dim();
    let mut out = Array2::zeros((num_rows * num_chans, NUM_POLS));
    if num_rows == 0 {
        return out;
    }

    out.axis_chunks_iter_mut(Axis(0), num_chans)
        .into_par_iter()
        .zip(detected_beam.outer_iter())
        .for_each_init(
            || {
                (
                    vec![c64::default(); num_chans],
                    vec![c64::default(); ifft.get_inplace_scratch_len()],
                )
            },
            |(buf, scratch), (mut out, row)| {
                for (mut out, x) in out.axis_iter_mut(Axis(1)).zip(row.axis_iter(Axis(1))) {
                    for (c, &x) in x.iter().enumerate() {
                        buf[(c + num_chans / 2) % num_chans] = x;
                    }
                    ifft.process_with_scratch(buf, scratch);
                    out.iter_mut().zip(buf.iter()).for_each(|(o, b)| *o = *b);
                }
            },
        );
    out
}

/// Full polyphase synthesis,
///
/// `y[nN + r] = (1/N) Σ_c Σ_{k<T} g_c[r + kN] x_c[n - k]`.
///
/// `input` is `[row][chan][pol]`; its first `T - 1` rows are history and
/// produce no output of their own. The output is `[sample][pol]`.
pub(super) fn polyphase_synthesise(
    input: ArrayView3<c64>,
    filter: &SynthesisFilter,
    ifft: &dyn Fft<f64>,
) -> Array2<c64> {
    let num_chans = filter.num_chans();
    let taps = filter.taps_per_chan();
    let h = filter.prototype();
    let num_in_rows = input.len_of(Axis(0));
    let num_out_rows = num_in_rows.saturating_sub(taps - 1);
    let mut out = Array2::zeros((num_out_rows * num_chans, NUM_POLS));
    if num_out_rows == 0 {
        return out;
    }

    // Inverse FFT across channels of every input row; `[row][pol][r]`.
    let mut transformed = Array3::<c64>::zeros((num_in_rows, NUM_POLS, num_chans));
    transformed
        .outer_iter_mut()
        .into_par_iter()
        .zip(input.outer_iter())
        .for_each_init(
            || vec![c64::default(); ifft.get_inplace_scratch_len()],
            |scratch, (mut transformed, row)| {
                for (mut t, x) in transformed.outer_iter_mut().zip(row.axis_iter(Axis(1))) {
                    t.assign(&x);
                    let buf = t
                        .as_slice_mut()
                        .expect("rows of a standard layout array are contiguous");
                    ifft.process_with_scratch(buf, scratch);
                }
            },
        );

    let inv_n = 1.0 / num_chans as f64;
    out.axis_chunks_iter_mut(Axis(0), num_chans)
        .into_par_iter()
        .enumerate()
        .for_each(|(n, mut out)| {
            for (r, mut out) in out.outer_iter_mut().enumerate() {
                let scale = if r % 2 == 0 { inv_n } else { -inv_n };
                for (p, out) in out.iter_mut().enumerate() {
                    let mut acc = c64::default();
                    for k in 0..taps {
                        acc += transformed[(n + taps - 1 - k, p, r)] * h[r + k * num_chans];
                    }
                    *out = acc * scale;
                }
            }
        });
    out
}
