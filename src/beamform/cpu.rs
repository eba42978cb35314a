// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Beamforming on the CPU.

use log::trace;
use ndarray::prelude::*;
use num_complex::Complex;
use rayon::prelude::*;

use super::{check_shapes, BeamBlock, BeamformDevice, BeamformError, Beamformer};
use crate::{
    c64,
    constants::NUM_STOKES,
    math::stokes,
    weights::BeamWeights,
    Jones, VoltageBlock,
};

/// A [`Beamformer`] that runs on the CPU, in parallel over output samples.
///
/// Antennas are always summed in order, so the results are reproducible
/// regardless of the number of threads.
#[derive(Debug, Default)]
pub struct BeamformerCpu;

impl BeamformerCpu {
    pub fn new() -> BeamformerCpu {
        BeamformerCpu
    }
}

impl Beamformer for BeamformerCpu {
    fn device(&self) -> BeamformDevice {
        BeamformDevice::Cpu
    }

    fn form_beam_into(
        &mut self,
        voltages: &VoltageBlock,
        weights: &BeamWeights,
        out: &mut BeamBlock,
    ) -> Result<(), BeamformError> {
        let decimation = check_shapes(voltages, weights, out)?;
        trace!(
            "Forming a beam from {} antennas, {} samples and {} channels (decimation {decimation})",
            voltages.num_antennas(),
            voltages.num_samples(),
            voltages.num_chans()
        );
        form_beam_inner(
            voltages.samples.view(),
            weights.weights.view(),
            weights.inv_jones.view(),
            weights.norm,
            decimation,
            out,
        );
        Ok(())
    }
}

fn form_beam_inner(
    samples: ArrayView4<Complex<i8>>,
    weights: ArrayView3<c64>,
    inv_jones: ArrayView2<Jones>,
    norm: f64,
    decimation: usize,
    out: &mut BeamBlock,
) {
    let num_chans = samples.len_of(Axis(2));
    let factor = norm / decimation as f64;
    let BeamBlock {
        detected_beam,
        coherent,
        incoherent,
    } = out;

    detected_beam
        .axis_chunks_iter_mut(Axis(0), decimation)
        .into_par_iter()
        .zip(coherent.outer_iter_mut())
        .zip(incoherent.outer_iter_mut())
        .enumerate()
        .for_each(|(i_out, ((mut detected, mut coherent), mut incoherent))| {
            let mut stokes_sum = Array2::<f64>::zeros((num_chans, NUM_STOKES));
            let mut power_sum = Array1::<f64>::zeros(num_chans);

            for (i_dec, mut detected) in detected.outer_iter_mut().enumerate() {
                let i_time = i_out * decimation + i_dec;
                let samples = samples.slice(s![.., i_time, .., ..]);

                for (i_chan, mut detected) in detected.outer_iter_mut().enumerate() {
                    let mut e = [c64::default(); 2];
                    let mut power = 0.0;
                    for ((s, w), j) in samples
                        .slice(s![.., i_chan, ..])
                        .outer_iter()
                        .zip(weights.slice(s![.., i_chan, ..]).outer_iter())
                        .zip(inv_jones.slice(s![.., i_chan]))
                    {
                        let sx = c64::new(s[0].re as f64, s[0].im as f64);
                        let sy = c64::new(s[1].re as f64, s[1].im as f64);
                        power += sx.norm_sqr() + sy.norm_sqr();

                        // Flagged antennas must not contribute, even if their
                        // samples aren't finite.
                        if j.is_zero() {
                            continue;
                        }
                        let calibrated = j.mul_vec([w[0] * sx, w[1] * sy]);
                        e[0] += calibrated[0];
                        e[1] += calibrated[1];
                    }

                    detected[0] = e[0];
                    detected[1] = e[1];
                    stokes_sum
                        .row_mut(i_chan)
                        .iter_mut()
                        .zip(stokes(e[0], e[1]))
                        .for_each(|(sum, s)| *sum += s);
                    power_sum[i_chan] += power;
                }
            }

            coherent
                .iter_mut()
                .zip(stokes_sum.iter())
                .for_each(|(out, &sum)| *out = (sum * factor) as f32);
            incoherent
                .iter_mut()
                .zip(power_sum.iter())
                .for_each(|(out, &sum)| *out = (sum * factor) as f32);
        });
}
