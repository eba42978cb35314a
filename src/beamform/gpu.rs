// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Beamforming on a CUDA device.

use log::debug;
use ndarray::prelude::*;

use super::{check_shapes, BeamBlock, BeamformDevice, BeamformError, Beamformer};
use crate::{
    c64,
    constants::{NUM_POLS, NUM_STOKES},
    gpu::{self, gpu_kernel_call, DevicePointer, GpuComplex, GpuFloat, GpuJones},
    math::decimate,
    weights::BeamWeights,
    ShapeMismatch, VoltageBlock,
};

/// A [`Beamformer`] that runs on a CUDA device. One thread handles one (time,
/// chan) cell and sums the antennas in order.
///
/// Device buffers are allocated once, for a fixed number of antennas, samples
/// and channels, and re-used for every block.
pub struct BeamformerGpu {
    num_antennas: usize,
    num_samples: usize,
    num_chans: usize,

    d_voltages: DevicePointer<i8>,
    d_weights: DevicePointer<GpuComplex>,
    d_inv_jones: DevicePointer<GpuJones>,
    d_detected_beam: DevicePointer<GpuComplex>,
    d_stokes: DevicePointer<GpuFloat>,
    d_incoherent: DevicePointer<GpuFloat>,
}

impl BeamformerGpu {
    pub fn new(
        num_antennas: usize,
        num_samples: usize,
        num_chans: usize,
    ) -> Result<BeamformerGpu, BeamformError> {
        let num_cells = num_samples * num_chans;
        debug!("Allocating GPU beamformer buffers for {num_antennas} antennas and {num_cells} (time, chan) cells");
        Ok(BeamformerGpu {
            num_antennas,
            num_samples,
            num_chans,
            d_voltages: DevicePointer::malloc(num_antennas * num_cells * NUM_POLS * 2)?,
            d_weights: DevicePointer::malloc(
                num_antennas * num_chans * NUM_POLS * std::mem::size_of::<GpuComplex>(),
            )?,
            d_inv_jones: DevicePointer::malloc(
                num_antennas * num_chans * std::mem::size_of::<GpuJones>(),
            )?,
            d_detected_beam: DevicePointer::malloc(
                num_cells * NUM_POLS * std::mem::size_of::<GpuComplex>(),
            )?,
            d_stokes: DevicePointer::malloc(
                num_cells * NUM_STOKES * std::mem::size_of::<GpuFloat>(),
            )?,
            d_incoherent: DevicePointer::malloc(num_cells * std::mem::size_of::<GpuFloat>())?,
        })
    }
}

impl Beamformer for BeamformerGpu {
    fn device(&self) -> BeamformDevice {
        BeamformDevice::Gpu
    }

    fn form_beam_into(
        &mut self,
        voltages: &VoltageBlock,
        weights: &BeamWeights,
        out: &mut BeamBlock,
    ) -> Result<(), BeamformError> {
        let decimation = check_shapes(voltages, weights, out)?;
        ShapeMismatch::check("GPU antennas", self.num_antennas, voltages.num_antennas())?;
        ShapeMismatch::check("GPU samples", self.num_samples, voltages.num_samples())?;
        ShapeMismatch::check("GPU channels", self.num_chans, voltages.num_chans())?;

        // Complex<i8> is repr(C), so the samples are already interleaved
        // (re, im) bytes.
        let samples = voltages.samples.as_standard_layout();
        let samples = samples
            .as_slice()
            .expect("standard layout arrays are contiguous");
        let samples: &[i8] =
            unsafe { std::slice::from_raw_parts(samples.as_ptr().cast(), samples.len() * 2) };
        self.d_voltages.overwrite(samples)?;

        let h_weights: Vec<GpuComplex> = weights.weights.iter().map(|&w| w.into()).collect();
        self.d_weights.overwrite(&h_weights)?;
        let h_inv_jones: Vec<GpuJones> = weights.inv_jones.iter().map(|&j| j.into()).collect();
        self.d_inv_jones.overwrite(&h_inv_jones)?;

        gpu_kernel_call!(
            gpu::gpu_form_beam,
            self.d_voltages.get(),
            self.d_weights.get(),
            self.d_inv_jones.get(),
            self.num_antennas as i32,
            self.num_samples as i32,
            self.num_chans as i32,
            self.d_detected_beam.get_mut(),
            self.d_stokes.get_mut(),
            self.d_incoherent.get_mut(),
        )?;

        let num_cells = self.num_samples * self.num_chans;
        let mut h_detected_beam = vec![GpuComplex::default(); num_cells * NUM_POLS];
        self.d_detected_beam.copy_from_device(&mut h_detected_beam)?;
        out.detected_beam
            .iter_mut()
            .zip(h_detected_beam)
            .for_each(|(out, d)| *out = c64::from(d));

        let mut h_stokes = vec![0.0; num_cells * NUM_STOKES];
        self.d_stokes.copy_from_device(&mut h_stokes)?;
        let h_stokes = Array3::from_shape_vec(
            (self.num_samples, self.num_chans, NUM_STOKES),
            h_stokes.into_iter().map(|s| s as f64).collect(),
        )
        .expect("buffer has the right number of elements");
        decimate(h_stokes.view(), out.coherent.view_mut(), decimation, weights.norm);

        let mut h_incoherent = vec![0.0; num_cells];
        self.d_incoherent.copy_from_device(&mut h_incoherent)?;
        let h_incoherent = Array3::from_shape_vec(
            (self.num_samples, self.num_chans, 1),
            h_incoherent.into_iter().map(|s| s as f64).collect(),
        )
        .expect("buffer has the right number of elements");
        decimate(
            h_incoherent.view(),
            out.incoherent.view_mut(),
            decimation,
            weights.norm,
        );

        Ok(())
    }
}
