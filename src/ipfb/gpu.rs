// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Full polyphase synthesis on a CUDA device.

use ndarray::prelude::*;

use super::{IpfbError, SynthesisFilter};
use crate::{
    c64,
    constants::NUM_POLS,
    gpu::{self, gpu_kernel_call, DevicePointer, GpuComplex},
};

/// Device-side state for polyphase synthesis. The phase-ramped filters are
/// copied to the device once; input and output buffers grow as needed.
pub(super) struct IpfbGpu {
    num_chans: usize,
    taps_per_chan: usize,
    d_ramps: DevicePointer<GpuComplex>,
    d_input: DevicePointer<GpuComplex>,
    d_output: DevicePointer<GpuComplex>,
}

impl IpfbGpu {
    pub(super) fn new(filter: &SynthesisFilter) -> Result<IpfbGpu, IpfbError> {
        let h_ramps: Vec<GpuComplex> = filter.ramps().iter().map(|&g| g.into()).collect();
        Ok(IpfbGpu {
            num_chans: filter.num_chans(),
            taps_per_chan: filter.taps_per_chan(),
            d_ramps: DevicePointer::copy_to_device(&h_ramps)?,
            d_input: DevicePointer::default(),
            d_output: DevicePointer::default(),
        })
    }

    /// `input` is `[row][chan][pol]`, the first `taps_per_chan - 1` rows of
    /// which are history. The output is `[sample][pol]`.
    pub(super) fn synthesise(&mut self, input: ArrayView3<c64>) -> Result<Array2<c64>, IpfbError> {
        let num_in_rows = input.len_of(Axis(0));
        let num_out_rows = num_in_rows.saturating_sub(self.taps_per_chan - 1);
        let num_out = num_out_rows * self.num_chans * NUM_POLS;
        if num_out == 0 {
            return Ok(Array2::zeros((0, NUM_POLS)));
        }

        let h_input: Vec<GpuComplex> = input.iter().map(|&x| x.into()).collect();
        self.d_input.overwrite(&h_input)?;
        self.d_output
            .realloc(num_out * std::mem::size_of::<GpuComplex>())?;

        gpu_kernel_call!(
            gpu::gpu_ipfb_synthesise,
            self.d_input.get(),
            self.d_ramps.get(),
            num_in_rows as i32,
            self.num_chans as i32,
            self.taps_per_chan as i32,
            self.d_output.get_mut(),
        )?;

        let mut h_output = vec![GpuComplex::default(); num_out];
        self.d_output.copy_from_device(&mut h_output)?;
        Ok(Array2::from_shape_vec(
            (num_out_rows * self.num_chans, NUM_POLS),
            h_output.into_iter().map(c64::from).collect(),
        )
        .expect("buffer has the right number of elements"))
    }
}
