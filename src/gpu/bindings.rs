// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rust bindings to the functions in `src_gpu`. These must be kept in sync
//! with `src_gpu/gpu_common.cuh` and the kernel files.

use std::os::raw::{c_char, c_int};

use super::GpuFloat;
use crate::{c64, Jones};

/// A complex number with the same layout as the CUDA `COMPLEX` type.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct GpuComplex {
    pub(crate) re: GpuFloat,
    pub(crate) im: GpuFloat,
}

/// A 2x2 complex matrix with the same layout as the CUDA `JONES` type.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct GpuJones {
    pub(crate) j: [GpuComplex; 4],
}

impl From<c64> for GpuComplex {
    fn from(c: c64) -> Self {
        GpuComplex {
            re: c.re as GpuFloat,
            im: c.im as GpuFloat,
        }
    }
}

impl From<GpuComplex> for c64 {
    fn from(c: GpuComplex) -> Self {
        c64::new(c.re as f64, c.im as f64)
    }
}

impl From<Jones> for GpuJones {
    fn from(j: Jones) -> Self {
        GpuJones {
            j: [j[0].into(), j[1].into(), j[2].into(), j[3].into()],
        }
    }
}

extern "C" {
    pub(crate) fn get_gpu_device_info(
        device: c_int,
        name: *mut c_char,
        device_major: *mut c_int,
        device_minor: *mut c_int,
        total_global_mem: *mut usize,
        driver_version: *mut c_int,
        runtime_version: *mut c_int,
    ) -> *const c_char;

    /// Form the detected beam, per-sample Stokes parameters and per-sample
    /// incoherent power for every (time, chan) cell.
    ///
    /// `voltages` is `[antenna][time][chan][pol][re,im]`, `weights` is
    /// `[antenna][chan][pol]`, `inv_jones` is `[antenna][chan]`,
    /// `detected_beam` is `[time][chan][pol]`, `stokes` is `[time][chan][4]`
    /// and `incoherent` is `[time][chan]`.
    pub(crate) fn gpu_form_beam(
        voltages: *const i8,
        weights: *const GpuComplex,
        inv_jones: *const GpuJones,
        num_antennas: c_int,
        num_samples: c_int,
        num_chans: c_int,
        detected_beam: *mut GpuComplex,
        stokes: *mut GpuFloat,
        incoherent: *mut GpuFloat,
    ) -> *const c_char;

    /// Polyphase synthesis. `input` is `[row][chan][pol]` and holds
    /// `num_input_rows` rows, the first `taps_per_chan - 1` of which are
    /// history. `ramps` is `[chan][taps_per_chan * num_chans]`. `output` is
    /// `[sample][pol]` with `(num_input_rows - taps_per_chan + 1) * num_chans`
    /// samples.
    pub(crate) fn gpu_ipfb_synthesise(
        input: *const GpuComplex,
        ramps: *const GpuComplex,
        num_input_rows: c_int,
        num_chans: c_int,
        taps_per_chan: c_int,
        output: *mut GpuComplex,
    ) -> *const c_char;
}
