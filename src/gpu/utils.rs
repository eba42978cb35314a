// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Utilities for CUDA devices.
//!
//! We assume that everything is UTF-8.

use std::{
    ffi::{CStr, CString},
    panic::Location,
};

use super::{get_gpu_device_info, GpuError};

#[derive(Debug, Clone)]
pub(crate) struct GpuDriverInfo {
    /// Formatted CUDA driver version, e.g. "11.7".
    pub(crate) driver_version: Box<str>,
    /// Formatted CUDA runtime version, e.g. "11.7".
    pub(crate) runtime_version: Box<str>,
}

#[derive(Debug, Clone)]
pub(crate) struct GpuDeviceInfo {
    pub(crate) name: Box<str>,
    pub(crate) capability: Box<str>,
    /// \[MebiBytes (MiB)\]
    pub(crate) total_global_mem: usize,
}

fn format_cuda_version(v: i32) -> String {
    format!("{}.{}", v / 1000, (v / 10) % 100)
}

/// Get CUDA device and driver information. At present, this function only
/// returns information on "device 0".
#[track_caller]
pub(crate) fn get_device_info() -> Result<(GpuDeviceInfo, GpuDriverInfo), GpuError> {
    let location = Location::caller();
    unsafe {
        let device = 0;
        let name = CString::from_vec_unchecked(vec![1; 256]).into_raw();
        let mut device_major = 0;
        let mut device_minor = 0;
        let mut total_global_mem = 0;
        let mut driver_version = 0;
        let mut runtime_version = 0;
        let error_message_ptr = get_gpu_device_info(
            device,
            name,
            &mut device_major,
            &mut device_minor,
            &mut total_global_mem,
            &mut driver_version,
            &mut runtime_version,
        );
        // Take ownership back before anything can return.
        let name = CString::from_raw(name);
        if !error_message_ptr.is_null() {
            let error_message = CStr::from_ptr(error_message_ptr)
                .to_str()
                .unwrap_or("<cannot read CUDA error string>");
            return Err(GpuError::Generic {
                msg: error_message.into(),
                file: location.file(),
                line: location.line(),
            });
        }

        let device_info = GpuDeviceInfo {
            name: name.to_string_lossy().into_owned().into_boxed_str(),
            capability: format!("{device_major}.{device_minor}").into_boxed_str(),
            total_global_mem: total_global_mem / 1048576,
        };

        Ok((
            device_info,
            GpuDriverInfo {
                driver_version: format_cuda_version(driver_version).into_boxed_str(),
                runtime_version: format_cuda_version(runtime_version).into_boxed_str(),
            },
        ))
    }
}
