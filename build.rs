// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(feature = "cuda")]
    gpu::build();
}

#[cfg(feature = "cuda")]
mod gpu {
    use std::env;

    const DEFAULT_CUDA_ARCHES: &[u16] = &[60, 70, 80];
    const DEFAULT_CUDA_SMS: &[u16] = &[60, 70, 75, 80, 86];

    fn parse_and_validate_compute(c: &str, var: &str) -> Vec<u16> {
        let mut out = vec![];
        for compute in c.trim().split(',') {
            // Check that there's only two numeric characters.
            if compute.len() != 2 {
                panic!("When parsing {var}, found '{compute}', which is not a two-digit number!")
            }

            match compute.parse() {
                Ok(p) => out.push(p),
                Err(_) => panic!("'{compute}', part of {var}, couldn't be parsed into a number!"),
            }
        }
        out
    }

    pub(super) fn build() {
        println!("cargo:rerun-if-env-changed=MWA_BEAMFORMER_CUDA_COMPUTE");
        let (arches, sms) = match env::var("MWA_BEAMFORMER_CUDA_COMPUTE") {
            Ok(c) => {
                let compute = parse_and_validate_compute(&c, "MWA_BEAMFORMER_CUDA_COMPUTE");
                let sms = compute.clone();
                (compute, sms)
            }
            Err(_) => {
                println!("cargo:warning=No MWA_BEAMFORMER_CUDA_COMPUTE; Passing arch=compute_{DEFAULT_CUDA_ARCHES:?} and code=sm_{DEFAULT_CUDA_SMS:?} to nvcc");
                (DEFAULT_CUDA_ARCHES.to_vec(), DEFAULT_CUDA_SMS.to_vec())
            }
        };

        // Compile all CUDA source files into a single library. If any .cu or
        // .cuh file changes, tell cargo to recompile.
        let mut cuda_files = vec![];
        for entry in std::fs::read_dir("src_gpu").expect("src_gpu directory doesn't exist!") {
            let entry = entry.expect("Couldn't access file in src_gpu directory");
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match path.extension().and_then(|os_str| os_str.to_str()) {
                Some("cu") => {
                    println!("cargo:rerun-if-changed={}", path.display());
                    cuda_files.push(path);
                }

                Some("h" | "cuh") => {
                    println!("cargo:rerun-if-changed={}", path.display());
                }

                _ => (),
            }
        }

        let mut cuda_target = cc::Build::new();
        cuda_target
            .cuda(true)
            .cudart("shared")
            .define(
                // cargo sets DEBUG to "false" for release builds. assert.h
                // wants NDEBUG in that case.
                match env::var("DEBUG").as_deref() {
                    Ok("false") => "NDEBUG",
                    _ => "DEBUG",
                },
                None,
            );

        for arch in arches {
            for &sm in &sms {
                if sm < arch {
                    continue;
                }

                cuda_target.flag("-gencode");
                cuda_target.flag(&format!("arch=compute_{arch},code=sm_{sm}"));
            }
        }

        // The CUDA code uses double-precision floats unless told otherwise.
        if env::var("CARGO_FEATURE_GPU_SINGLE").is_ok() {
            cuda_target.define("SINGLE", None);
        }

        cuda_target.files(cuda_files).compile("mwa_beamformer_cu");
    }
}
