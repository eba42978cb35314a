// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Driving blocks of voltages through the beamformer.
//!
//! A [`BlockProcessor`] owns everything needed to turn a [`VoltageBlock`]
//! into beams and reconstructed voltages. Voltages, delays and outputs are
//! handled by the caller's [`BlockSource`], [`DelayModel`] and [`BeamSink`]s.

mod error;
mod timing;

pub use error::{DelayError, SinkError, SourceError};
pub use timing::{Stage, Timings};

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use ndarray::prelude::*;
use scopeguard::defer_on_unwind;

use crate::{
    antenna::AntennaTable,
    beamform::{new_beamformer, BeamBlock, Beamformer},
    calibration::CalibrationTable,
    config::{BeamformerConfig, ConfigError},
    ipfb::{InversionMode, PfbInverter, ReconstructedVoltages, SynthesisFilter},
    weights::WeightComputer,
    BeamformerError, VoltageBlock,
};

/// Provides the geometric delay of each antenna \[s\] for a block.
pub trait DelayModel {
    fn delays(&mut self, block: usize) -> Result<Vec<f64>, DelayError>;
}

/// Provides blocks of voltages, in order. Reading happens on its own thread.
pub trait BlockSource: Send {
    fn read_block(&mut self, block: usize) -> Result<VoltageBlock, SourceError>;
}

/// Consumes the products of each block. Every method does nothing by default,
/// so a sink only needs to implement what it uses.
pub trait BeamSink {
    /// Stokes I, Q, U and V. The dimensions are `[time][chan][4]`.
    fn write_coherent(
        &mut self,
        _block: usize,
        _coherent: ArrayView3<f32>,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    /// Total power. The dimensions are `[time][chan][1]`.
    fn write_incoherent(
        &mut self,
        _block: usize,
        _incoherent: ArrayView3<f32>,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    fn write_voltages(
        &mut self,
        _block: usize,
        _mode: InversionMode,
        _voltages: &ReconstructedVoltages,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Everything produced from a single block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProducts {
    pub beam: BeamBlock,

    /// Reconstructed voltages from each requested [`InversionMode`],
    /// normalised to the configured RMS.
    pub voltages: Vec<(InversionMode, ReconstructedVoltages)>,
}

pub struct BlockProcessor {
    config: BeamformerConfig,
    calibration: CalibrationTable,
    antennas: AntennaTable,
    chan_freqs: Vec<f64>,
    weight_computer: WeightComputer,
    beamformer: Box<dyn Beamformer>,
    inverters: Vec<PfbInverter>,
}

impl BlockProcessor {
    /// Check that all of the inputs agree with the config and set up the
    /// beamformer and any PFB inverters. If `filter` is `None` and voltages
    /// are to be reconstructed, a windowed-sinc filter is designed.
    ///
    /// # Errors
    ///
    /// This function will return an error if the config is invalid, the
    /// antenna or calibration tables have the wrong number of antennas, the
    /// calibration channel width disagrees with the config, a fine channel
    /// has no calibration, or the requested device can't be used.
    pub fn new(
        config: BeamformerConfig,
        calibration: CalibrationTable,
        antennas: AntennaTable,
        filter: Option<SynthesisFilter>,
    ) -> Result<BlockProcessor, BeamformerError> {
        config.validate()?;
        for (what, got) in [
            ("antennas", antennas.len()),
            ("calibrated antennas", calibration.num_antennas()),
        ] {
            if got != config.num_antennas {
                return Err(ConfigError::Count {
                    what,
                    expected: config.num_antennas,
                    got,
                }
                .into());
            }
        }
        let chan_freqs = config.chan_freqs()?;
        // A single calibration channel covers every fine channel, whatever its
        // width.
        if calibration.num_cal_chans() > 1 && calibration.cal_chan_width != config.cal_chan_width {
            return Err(ConfigError::CalChanWidth {
                config: config.cal_chan_width,
                table: calibration.cal_chan_width,
            }
            .into());
        }
        if config.num_antennas > 0 {
            // Every antenna has the same calibration channels.
            for chan in 0..config.num_fine_chans {
                calibration.lookup(0, chan, config.fine_chan_width)?;
            }
        }

        let beamformer = new_beamformer(
            config.device,
            config.num_antennas,
            config.sample_rate,
            config.num_fine_chans,
        )?;

        let modes = config.inversion_modes();
        let inverters = if modes.is_empty() {
            vec![]
        } else {
            let filter = Arc::new(match filter {
                Some(f) => f,
                None => SynthesisFilter::windowed_sinc(config.num_fine_chans, config.taps_per_chan)?,
            });
            modes
                .into_iter()
                .map(|mode| {
                    PfbInverter::new(mode, config.num_fine_chans, Arc::clone(&filter), config.device)
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let num_live = antennas.num_live();
        if num_live == 0 {
            warn!("All antennas are flagged; the coherent beam will be all zeros");
        }
        info!(
            "Beamforming {} antennas ({num_live} unflagged), {} fine channels, {} samples per block",
            config.num_antennas, config.num_fine_chans, config.sample_rate
        );

        Ok(BlockProcessor {
            weight_computer: WeightComputer::from_config(&config),
            config,
            calibration,
            antennas,
            chan_freqs,
            beamformer,
            inverters,
        })
    }

    pub fn config(&self) -> &BeamformerConfig {
        &self.config
    }

    pub fn chan_freqs(&self) -> &[f64] {
        &self.chan_freqs
    }

    /// Forget the history of any PFB inverters, e.g. before processing
    /// voltages that don't follow on from the last block.
    pub fn reset(&mut self) {
        self.inverters.iter_mut().for_each(|i| i.reset());
    }

    /// Form the beams for a single block and, if requested, reconstruct its
    /// voltages. Blocks must be given in order for the voltages to be
    /// continuous.
    pub fn process_block(
        &mut self,
        block: usize,
        voltages: &VoltageBlock,
        delays: &[f64],
    ) -> Result<BlockProducts, BeamformerError> {
        debug!("Processing block {block}");
        let weights =
            self.weight_computer
                .compute(delays, &self.calibration, &self.antennas, &self.chan_freqs)?;
        let beam = self
            .beamformer
            .form_beam(voltages, &weights, self.config.decimation)?;
        if beam.has_non_finite() {
            warn!("Block {block} contains NaN or infinite values");
        }

        let voltages = self
            .inverters
            .iter_mut()
            .map(|inverter| -> Result<_, BeamformerError> {
                let mut v = inverter.invert(beam.detected_beam.view())?;
                v.normalise(self.config.vdif_target_rms);
                Ok((inverter.mode(), v))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BlockProducts { beam, voltages })
    }

    /// Give the requested products of a block to every sink.
    pub fn write_block(
        &self,
        block: usize,
        products: &BlockProducts,
        sinks: &mut [&mut dyn BeamSink],
    ) -> Result<(), SinkError> {
        for sink in sinks.iter_mut() {
            if self.config.output_coherent() {
                sink.write_coherent(block, products.beam.coherent.view())?;
            }
            if self.config.incoherent {
                sink.write_incoherent(block, products.beam.incoherent.view())?;
            }
            for (mode, voltages) in &products.voltages {
                sink.write_voltages(block, *mode, voltages)?;
            }
        }
        Ok(())
    }

    /// Process blocks `0..num_blocks`. The next block is read on another
    /// thread while the current one is processed. Any PFB inverter history is
    /// forgotten first. The time spent in each [`Stage`] is logged and
    /// returned.
    pub fn run(
        &mut self,
        num_blocks: usize,
        source: &mut dyn BlockSource,
        delay_model: &mut dyn DelayModel,
        sinks: &mut [&mut dyn BeamSink],
        draw_progress: bool,
    ) -> Result<Timings, BeamformerError> {
        self.reset();
        info!(
            "Processing {num_blocks} blocks on the {}",
            self.beamformer.device().get_device_info()?
        );

        let progress = ProgressBar::with_draw_target(
            Some(num_blocks as _),
            if draw_progress {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:16}: [{wide_bar:.blue}] {pos:3}/{len:3} blocks ({elapsed_precise}<{eta_precise})")
                .expect("progress bar template is valid")
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Beamforming");

        // Use a variable to track whether any threads have an issue.
        let error = AtomicCell::new(false);
        let (tx, rx) = bounded(1);
        let mut timings = Timings::default();

        let (process_result, read_result) = thread::scope(|scope| {
            let read_handle: thread::ScopedJoinHandle<Result<(), SourceError>> =
                thread::Builder::new()
                    .name("read".to_string())
                    .spawn_scoped(scope, || {
                        defer_on_unwind! { error.store(true); }

                        for block in 0..num_blocks {
                            let start = Instant::now();
                            let result = source.read_block(block);
                            if result.is_err() {
                                error.store(true);
                            }
                            let voltages = result?;

                            // Should we continue?
                            if error.load() {
                                return Ok(());
                            }
                            // A closed channel means processing has stopped.
                            if tx.send((block, voltages, start.elapsed())).is_err() {
                                return Ok(());
                            }
                        }

                        debug!("Finished reading");
                        drop(tx);
                        Ok(())
                    })
                    .expect("OS can create threads");

            let process_result =
                self.process_blocks(rx, delay_model, sinks, &progress, &mut timings);
            if process_result.is_err() {
                error.store(true);
            }
            let read_result = read_handle
                .join()
                .unwrap_or(Err(SourceError::Panicked));
            (process_result, read_result)
        });
        process_result?;
        read_result?;

        progress.abandon_with_message("Finished");
        timings.log_summary();
        Ok(timings)
    }

    fn process_blocks(
        &mut self,
        rx: Receiver<(usize, VoltageBlock, Duration)>,
        delay_model: &mut dyn DelayModel,
        sinks: &mut [&mut dyn BeamSink],
        progress: &ProgressBar,
        timings: &mut Timings,
    ) -> Result<(), BeamformerError> {
        for (block, voltages, read_time) in rx.iter() {
            timings.record(Stage::Read, read_time);

            let start = Instant::now();
            let delays = delay_model.delays(block)?;
            timings.record(Stage::Delay, start.elapsed());

            let start = Instant::now();
            let products = self.process_block(block, &voltages, &delays)?;
            timings.record(Stage::Calc, start.elapsed());

            let start = Instant::now();
            self.write_block(block, &products, sinks)?;
            timings.record(Stage::Write, start.elapsed());

            progress.inc(1);
        }
        Ok(())
    }
}
