// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Running whole observations through a [`BlockProcessor`].

use std::io::Write;

use indoc::indoc;
use tempfile::Builder;

use super::*;
use mwa_beamformer::{
    AntennaTable, BeamformerConfig, BeamformerError, BlockProcessor, CalibrationError,
    CalibrationTable, Jones, WeightError,
};

const NUM_ANTENNAS: usize = 4;
const NUM_CHANS: usize = 4;
const NUM_SAMPLES: usize = 16;

fn read_config(contents: &str) -> BeamformerConfig {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    BeamformerConfig::read(file.path()).unwrap()
}

fn source(
    antenna_1_scale: f64,
) -> VcsSource<impl Fn(usize, usize, usize, usize, usize) -> c64 + Send> {
    VcsSource {
        num_antennas: NUM_ANTENNAS,
        num_samples: NUM_SAMPLES,
        num_chans: NUM_CHANS,
        gen: move |block: usize, t: usize, c: usize, a: usize, p: usize| {
            let v = c64::new(
                ((block * 5 + t * 3 + c + a * 7 + p) % 15) as f64 - 7.0,
                ((block + t + c * 5 + a * 3 + p * 2) % 13) as f64 - 6.0,
            );
            if a == 1 {
                v * antenna_1_scale
            } else {
                v
            }
        },
    }
}

fn all_products_config() -> BeamformerConfig {
    read_config(indoc! {r#"
        num_antennas = 4
        num_fine_chans = 4
        sample_rate = 16
        coarse_chan = 121
        decimation = 2
        taps_per_chan = 4
        coherent = true
        incoherent = true
        vdif = true
        uvdif = true
        vdif_target_rms = 10.0
    "#})
}

fn run(
    config: BeamformerConfig,
    calibration: CalibrationTable,
    antennas: AntennaTable,
    antenna_1_scale: f64,
) -> Result<RecordingSink, BeamformerError> {
    let mut processor = BlockProcessor::new(config, calibration, antennas, None)?;
    let mut sink = RecordingSink::default();
    processor.run(
        3,
        &mut source(antenna_1_scale),
        &mut FixedDelays(vec![0.0, 2e-8, -3e-8, 5e-9]),
        &mut [&mut sink],
        false,
    )?;
    Ok(sink)
}

fn custom_flagged_antennas() -> AntennaTable {
    // Antenna 2 is flagged in the metadata, but the custom flags only flag
    // antenna 1.
    let mut antennas = AntennaTable::from_metadata_flags(&[false, false, true, false]);
    antennas.apply_custom_flags("1\n".as_bytes()).unwrap();
    antennas
}

#[test]
fn test_all_products() {
    let sink = run(
        all_products_config(),
        CalibrationTable::identity(NUM_ANTENNAS),
        custom_flagged_antennas(),
        1.0,
    )
    .unwrap();

    let blocks = |v: &[(usize, Array3<f32>)]| v.iter().map(|(b, _)| *b).collect::<Vec<_>>();
    assert_eq!(blocks(&sink.coherent), vec![0, 1, 2]);
    assert_eq!(blocks(&sink.incoherent), vec![0, 1, 2]);
    for (_, coherent) in &sink.coherent {
        assert_eq!(coherent.dim(), (NUM_SAMPLES / 2, NUM_CHANS, 4));
        assert!(coherent.iter().all(|f| f.is_finite()));
    }
    for (_, incoherent) in &sink.incoherent {
        assert_eq!(incoherent.dim(), (NUM_SAMPLES / 2, NUM_CHANS, 1));
    }

    let voltages = sink
        .voltages
        .iter()
        .map(|(b, mode, _)| (*b, *mode))
        .collect::<Vec<_>>();
    assert_eq!(
        voltages,
        vec![
            (0, InversionMode::Ifft),
            (0, InversionMode::Full),
            (1, InversionMode::Ifft),
            (1, InversionMode::Full),
            (2, InversionMode::Ifft),
            (2, InversionMode::Full),
        ]
    );
    for (_, _, v) in &sink.voltages {
        assert_eq!(v.samples.dim(), (NUM_SAMPLES * NUM_CHANS, 2));
        assert!(v.gain.is_finite() && v.gain > 0.0);
    }
}

#[test]
fn test_flagged_antenna_only_affects_incoherent_beam() {
    let normal = run(
        all_products_config(),
        CalibrationTable::identity(NUM_ANTENNAS),
        custom_flagged_antennas(),
        1.0,
    )
    .unwrap();
    // Antenna 1 is flagged; change its voltages.
    let changed = run(
        all_products_config(),
        CalibrationTable::identity(NUM_ANTENNAS),
        custom_flagged_antennas(),
        0.0,
    )
    .unwrap();

    assert_eq!(normal.coherent, changed.coherent);
    assert_eq!(normal.voltages, changed.voltages);
    assert_ne!(normal.incoherent, changed.incoherent);
}

#[test]
fn test_degenerate_calibration() {
    let mut jones = Array2::from_elem((NUM_ANTENNAS, 1), Jones::identity());
    jones[(3, 0)] = Jones::from([
        c64::new(1.0, 0.0),
        c64::new(2.0, 0.0),
        c64::new(2.0, 0.0),
        c64::new(4.0, 0.0),
    ]);
    let calibration = CalibrationTable::new(jones, 1.28e6);

    let mut config = all_products_config();
    config.calibration_policy = "abort".parse().unwrap();
    let result = run(
        config,
        calibration.clone(),
        AntennaTable::new(NUM_ANTENNAS),
        1.0,
    );
    assert!(matches!(
        result,
        Err(BeamformerError::Weights(WeightError::Calibration(
            CalibrationError::Degenerate { antenna: 3, .. }
        )))
    ));

    // By default, the antenna is left out of the beam, which is the same as
    // flagging it.
    let zeroed = run(
        all_products_config(),
        calibration,
        AntennaTable::new(NUM_ANTENNAS),
        1.0,
    )
    .unwrap();
    let mut antennas = AntennaTable::new(NUM_ANTENNAS);
    antennas.flag(3);
    let flagged = run(
        all_products_config(),
        CalibrationTable::identity(NUM_ANTENNAS),
        antennas,
        1.0,
    )
    .unwrap();
    assert_eq!(zeroed.coherent, flagged.coherent);
    assert_eq!(zeroed.incoherent, flagged.incoherent);
    assert_eq!(zeroed.voltages, flagged.voltages);
}

#[test]
fn test_bad_vcs_block_is_an_error() {
    struct Truncated;
    impl BlockSource for Truncated {
        fn read_block(&mut self, _: usize) -> Result<VoltageBlock, SourceError> {
            Ok(VoltageBlock::from_vcs_bytes(&[0; 10], NUM_ANTENNAS, NUM_SAMPLES, NUM_CHANS)?)
        }
    }

    let mut processor = BlockProcessor::new(
        all_products_config(),
        CalibrationTable::identity(NUM_ANTENNAS),
        AntennaTable::new(NUM_ANTENNAS),
        None,
    )
    .unwrap();
    let result = processor.run(
        2,
        &mut Truncated,
        &mut FixedDelays(vec![0.0; NUM_ANTENNAS]),
        &mut [],
        false,
    );
    assert!(matches!(
        result,
        Err(BeamformerError::Source(SourceError::Shape(_)))
    ));
}
