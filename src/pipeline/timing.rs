// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Wall-clock statistics for each stage of block processing.

use std::time::Duration;

use log::info;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::math::mean_and_std;

#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[strum(serialize = "read")]
    Read,
    #[strum(serialize = "delay")]
    Delay,
    #[strum(serialize = "calc")]
    Calc,
    #[strum(serialize = "write")]
    Write,
}

/// The time each block spent in each [`Stage`] \[s\].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Timings {
    read: Vec<f64>,
    delay: Vec<f64>,
    calc: Vec<f64>,
    write: Vec<f64>,
}

impl Timings {
    pub fn record(&mut self, stage: Stage, duration: Duration) {
        self.get_mut(stage).push(duration.as_secs_f64());
    }

    pub fn get(&self, stage: Stage) -> &[f64] {
        match stage {
            Stage::Read => &self.read,
            Stage::Delay => &self.delay,
            Stage::Calc => &self.calc,
            Stage::Write => &self.write,
        }
    }

    fn get_mut(&mut self, stage: Stage) -> &mut Vec<f64> {
        match stage {
            Stage::Read => &mut self.read,
            Stage::Delay => &mut self.delay,
            Stage::Calc => &mut self.calc,
            Stage::Write => &mut self.write,
        }
    }

    /// The total, mean and standard deviation of a stage's times \[s\].
    pub fn summary(&self, stage: Stage) -> (f64, f64, f64) {
        let times = self.get(stage);
        let (mean, std) = mean_and_std(times);
        (times.iter().sum(), mean, std)
    }

    pub fn log_summary(&self) {
        for stage in Stage::iter() {
            let (total, mean, std) = self.summary(stage);
            info!("Total time {stage:>5}: {total:9.3} s (per block {mean:.3} ± {std:.3} s)");
        }
    }
}
