// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous things.

use std::io::Write;

/// Set up `log` output for this crate's messages. A verbosity of 0 shows info
/// messages and above, 1 adds debug messages and anything higher adds trace
/// messages. `RUST_LOG` is still respected.
///
/// Returns an error if a logger has already been set up.
pub fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.filter_level(match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}[{}][{}] {}",
            chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
            record.target(),
            record.level(),
            record.args()
        )
    });
    builder.try_init()
}
