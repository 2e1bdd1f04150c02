//! Geia normalizes free-text maintenance records into a canonical vocabulary.
//!
//! Records are read from a CSV file. Every configured text column runs through a pipeline that
//! expands domain abbreviations and tags dates, reference codes, equipment numbers, hours,
//! durations, voting ratios and well locations with canonical markers such as `<DTM: 12/03/21>`
//! or `<LOC: Gu|ABC|12U>`.
//!
//! # Commands
//!
//!  - `geia run --input records.csv`: Normalizes a CSV file and writes it to stdout or `--output`.
//!  - `geia check`: Validates the configuration and the abbreviation table.
//!  - `geia tag "text"`: Normalizes a single text.
//!
//! # Workspace Crates
//!
//! Geia is split into the following workspace crates:
//!
//!  - `geia`: Main entry point and command line interface.
//!  - [`geia-config`]: Static configuration for the CLI.
//!  - [`geia-log`]: Error reporting and logging.
//!  - [`geia-text`]: Abbreviation expansion and entity tagging.
//!
//! [`geia-config`]: ../geia_config/index.html
//! [`geia-log`]: ../geia_log/index.html
//! [`geia-text`]: ../geia_text/index.html

mod cli;
mod records;
mod setup;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            geia_log::ensure_error(&err);
            1
        }
    };

    process::exit(exit_code);
}
