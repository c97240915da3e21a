//! Sheetsmith - Command-line tool for editing and repacking sprite-sheet frame grids

use std::process::ExitCode;

use sheetsmith::cli;

fn main() -> ExitCode {
    cli::run()
}
