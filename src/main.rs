//! CLI панели портфеля: `view`, `add`, `interactive`.

use std::error::Error;
use std::process::ExitCode;

use chrono::Local;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use portfolio_dashboard::cli::{Cli, run};
use portfolio_dashboard::logging;

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

fn main() -> ExitCode {
    logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => {
                    let _ = Cli::command().print_help();
                    ExitCode::FAILURE
                }
            };
        }
    };

    match run(cli, today) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
