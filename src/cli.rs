//! Аргументы командной строки и выполнение команд.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::app::{add_to_file, run_interactive};
use crate::config::Config;
use crate::dashboard::{latest_date_in_month, load_dashboard};
use crate::entry::StdinPrompt;
use crate::error::PortfolioError;
use crate::render::{RenderOptions, render_dashboard};
use crate::utils::{parse_date_arg, parse_month_arg};
use crate::xlsx::XlsxWorkbook;

/// Консольная панель портфеля по книге `.xlsx`.
#[derive(Debug, Parser)]
#[command(name = "portfolio", version)]
pub struct Cli {
    /// Путь к книге.
    #[arg(
        long,
        global = true,
        env = "PORTFOLIO_FILE",
        default_value = "portfolio.xlsx"
    )]
    pub file: PathBuf,

    /// Команда; без неё запускается интерактивный режим.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Команды.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Показать панель на дату и выйти.
    View(Selection),
    /// Ввести значения счетов за день.
    Add(AddArgs),
    /// Листать панель клавишами.
    Interactive(Selection),
}

/// Выбор даты для просмотра.
#[derive(Debug, Default, Args)]
pub struct Selection {
    /// Дата в формате yyyy-MM-dd.
    #[arg(long, value_parser = parse_date_arg, conflicts_with = "month")]
    pub date: Option<NaiveDate>,
    /// Месяц в формате yyyy-MM; берётся последний заполненный день.
    #[arg(long, value_parser = parse_month_arg)]
    pub month: Option<NaiveDate>,
}

/// Аргументы команды `add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Дата в формате yyyy-MM-dd; по умолчанию сегодня.
    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,
}

/// Выполняет разобранную команду.
pub fn run(cli: Cli, today: fn() -> NaiveDate) -> Result<(), PortfolioError> {
    let config = Config::from_env(cli.file);
    info!(file = %config.file.display(), "starting");
    match cli.command {
        Some(Command::View(selection)) => view(&config, &selection, today()),
        Some(Command::Add(args)) => {
            let outcome = add_to_file(&config.file, args.date, today(), &mut StdinPrompt)?;
            println!("{outcome}");
            Ok(())
        }
        Some(Command::Interactive(selection)) => interactive(&config, &selection, today),
        None => interactive(&config, &Selection::default(), today),
    }
}

fn view(config: &Config, selection: &Selection, today: NaiveDate) -> Result<(), PortfolioError> {
    let book = XlsxWorkbook::open(&config.file)?;
    let date = match (selection.date, selection.month) {
        (Some(date), _) => date,
        (None, Some(month)) => latest_date_in_month(&book, month)?,
        (None, None) => today,
    };
    let dashboard = load_dashboard(&book, date, false)?;
    let options = RenderOptions {
        symbols: config.symbols,
        color: config.color,
        interactive: false,
    };
    print!("{}", render_dashboard(&dashboard, &options));
    Ok(())
}

fn interactive(
    config: &Config,
    selection: &Selection,
    today: fn() -> NaiveDate,
) -> Result<(), PortfolioError> {
    let start = match (selection.date, selection.month) {
        (Some(date), _) => date,
        (None, Some(month)) => match XlsxWorkbook::open(&config.file) {
            Ok(book) => latest_date_in_month(&book, month)?,
            Err(PortfolioError::WorkbookNotFound { .. }) => month,
            Err(err) => return Err(err),
        },
        (None, None) => today(),
    };
    run_interactive(config, start, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_mean_interactive() {
        let cli = Cli::try_parse_from(["portfolio"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn view_parses_date_and_file() {
        let cli =
            Cli::try_parse_from(["portfolio", "view", "--date", "2026-01-16", "--file", "a.xlsx"])
                .unwrap();
        assert_eq!(cli.file, PathBuf::from("a.xlsx"));
        let Some(Command::View(selection)) = cli.command else {
            panic!("expected view");
        };
        assert_eq!(selection.date, NaiveDate::from_ymd_opt(2026, 1, 16));
    }

    #[test]
    fn month_accepts_single_digit() {
        let cli = Cli::try_parse_from(["portfolio", "view", "--month", "2026-3"]).unwrap();
        let Some(Command::View(selection)) = cli.command else {
            panic!("expected view");
        };
        assert_eq!(selection.month, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn bad_input_is_rejected() {
        let err = Cli::try_parse_from(["portfolio", "view", "--date", "16.01.2026"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = Cli::try_parse_from([
            "portfolio", "view", "--date", "2026-01-16", "--month", "2026-01",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let err = Cli::try_parse_from(["portfolio", "explode"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }
}
