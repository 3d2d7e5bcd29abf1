//! Ввод значений за день: подсказки по умолчанию, защита от перезаписи и запись в лист.

use std::fmt;
use std::io::{self, BufRead, Write};

use chrono::NaiveDate;
use tracing::info;

use crate::error::PortfolioError;
use crate::grid::{CellValue, Sheet, Workbook};
use crate::month::{
    bootstrap_month_sheet, ensure_month_sheet, find_month_sheet, money_to_f64, month_sheets,
};
use crate::parser::parse_sheet;
use crate::types::{AccountRow, AccountSeed, Money, SheetInfo};
use crate::utils::{parse_amount, parse_date_arg};

/// Источник ответов пользователя.
pub trait Prompt {
    /// Задаёт вопрос и возвращает ответ без перевода строки.
    fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String, PortfolioError>;
    /// Запрашивает подтверждение «да/нет».
    fn confirm(&mut self, question: &str) -> Result<bool, PortfolioError>;
    /// Сообщает об ошибке ввода, после которой вопрос будет задан снова.
    fn warn(&mut self, message: &str);
}

/// Значение счёта, введённое за день.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    /// Строка счёта.
    pub row: u32,
    /// Значение.
    pub value: Money,
}

/// Итог команды добавления.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Книга создана с нуля.
    Bootstrapped {
        /// Имя созданного листа.
        sheet: String,
        /// Дата начальных значений.
        date: NaiveDate,
    },
    /// Значения записаны в существующий (или только что скопированный) лист.
    Written {
        /// Имя листа.
        sheet: String,
        /// Дата столбца.
        date: NaiveDate,
        /// Сколько счетов записано.
        accounts: usize,
    },
    /// Пользователь отказался перезаписывать данные.
    Declined,
}

impl AddOutcome {
    /// Нужно ли сохранять книгу.
    #[inline]
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::Declined)
    }
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrapped { sheet, date } => {
                write!(f, "Created '{sheet}' with entries for {date}")
            }
            Self::Written {
                sheet,
                date,
                accounts,
            } => write!(f, "Saved {accounts} entries for {date} to '{sheet}'"),
            Self::Declined => f.write_str("Existing entries kept"),
        }
    }
}

/// Значения по умолчанию для ввода: текущее значение ячейки, а если её нет,
/// значение из ближайшего заполненного дня левее.
pub fn default_entries(info: &SheetInfo<'_>, column: u32) -> Vec<Option<Money>> {
    let fallback = info.previous_populated(column);
    info.account_rows
        .iter()
        .map(|account| {
            let own = info.sheet.cell(account.row, column);
            if own.is_blank() {
                fallback
                    .filter(|&c| !info.sheet.cell(account.row, c).is_blank())
                    .map(|c| info.value(account.row, c))
            } else {
                Some(info.value(account.row, column))
            }
        })
        .collect()
}

/// Записывает значения за день как статические числа.
pub fn write_day_entries(sheet: &mut dyn Sheet, column: u32, entries: &[DayEntry]) {
    for entry in entries {
        sheet.set_cell(entry.row, column, CellValue::Number(money_to_f64(entry.value)));
    }
}

/// Добавляет значения за день.
///
/// Если ни один месячный лист не распознаётся, создаёт лист с нуля по введённым
/// счетам; нераспознанный лист того же месяца заменяется только после
/// подтверждения. Иначе находит или создаёт лист месяца, при наличии данных за
/// день спрашивает подтверждение и запрашивает значение для каждого счёта.
/// Книга только меняется в памяти; сохранение остаётся за вызывающим кодом.
pub fn add_entries(
    workbook: &mut dyn Workbook,
    date: Option<NaiveDate>,
    today: NaiveDate,
    prompt: &mut dyn Prompt,
) -> Result<AddOutcome, PortfolioError> {
    if !has_usable_month_sheet(workbook) {
        let date = match date {
            Some(date) => date,
            None => ask_date(prompt, today)?,
        };
        if let Some(existing) = find_month_sheet(workbook, date) {
            let question = format!("Sheet '{existing}' has no recognizable data. Replace it?");
            if !prompt.confirm(&question)? {
                return Ok(AddOutcome::Declined);
            }
        }
        let seeds = ask_seeds(prompt)?;
        let sheet = bootstrap_month_sheet(workbook, date, &seeds)?;
        return Ok(AddOutcome::Bootstrapped { sheet, date });
    }

    let date = date.unwrap_or(today);
    let name = ensure_month_sheet(workbook, date)?;
    let (column, has_data, accounts, defaults) = {
        let sheet = workbook
            .sheet(&name)
            .ok_or_else(|| PortfolioError::SheetNotFound { name: name.clone() })?;
        let info = parse_sheet(sheet)?;
        if !info.is_usable() {
            return Err(PortfolioError::NoRecognizableData { sheet: name });
        }
        let column = info.column_for(date).ok_or_else(|| PortfolioError::DateNotInSheet {
            date,
            sheet: name.clone(),
        })?;
        (
            column,
            info.has_data(column),
            info.account_rows.clone(),
            default_entries(&info, column),
        )
    };

    if has_data && !prompt.confirm(&format!("{date} already has values. Overwrite?"))? {
        return Ok(AddOutcome::Declined);
    }

    let entries = ask_values(prompt, &accounts, &defaults)?;
    let sheet = workbook
        .sheet_mut(&name)
        .ok_or_else(|| PortfolioError::SheetNotFound { name: name.clone() })?;
    write_day_entries(sheet, column, &entries);

    info!(sheet = %name, %date, accounts = entries.len(), "wrote day entries");
    Ok(AddOutcome::Written {
        sheet: name,
        date,
        accounts: entries.len(),
    })
}

/// Есть ли месячный лист с датами и счетами.
fn has_usable_month_sheet(workbook: &dyn Workbook) -> bool {
    month_sheets(workbook).iter().any(|(_, name)| {
        workbook
            .sheet(name)
            .and_then(|sheet| parse_sheet(sheet).ok())
            .is_some_and(|info| info.is_usable())
    })
}

fn ask_date(prompt: &mut dyn Prompt, today: NaiveDate) -> Result<NaiveDate, PortfolioError> {
    let default = today.format("%Y-%m-%d").to_string();
    loop {
        let answer = prompt.ask("Start date (yyyy-MM-dd)", Some(&default))?;
        if answer.trim().is_empty() {
            return Ok(today);
        }
        match parse_date_arg(&answer) {
            Ok(date) => return Ok(date),
            Err(err) => prompt.warn(&err.to_string()),
        }
    }
}

/// Запрашивает пары «счёт, значение» до пустого названия.
fn ask_seeds(prompt: &mut dyn Prompt) -> Result<Vec<AccountSeed>, PortfolioError> {
    let mut seeds = Vec::new();
    loop {
        let name = prompt.ask("Account name (blank to finish)", None)?;
        let name = name.trim();
        if name.is_empty() {
            break;
        }
        let value = ask_amount(prompt, &format!("Value for {name}"), None)?;
        seeds.push(AccountSeed {
            name: name.to_string(),
            value,
        });
    }
    if seeds.is_empty() {
        return Err(PortfolioError::NoAccounts);
    }
    Ok(seeds)
}

fn ask_values(
    prompt: &mut dyn Prompt,
    accounts: &[AccountRow],
    defaults: &[Option<Money>],
) -> Result<Vec<DayEntry>, PortfolioError> {
    accounts
        .iter()
        .zip(defaults)
        .map(|(account, default)| {
            let value = ask_amount(prompt, &account.name, *default)?;
            Ok(DayEntry {
                row: account.row,
                value,
            })
        })
        .collect()
}

/// Запрашивает неотрицательную сумму; пустой ответ берёт значение по умолчанию.
fn ask_amount(
    prompt: &mut dyn Prompt,
    question: &str,
    default: Option<Money>,
) -> Result<Money, PortfolioError> {
    let default_text = default.map(|d| d.to_string());
    loop {
        let answer = prompt.ask(question, default_text.as_deref())?;
        if answer.trim().is_empty() {
            if let Some(value) = default {
                return Ok(value);
            }
        }
        match parse_amount(&answer) {
            Ok(value) => return Ok(value),
            Err(err) => prompt.warn(&err.to_string()),
        }
    }
}

/// Ввод с консоли построчно.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String, PortfolioError> {
        let mut stdout = io::stdout().lock();
        match default {
            Some(default) => write!(stdout, "{question} [{default}]: ")?,
            None => write!(stdout, "{question}: ")?,
        }
        stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PortfolioError> {
        let answer = self.ask(&format!("{question} (y/N)"), None)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn warn(&mut self, message: &str) {
        eprintln!("  {message}");
    }
}
