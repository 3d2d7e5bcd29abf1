//! Вспомогательные парсеры чисел, дат, названий месяцев и листов.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::error::PortfolioError;
use crate::grid::CellValue;
use crate::types::Money;

/// Префикс имени месячного листа.
pub const MONTH_SHEET_PREFIX: &str = "Data Over time ";

/// Диапазон правдоподобных серийных дат Excel (примерно 1954..2064).
const SERIAL_MIN: f64 = 20_000.0;
const SERIAL_MAX: f64 = 60_000.0;

static MONTH_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("valid month regex"));

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Форматы текстовых дат в заголовках, пробуются по порядку.
const TEXT_DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b %d %Y",
];

/// Нормализует числовую строку, удаляя пробелы, разделители тысяч, знак плюса итд.
fn normalize_number(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !matches!(*ch, ' ' | '\u{a0}' | '\u{202f}' | '+' | ',' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Переводит `f64` из ячейки в `Decimal`.
#[inline]
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.normalize())
}

/// Читает ячейку как деньги: число или текст с числом. Пустая ячейка даёт `None`.
pub fn cell_money(value: &CellValue) -> Option<Money> {
    match value {
        CellValue::Number(n) => decimal_from_f64(*n),
        CellValue::Text(text) => {
            let normalized = normalize_number(text);
            let (digits, percent) = normalized
                .strip_suffix('%')
                .map_or((normalized.as_str(), false), |d| (d, true));
            let parsed = Decimal::from_str(digits).ok()?;
            Some(if percent {
                parsed / Decimal::ONE_HUNDRED
            } else {
                parsed
            })
        }
        CellValue::Empty | CellValue::Date(_) => None,
    }
}

/// Разбирает сумму, введённую пользователем. Пустая строка считается ошибкой.
pub fn parse_amount(value: &str) -> Result<Money, PortfolioError> {
    let normalized = normalize_number(value);
    let amount = Decimal::from_str(&normalized).map_err(|_| PortfolioError::InvalidAmount {
        value: value.trim().to_string(),
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PortfolioError::NegativeAmount {
            value: value.trim().to_string(),
        });
    }
    Ok(amount)
}

/// Разбирает дату в формате `yyyy-MM-dd`.
pub fn parse_date_arg(value: &str) -> Result<NaiveDate, PortfolioError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| PortfolioError::InvalidDate {
        value: value.trim().to_string(),
    })
}

/// Разбирает месяц в формате `yyyy-MM` или `yyyy-M` и возвращает его первый день.
pub fn parse_month_arg(value: &str) -> Result<NaiveDate, PortfolioError> {
    let invalid = || PortfolioError::InvalidMonth {
        value: value.trim().to_string(),
    };
    let caps = MONTH_ARG_RE.captures(value.trim()).ok_or_else(invalid)?;
    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

/// Переводит серийный номер даты Excel (система 1900) в дату.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // 1899-12-30 компенсирует несуществующее 29.02.1900 для номеров после 60.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let days = serial.trunc() as u64;
    epoch.checked_add_days(Days::new(days))
}

/// Серийный номер даты Excel.
pub fn serial_from_date(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    #[allow(clippy::cast_precision_loss)]
    let days = (date - epoch).num_days() as f64;
    days
}

/// Пытается прочитать дату из ячейки заголовка: дата, серийный номер, текст.
pub fn header_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(date) => Some(*date),
        CellValue::Number(n) if *n > SERIAL_MIN && *n < SERIAL_MAX => date_from_serial(*n),
        CellValue::Text(text) => parse_text_date(text),
        _ => None,
    }
}

/// Разбирает дату, записанную текстом в одном из распространённых форматов.
pub fn parse_text_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Отрезаем время, если дата выгружена как «2026-01-16 00:00:00».
    let date_part = trimmed
        .split_once([' ', 'T'])
        .filter(|(head, tail)| head.contains('-') && tail.contains(':'))
        .map_or(trimmed, |(head, _)| head);
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Номер месяца по полному или трёхбуквенному названию.
pub fn month_from_name(text: &str) -> Option<u32> {
    let lower = text.trim().trim_end_matches('.').to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| *name == lower || (lower.len() == 3 && name.starts_with(&lower)))
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

/// Полное английское название месяца.
pub fn month_name(month: u32) -> &'static str {
    const TITLES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    month
        .checked_sub(1)
        .and_then(|idx| TITLES.get(idx as usize))
        .copied()
        .unwrap_or("")
}

/// Имя месячного листа: «Data Over time March 2026».
pub fn month_sheet_name(date: NaiveDate) -> String {
    format!(
        "{MONTH_SHEET_PREFIX}{} {}",
        month_name(date.month()),
        date.year()
    )
}

/// Разбирает имя месячного листа в первый день месяца.
pub fn parse_month_sheet_name(name: &str) -> Option<NaiveDate> {
    let rest = name.trim().strip_prefix(MONTH_SHEET_PREFIX.trim_end())?.trim();
    let (month, year) = rest.rsplit_once(' ')?;
    let month = MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month.trim()))?;
    let year: i32 = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, u32::try_from(month + 1).ok()?, 1)
}

/// Первый день месяца.
#[inline]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Последний день месяца.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let start = month_start(date);
    let next = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).unwrap_or(date)
}

/// Сдвигает дату на `delta` месяцев, сохраняя число и обрезая его по длине месяца.
pub fn shift_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let month0 = i32::try_from(date.month0()).unwrap_or(0);
    let total = date.year() * 12 + month0 + delta;
    let year = total.div_euclid(12);
    let month = u32::try_from(total.rem_euclid(12)).unwrap_or(0) + 1;
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return date;
    };
    let last_day = month_end(first).day();
    first.with_day(date.day().min(last_day)).unwrap_or(first)
}

/// Первый четырёхзначный год в тексте.
pub fn year_token(text: &str) -> Option<i32> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Относительное изменение; ноль при нулевой базе.
#[inline]
pub fn ratio(change: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        Decimal::ZERO
    } else {
        change / base
    }
}
