//! Таблица финансового года с листа «Dashboard» и итоги с начала года.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::grid::{Sheet, Workbook, find_sheet_ignore_case};
use crate::types::{FyMetrics, FyMonth, FySummary, FyTotals, Money};
use crate::utils::{cell_money, month_from_name, year_token};

/// Имя листа со сводкой.
pub const DASHBOARD_SHEET: &str = "Dashboard";

/// Сколько первых строк просматривается в поисках заголовка месяцев.
const HEADER_SCAN_ROWS: u32 = 25;
/// Сколько первых строк просматривается в поисках заголовка «FY».
const TITLE_SCAN_ROWS: u32 = 5;
/// Подписи строк показателей ищутся только в первых столбцах.
const LABEL_SCAN_COLUMNS: u32 = 6;
/// Минимум распознанных месяцев в строке заголовка.
const MIN_MONTHS: usize = 6;

const DEFAULT_TITLE: &str = "Financial Year";

/// Строка заголовка: столбцы месяцев и необязательный столбец «Total».
struct MonthHeader {
    months: Vec<(u32, String, u32)>,
    total_column: Option<u32>,
}

/// Извлекает таблицу финансового года; `None`, если листа или таблицы нет.
pub fn extract_fy_summary(workbook: &dyn Workbook) -> Option<FySummary> {
    let name = find_sheet_ignore_case(workbook, DASHBOARD_SHEET)?;
    let sheet = workbook.sheet(&name)?;
    let summary = parse_fy_sheet(sheet);
    debug!(
        sheet = %name,
        found = summary.is_some(),
        months = summary.as_ref().map_or(0, |s| s.months.len()),
        "extracted financial year summary"
    );
    summary
}

/// Разбирает лист со сводкой финансового года.
pub fn parse_fy_sheet(sheet: &dyn Sheet) -> Option<FySummary> {
    let header = find_month_header(sheet)?;
    let return_row = find_label_row(sheet, "return");
    let cash_row = find_label_row(sheet, "cash");
    let pnl_row = find_label_row(sheet, "pnl");
    if return_row.is_none() && cash_row.is_none() && pnl_row.is_none() {
        return None;
    }

    let read = |column: u32| FyMetrics {
        ret: return_row.and_then(|row| cell_money(&sheet.cell(row, column))),
        cash: cash_row.and_then(|row| cell_money(&sheet.cell(row, column))),
        pnl: pnl_row.and_then(|row| cell_money(&sheet.cell(row, column))),
    };

    let title = find_title(sheet).unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let base_year = year_token(&title);
    let first_month = header.months.first().map_or(1, |(_, _, m)| *m);

    let months = header
        .months
        .iter()
        .map(|(column, label, month)| FyMonth {
            label: label.clone(),
            month: *month,
            year: base_year.map(|year| if *month >= first_month { year } else { year + 1 }),
            metrics: read(*column),
        })
        .collect();

    Some(FySummary {
        title,
        months,
        totals: header.total_column.map(read),
    })
}

/// Первая строка среди первых [`HEADER_SCAN_ROWS`], где не меньше шести названий месяцев.
fn find_month_header(sheet: &dyn Sheet) -> Option<MonthHeader> {
    let last_column = sheet.last_column();
    (1..=HEADER_SCAN_ROWS.min(sheet.last_row())).find_map(|row| {
        let mut months = Vec::new();
        let mut total_column = None;
        for column in 1..=last_column {
            let cell = sheet.cell(row, column);
            let Some(text) = cell.as_text() else {
                continue;
            };
            if let Some(month) = month_from_name(text) {
                months.push((column, text.to_string(), month));
            } else if text.eq_ignore_ascii_case("total") {
                total_column = Some(column);
            }
        }
        (months.len() >= MIN_MONTHS).then_some(MonthHeader {
            months,
            total_column,
        })
    })
}

/// Первая строка, где в одном из первых столбцов точно написана подпись.
fn find_label_row(sheet: &dyn Sheet, label: &str) -> Option<u32> {
    let columns = LABEL_SCAN_COLUMNS.min(sheet.last_column());
    (1..=sheet.last_row()).find(|&row| {
        (1..=columns).any(|column| {
            sheet
                .cell(row, column)
                .as_text()
                .is_some_and(|text| text.eq_ignore_ascii_case(label))
        })
    })
}

/// Первая ячейка в первых строках, начинающаяся с «FY».
fn find_title(sheet: &dyn Sheet) -> Option<String> {
    let last_column = sheet.last_column();
    (1..=TITLE_SCAN_ROWS).find_map(|row| {
        (1..=last_column).find_map(|column| {
            sheet
                .cell(row, column)
                .as_text()
                .filter(|text| {
                    text.get(..2)
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("fy"))
                })
                .map(str::to_string)
        })
    })
}

impl FyTotals {
    /// Считает итоги с начала года по месяц выбранной даты и итоги за весь год.
    ///
    /// Срез с начала года заканчивается последним месяцем с номером месяца
    /// `date`; если такого нет, берутся все месяцы с данными.
    pub fn compute(summary: &FySummary, date: NaiveDate) -> Self {
        let months: Vec<&FyMonth> = summary
            .months
            .iter()
            .filter(|m| m.metrics.any())
            .collect();
        let Some(last) = months.len().checked_sub(1) else {
            return Self {
                year_return: summary.totals.and_then(|t| t.ret),
                year_cash: summary.totals.and_then(|t| t.cash),
                year_pnl: summary.totals.and_then(|t| t.pnl),
                ..Self::default()
            };
        };
        let end = months
            .iter()
            .rposition(|m| m.month == date.month())
            .unwrap_or(last);
        let slice = &months[..=end];

        let (ytd_cash_start, ytd_cash_latest) = cash_bounds(slice);
        let ytd_pnl = sum_of(slice, |m| m.pnl).or_else(|| match (ytd_cash_start, ytd_cash_latest) {
            (Some(start), Some(latest)) => Some(latest - start),
            _ => None,
        });
        let ytd_return =
            growth(ytd_cash_start, ytd_cash_latest).or_else(|| sum_of(slice, |m| m.ret));

        let totals = summary.totals.unwrap_or_default();
        let (first_cash, last_cash) = cash_bounds(&months);
        let year_return = totals
            .ret
            .or_else(|| growth(first_cash, last_cash))
            .or_else(|| sum_of(&months, |m| m.ret));
        let year_cash = totals.cash.or(last_cash);
        let year_pnl = totals.pnl.or_else(|| sum_of(&months, |m| m.pnl));

        Self {
            through: Some(slice[end].label.clone()),
            ytd_return,
            ytd_cash_start,
            ytd_cash_latest,
            ytd_pnl,
            year_return,
            year_cash,
            year_pnl,
        }
    }
}

/// Первое и последнее непустое значение денежной оценки.
fn cash_bounds(months: &[&FyMonth]) -> (Option<Money>, Option<Money>) {
    let first = months.iter().find_map(|m| m.metrics.cash);
    let last = months.iter().rev().find_map(|m| m.metrics.cash);
    (first, last)
}

/// Рост между двумя оценками; `None`, если оценки нет или база нулевая.
fn growth(start: Option<Money>, latest: Option<Money>) -> Option<Decimal> {
    match (start, latest) {
        (Some(start), Some(latest)) if !start.is_zero() => Some((latest - start) / start),
        _ => None,
    }
}

/// Сумма непустых значений показателя; `None`, если значений нет.
fn sum_of(months: &[&FyMonth], metric: impl Fn(&FyMetrics) -> Option<Decimal>) -> Option<Decimal> {
    months
        .iter()
        .filter_map(|m| metric(&m.metrics))
        .fold(None, |acc, v| Some(acc.unwrap_or(Decimal::ZERO) + v))
}
