//! Разбор месячного листа: столбцы дат, строки счетов и строка «Total».

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::PortfolioError;
use crate::grid::Sheet;
use crate::types::{AccountRow, DateColumn, Money, SheetInfo};
use crate::utils::{cell_money, header_date};

/// Строка заголовка с датами.
pub const HEADER_ROW: u32 = 1;
/// Первая строка, в которой ищутся счета.
pub const FIRST_ACCOUNT_ROW: u32 = 4;
/// Первый столбец с датами; в первом столбце названия строк.
pub const FIRST_DATE_COLUMN: u32 = 2;
/// Столбец с названиями строк.
pub const LABEL_COLUMN: u32 = 1;

/// Разбирает месячный лист.
///
/// Отсутствие распознанных дат или счетов не ошибка, пустые списки проверяет
/// вызывающий код. Отсутствие строки «Total» фатально: без неё нет области счетов.
pub fn parse_sheet(sheet: &dyn Sheet) -> Result<SheetInfo<'_>, PortfolioError> {
    let date_columns = scan_date_columns(sheet);
    let total_row = find_total_row(sheet).ok_or_else(|| PortfolioError::MissingTotalRow {
        sheet: sheet.name().to_string(),
    })?;
    let account_rows = date_columns
        .first()
        .map(|first| scan_account_rows(sheet, first.column, total_row))
        .unwrap_or_default();

    debug!(
        sheet = sheet.name(),
        dates = date_columns.len(),
        accounts = account_rows.len(),
        total_row,
        "parsed month sheet"
    );

    Ok(SheetInfo {
        name: sheet.name().to_string(),
        date_columns,
        account_rows,
        total_row,
        sheet,
    })
}

/// Собирает даты из строки заголовка и оставляет непрерывную последовательность дней.
fn scan_date_columns(sheet: &dyn Sheet) -> Vec<DateColumn> {
    let candidates: Vec<DateColumn> = (FIRST_DATE_COLUMN..=sheet.last_column())
        .filter_map(|column| {
            header_date(&sheet.cell(HEADER_ROW, column)).map(|date| DateColumn { date, column })
        })
        .collect();
    contiguous_run(candidates)
}

/// Оставляет максимальную цепочку соседних столбцов, где каждая дата на день позже
/// предыдущей. Всё после первого разрыва отбрасывается.
pub fn contiguous_run(mut candidates: Vec<DateColumn>) -> Vec<DateColumn> {
    candidates.sort_by_key(|dc| dc.column);
    let mut run: Vec<DateColumn> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(prev) = run.last() {
            let adjacent = candidate.column == prev.column + 1;
            let next_day = prev.date.succ_opt() == Some(candidate.date);
            if !adjacent || !next_day {
                break;
            }
        }
        run.push(candidate);
    }
    run
}

/// Первая строка, в первом столбце которой написано «Total» (без учёта регистра).
fn find_total_row(sheet: &dyn Sheet) -> Option<u32> {
    (1..=sheet.last_row()).find(|&row| {
        sheet
            .cell(row, LABEL_COLUMN)
            .as_text()
            .is_some_and(|text| text.eq_ignore_ascii_case("total"))
    })
}

/// Строки счетов между [`FIRST_ACCOUNT_ROW`] и строкой «Total».
///
/// Строка считается счётом, если у неё есть название и значение не меньше 1 в
/// первом столбце дат: так отсеиваются строки-комментарии.
fn scan_account_rows(sheet: &dyn Sheet, first_column: u32, total_row: u32) -> Vec<AccountRow> {
    (FIRST_ACCOUNT_ROW..total_row)
        .filter_map(|row| {
            let label = sheet.cell(row, LABEL_COLUMN);
            let name = match label.as_text() {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => return None,
            };
            let value = sheet.cell(row, first_column).as_number()?;
            (value >= 1.0).then_some(AccountRow { name, row })
        })
        .collect()
}

impl SheetInfo<'_> {
    /// Значение счёта в столбце; пустая или нечисловая ячейка читается как ноль.
    #[inline]
    pub fn value(&self, row: u32, column: u32) -> Money {
        cell_money(&self.sheet.cell(row, column)).unwrap_or(Decimal::ZERO)
    }

    /// Сумма по всем счетам в столбце.
    pub fn total(&self, column: u32) -> Money {
        self.account_rows
            .iter()
            .map(|account| self.value(account.row, column))
            .sum()
    }

    /// Есть ли хотя бы одно непустое значение счёта в столбце.
    pub fn has_data(&self, column: u32) -> bool {
        self.account_rows
            .iter()
            .any(|account| !self.sheet.cell(account.row, column).is_blank())
    }

    /// Ближайший столбец дат строго левее `column`.
    pub fn previous_column(&self, column: u32) -> Option<u32> {
        self.date_columns
            .iter()
            .rev()
            .map(|dc| dc.column)
            .find(|&c| c < column)
    }

    /// Ближайший столбец дат строго левее `column`, в котором есть данные.
    pub fn previous_populated(&self, column: u32) -> Option<u32> {
        self.date_columns
            .iter()
            .rev()
            .map(|dc| dc.column)
            .find(|&c| c < column && self.has_data(c))
    }

    /// Последний столбец дат с данными; если данных нет, последний столбец дат.
    pub fn latest_populated(&self) -> Option<u32> {
        self.date_columns
            .iter()
            .rev()
            .map(|dc| dc.column)
            .find(|&c| self.has_data(c))
            .or_else(|| self.date_columns.last().map(|dc| dc.column))
    }
}
