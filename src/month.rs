//! Месячные листы: поиск, создание копированием предыдущего месяца и создание с нуля.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

use crate::error::PortfolioError;
use crate::grid::{CellValue, Formula, Sheet, Workbook};
use crate::parser::{FIRST_ACCOUNT_ROW, FIRST_DATE_COLUMN, HEADER_ROW, LABEL_COLUMN, parse_sheet};
use crate::types::{AccountSeed, Money};
use crate::utils::{month_sheet_name, month_start, parse_month_sheet_name};

/// Первая строка данных, которую наследует копия листа.
const FIRST_DATA_ROW: u32 = 2;

/// Подпись строки дневных изменений под строкой «Total».
const CHANGE_LABEL: &str = "Change";

/// Месячные листы книги: (первый день месяца, имя листа) по возрастанию месяца.
pub fn month_sheets(workbook: &dyn Workbook) -> Vec<(NaiveDate, String)> {
    let mut sheets: Vec<_> = workbook
        .sheet_names()
        .into_iter()
        .filter_map(|name| parse_month_sheet_name(&name).map(|month| (month, name)))
        .collect();
    sheets.sort_by_key(|(month, _)| *month);
    sheets
}

/// Имя существующего листа для месяца даты.
pub fn find_month_sheet(workbook: &dyn Workbook, date: NaiveDate) -> Option<String> {
    let month = month_start(date);
    month_sheets(workbook)
        .into_iter()
        .find(|(m, _)| *m == month)
        .map(|(_, name)| name)
}

/// Возвращает лист месяца `date`, при необходимости создавая его из ближайшего
/// предыдущего месяца.
///
/// Новый лист получает структуру предыдущего; базовый столбец заполняется
/// последними значениями предыдущего месяца, дневные столбцы остаются пустыми.
pub fn ensure_month_sheet(
    workbook: &mut dyn Workbook,
    date: NaiveDate,
) -> Result<String, PortfolioError> {
    if let Some(existing) = find_month_sheet(workbook, date) {
        return Ok(existing);
    }

    let target = month_start(date);
    let target_name = month_sheet_name(target);
    let (_, source_name) = month_sheets(workbook)
        .into_iter()
        .rev()
        .find(|(month, _)| *month < target)
        .ok_or_else(|| PortfolioError::NoPriorMonth {
            target: target_name.clone(),
        })?;

    let carry = {
        let source = workbook
            .sheet(&source_name)
            .ok_or_else(|| PortfolioError::SheetNotFound {
                name: source_name.clone(),
            })?;
        CarryForward::capture(source)?
    };

    let sheet = workbook.duplicate_sheet(&source_name, &target_name)?;
    carry.apply(sheet, target);

    info!(
        source = %source_name,
        target = %target_name,
        baseline_from = carry.source_column,
        "created month sheet"
    );
    Ok(target_name)
}

/// Значения, переносимые из предыдущего месяца в базовый столбец нового.
struct CarryForward {
    /// Столбец источника, из которого взяты значения.
    source_column: u32,
    /// Строка «Total» источника.
    total_row: u32,
    /// Последний использованный столбец источника.
    last_column: u32,
    /// Последний столбец дат источника.
    last_date_column: u32,
    /// Строка дневных изменений под «Total», если она подписана.
    change_row: Option<u32>,
    /// Значения строк `FIRST_DATA_ROW..total_row` в порядке строк.
    values: Vec<CellValue>,
}

impl CarryForward {
    fn capture(source: &dyn Sheet) -> Result<Self, PortfolioError> {
        let info = parse_sheet(source)?;
        let source_column = info.latest_populated().unwrap_or(FIRST_DATE_COLUMN);
        let values = (FIRST_DATA_ROW..info.total_row)
            .map(|row| source.cell(row, source_column))
            .collect();
        let change_row = info.total_row + 1;
        let change_row = source
            .cell(change_row, LABEL_COLUMN)
            .as_text()
            .is_some_and(|text| text.eq_ignore_ascii_case(CHANGE_LABEL))
            .then_some(change_row);
        debug!(
            sheet = %info.name,
            column = source_column,
            "captured carry-forward column"
        );
        Ok(Self {
            source_column,
            total_row: info.total_row,
            last_column: source.last_column(),
            last_date_column: info
                .date_columns
                .last()
                .map_or(FIRST_DATE_COLUMN, |dc| dc.column),
            change_row,
            values,
        })
    }

    fn apply(&self, sheet: &mut dyn Sheet, target: NaiveDate) {
        let last_column = write_header(sheet, target);
        for column in last_column + 1..=self.last_column {
            sheet.clear_cell(HEADER_ROW, column);
        }

        let clear_to = self.last_column.max(last_column);
        for (row, value) in (FIRST_DATA_ROW..self.total_row).zip(&self.values) {
            if value.is_blank() {
                sheet.clear_cell(row, FIRST_DATE_COLUMN);
            } else {
                sheet.set_cell(row, FIRST_DATE_COLUMN, value.clone());
            }
            for column in FIRST_DATE_COLUMN + 1..=clear_to {
                sheet.clear_cell(row, column);
            }
        }
        self.extend_formulas(sheet, last_column);
    }

    /// Дописывает формулы «Total» и «Change» в столбцы дней, которых не было у
    /// источника, и убирает их из столбцов за концом месяца.
    fn extend_formulas(&self, sheet: &mut dyn Sheet, last_column: u32) {
        let rows = std::iter::once(self.total_row).chain(self.change_row);
        for row in rows {
            for column in last_column + 1..=self.last_column {
                sheet.clear_cell(row, column);
            }
        }
        if self.total_row <= FIRST_ACCOUNT_ROW {
            return;
        }
        for column in self.last_date_column + 1..=last_column {
            sheet.set_formula(
                self.total_row,
                column,
                Formula::ColumnSum {
                    column,
                    first_row: FIRST_ACCOUNT_ROW,
                    last_row: self.total_row - 1,
                },
            );
            if let Some(row) = self.change_row {
                sheet.set_formula(
                    row,
                    column,
                    Formula::DayChange {
                        column,
                        total_row: self.total_row,
                    },
                );
            }
        }
    }
}

/// Пишет заголовок месяца: базовый столбец хранит последний день предыдущего месяца,
/// далее каждый день месяца. Возвращает последний столбец дат.
fn write_header(sheet: &mut dyn Sheet, month: NaiveDate) -> u32 {
    let first = month_start(month);
    let baseline = first.pred_opt().unwrap_or(first);
    sheet.set_cell(HEADER_ROW, FIRST_DATE_COLUMN, baseline.into());
    let mut column = FIRST_DATE_COLUMN;
    for date in first.iter_days().take_while(|d| d.month() == first.month()) {
        column += 1;
        sheet.set_cell(HEADER_ROW, column, date.into());
    }
    column
}

/// Создаёт первый месячный лист с нуля по начальным значениям счетов.
///
/// Значения пишутся и в базовый столбец, и в столбец дня `date`. Под счетами
/// строка «Total» с суммами по столбцам и строка дневных изменений. Существующий
/// лист того же месяца очищается и заполняется заново.
pub fn bootstrap_month_sheet(
    workbook: &mut dyn Workbook,
    date: NaiveDate,
    seeds: &[AccountSeed],
) -> Result<String, PortfolioError> {
    if seeds.is_empty() {
        return Err(PortfolioError::NoAccounts);
    }
    let name = find_month_sheet(workbook, date).unwrap_or_else(|| month_sheet_name(date));
    let sheet = if workbook.sheet(&name).is_some() {
        let sheet = workbook
            .sheet_mut(&name)
            .ok_or_else(|| PortfolioError::SheetNotFound { name: name.clone() })?;
        clear_sheet(sheet);
        sheet
    } else {
        workbook.add_sheet(&name)?
    };

    sheet.set_cell(HEADER_ROW, LABEL_COLUMN, "Account".into());
    let last_column = write_header(sheet, date);
    let day_column = FIRST_DATE_COLUMN + date.day();

    let mut row = FIRST_ACCOUNT_ROW;
    for seed in seeds {
        let value = CellValue::Number(money_to_f64(seed.value));
        sheet.set_cell(row, LABEL_COLUMN, seed.name.as_str().into());
        sheet.set_cell(row, FIRST_DATE_COLUMN, value.clone());
        sheet.set_cell(row, day_column, value);
        row += 1;
    }

    let last_account_row = row - 1;
    let total_row = row;
    sheet.set_cell(total_row, LABEL_COLUMN, "Total".into());
    sheet.set_cell(total_row + 1, LABEL_COLUMN, CHANGE_LABEL.into());
    for column in FIRST_DATE_COLUMN..=last_column {
        sheet.set_formula(
            total_row,
            column,
            Formula::ColumnSum {
                column,
                first_row: FIRST_ACCOUNT_ROW,
                last_row: last_account_row,
            },
        );
        if column > FIRST_DATE_COLUMN {
            sheet.set_formula(total_row + 1, column, Formula::DayChange { column, total_row });
        }
    }

    info!(sheet = %name, accounts = seeds.len(), "bootstrapped month sheet");
    Ok(name)
}

/// Очищает все использованные ячейки листа.
fn clear_sheet(sheet: &mut dyn Sheet) {
    let (last_row, last_column) = (sheet.last_row(), sheet.last_column());
    for row in 1..=last_row {
        for column in 1..=last_column {
            sheet.clear_cell(row, column);
        }
    }
}

/// Деньги в число ячейки.
pub(crate) fn money_to_f64(value: Money) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MemoryWorkbook;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Февраль 2026 с двумя счетами; последние данные 27 февраля.
    fn february_book() -> MemoryWorkbook {
        let mut book = MemoryWorkbook::new();
        let seeds = [
            AccountSeed {
                name: "Broker".into(),
                value: Decimal::from(1000),
            },
            AccountSeed {
                name: "Savings".into(),
                value: Decimal::from(500),
            },
        ];
        bootstrap_month_sheet(&mut book, d(2026, 2, 2), &seeds).unwrap();
        let sheet = book.sheet_mut("Data Over time February 2026").unwrap();
        // 27 февраля в столбце 2 + 27.
        sheet.set_cell(4, 29, 1100.0.into());
        sheet.set_cell(5, 29, 520.0.into());
        book
    }

    #[test]
    fn bootstrap_writes_header_seeds_and_formulas() {
        let book = february_book();
        let sheet = book.memory_sheet("Data Over time February 2026").unwrap();
        assert_eq!(sheet.cell(1, 2), CellValue::Date(d(2026, 1, 31)));
        assert_eq!(sheet.cell(1, 3), CellValue::Date(d(2026, 2, 1)));
        assert_eq!(sheet.cell(1, 30), CellValue::Date(d(2026, 2, 28)));
        assert_eq!(sheet.cell(1, 31), CellValue::Empty);
        assert_eq!(sheet.cell(4, 2), CellValue::Number(1000.0));
        assert_eq!(sheet.cell(4, 4), CellValue::Number(1000.0));
        assert_eq!(sheet.cell(6, 1).as_text(), Some("Total"));
        assert_eq!(
            sheet.formula(6, 3),
            Some(&Formula::ColumnSum {
                column: 3,
                first_row: 4,
                last_row: 5
            })
        );
        assert_eq!(
            sheet.formula(7, 3),
            Some(&Formula::DayChange {
                column: 3,
                total_row: 6
            })
        );
        assert!(sheet.formula(7, 2).is_none());

        let info = parse_sheet(sheet).unwrap();
        assert_eq!(info.date_columns.len(), 29);
        assert_eq!(info.account_rows.len(), 2);
    }

    #[test]
    fn bootstrap_requires_accounts() {
        let mut book = MemoryWorkbook::new();
        assert!(matches!(
            bootstrap_month_sheet(&mut book, d(2026, 2, 2), &[]),
            Err(PortfolioError::NoAccounts)
        ));
    }

    #[test]
    fn existing_month_is_returned_unchanged() {
        let mut book = february_book();
        let before = book.clone();
        let name = ensure_month_sheet(&mut book, d(2026, 2, 20)).unwrap();
        assert_eq!(name, "Data Over time February 2026");
        assert_eq!(book, before);
    }

    #[test]
    fn new_month_carries_latest_populated_column() {
        let mut book = february_book();
        let name = ensure_month_sheet(&mut book, d(2026, 3, 1)).unwrap();
        assert_eq!(name, "Data Over time March 2026");

        let sheet = book.memory_sheet(&name).unwrap();
        assert_eq!(sheet.cell(1, 2), CellValue::Date(d(2026, 2, 28)));
        assert_eq!(sheet.cell(1, 33), CellValue::Date(d(2026, 3, 31)));
        assert_eq!(sheet.cell(4, 2), CellValue::Number(1100.0));
        assert_eq!(sheet.cell(5, 2), CellValue::Number(520.0));
        for column in 3..=33 {
            assert!(sheet.cell(4, column).is_blank());
            assert!(sheet.cell(5, column).is_blank());
        }
        // Строка «Total» и формулы копируются как есть.
        assert_eq!(sheet.cell(6, 1).as_text(), Some("Total"));

        let info = parse_sheet(sheet).unwrap();
        assert_eq!(info.date_columns.len(), 32);
        assert_eq!(info.account_rows.len(), 2);
    }

    #[test]
    fn longer_month_extends_total_and_change_formulas() {
        let mut book = february_book();
        let name = ensure_month_sheet(&mut book, d(2026, 3, 10)).unwrap();
        let sheet = book.memory_sheet(&name).unwrap();
        for column in 3..=33 {
            assert_eq!(
                sheet.formula(6, column),
                Some(&Formula::ColumnSum {
                    column,
                    first_row: 4,
                    last_row: 5
                }),
                "total formula in column {column}"
            );
            assert_eq!(
                sheet.formula(7, column),
                Some(&Formula::DayChange {
                    column,
                    total_row: 6
                }),
                "change formula in column {column}"
            );
        }
        assert!(sheet.formula(6, 34).is_none());
    }

    #[test]
    fn shorter_month_clears_leftover_header_cells() {
        let mut book = MemoryWorkbook::new();
        let seeds = [AccountSeed {
            name: "Broker".into(),
            value: Decimal::from(1000),
        }];
        bootstrap_month_sheet(&mut book, d(2026, 1, 5), &seeds).unwrap();
        let name = ensure_month_sheet(&mut book, d(2026, 2, 1)).unwrap();
        let sheet = book.memory_sheet(&name).unwrap();
        assert_eq!(sheet.cell(1, 30), CellValue::Date(d(2026, 2, 28)));
        assert_eq!(sheet.cell(1, 31), CellValue::Empty);
        assert_eq!(sheet.cell(1, 33), CellValue::Empty);
        assert!(sheet.formula(5, 30).is_some());
        assert!(sheet.formula(5, 31).is_none());
        assert!(sheet.formula(6, 33).is_none());
        // 5 января: последний заполненный день.
        assert_eq!(sheet.cell(4, 2), CellValue::Number(1000.0));
    }

    #[test]
    fn picks_nearest_prior_month_by_date_not_order() {
        let mut book = february_book();
        let seeds = [AccountSeed {
            name: "Old".into(),
            value: Decimal::from(5),
        }];
        bootstrap_month_sheet(&mut book, d(2025, 11, 3), &seeds).unwrap();
        let name = ensure_month_sheet(&mut book, d(2026, 4, 10)).unwrap();
        let sheet = book.memory_sheet(&name).unwrap();
        assert_eq!(sheet.cell(4, 1).as_text(), Some("Broker"));
        assert_eq!(sheet.cell(1, 2), CellValue::Date(d(2026, 3, 31)));
    }

    #[test]
    fn no_prior_month_is_an_error() {
        let mut book = february_book();
        assert!(matches!(
            ensure_month_sheet(&mut book, d(2026, 1, 15)),
            Err(PortfolioError::NoPriorMonth { .. })
        ));
    }
}
