//! Данные панели на выбранную дату: срез месячного листа, сводка FY и статус.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::error::PortfolioError;
use crate::fy::extract_fy_summary;
use crate::grid::Workbook;
use crate::month::find_month_sheet;
use crate::parser::parse_sheet;
use crate::snapshot::SnapshotBuilder;
use crate::types::{FySummary, Snapshot};
use crate::utils::month_name;

/// Всё, что нужно для отрисовки панели.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// Выбранная дата.
    pub date: NaiveDate,
    /// Срез и признак наличия данных в столбце даты.
    pub snapshot: Option<(Snapshot, bool)>,
    /// Сводка финансового года с листа «Dashboard».
    pub fy: Option<FySummary>,
    /// Сообщение о деградированном состоянии.
    pub status: Option<String>,
    /// Найден ли лист месяца выбранной даты.
    pub month_found: bool,
}

impl Dashboard {
    /// Панель без данных с сообщением.
    pub fn empty(date: NaiveDate, status: impl Into<String>) -> Self {
        Self {
            date,
            snapshot: None,
            fy: None,
            status: Some(status.into()),
            month_found: false,
        }
    }
}

/// Собирает панель на дату.
///
/// Отсутствие листа месяца, нераспознанный лист, дата вне листа и пустой
/// столбец дают панель со статусом; ошибкой остаётся только структурная
/// проблема листа (нет строки «Total»).
pub fn load_dashboard(
    workbook: &dyn Workbook,
    date: NaiveDate,
    carry_forward: bool,
) -> Result<Dashboard, PortfolioError> {
    let mut dashboard = Dashboard {
        date,
        snapshot: None,
        fy: extract_fy_summary(workbook),
        status: None,
        month_found: false,
    };

    let Some(name) = find_month_sheet(workbook, date) else {
        dashboard.status = Some(format!(
            "No sheet for {} {}",
            month_name(date.month()),
            date.year()
        ));
        return Ok(dashboard);
    };
    dashboard.month_found = true;

    let sheet = workbook
        .sheet(&name)
        .ok_or_else(|| PortfolioError::SheetNotFound { name: name.clone() })?;
    let info = parse_sheet(sheet)?;
    if !info.is_usable() {
        dashboard.status = Some(PortfolioError::NoRecognizableData { sheet: name }.to_string());
        return Ok(dashboard);
    }
    let Some(column) = info.column_for(date) else {
        dashboard.status = Some(PortfolioError::DateNotInSheet { date, sheet: name }.to_string());
        return Ok(dashboard);
    };

    let (snapshot, has_data) = SnapshotBuilder::new(&info)
        .carry_forward(carry_forward)
        .build(column);
    if !has_data {
        dashboard.status = Some(if snapshot.effective_date == date {
            format!("No entries for {date}")
        } else {
            format!(
                "No entries for {date}, showing {}",
                snapshot.effective_date
            )
        });
    }
    debug!(%date, sheet = %name, has_data, "loaded dashboard");
    dashboard.snapshot = Some((snapshot, has_data));
    Ok(dashboard)
}

/// Дата для `view --month`: последний заполненный день листа месяца, иначе
/// последний столбец даты. Без листа или распознанных дат возвращает `month`.
pub fn latest_date_in_month(
    workbook: &dyn Workbook,
    month: NaiveDate,
) -> Result<NaiveDate, PortfolioError> {
    let Some(name) = find_month_sheet(workbook, month) else {
        return Ok(month);
    };
    let Some(sheet) = workbook.sheet(&name) else {
        return Ok(month);
    };
    let info = parse_sheet(sheet)?;
    Ok(info
        .latest_populated()
        .and_then(|column| info.date_of(column))
        .unwrap_or(month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MemorySheet, MemoryWorkbook, Sheet};
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> MemoryWorkbook {
        let mut sheet = MemorySheet::new("Data Over time January 2026");
        sheet.set_cell(1, 2, date(2025, 12, 31).into());
        for day in 1..=31 {
            sheet.set_cell(1, 2 + day, date(2026, 1, day).into());
        }
        sheet.set_cell(4, 1, "Cash".into());
        sheet.set_cell(4, 2, 1000.0.into());
        sheet.set_cell(4, 18, 1050.0.into());
        sheet.set_cell(5, 1, "Total".into());
        let mut book = MemoryWorkbook::new();
        book.push(sheet);
        book
    }

    #[test]
    fn view_without_carry_forward_reads_blank_previous_as_zero() {
        let book = january();
        let dashboard = load_dashboard(&book, date(2026, 1, 16), false).unwrap();
        let (snapshot, has_data) = dashboard.snapshot.unwrap();
        assert!(has_data);
        assert!(dashboard.month_found);
        assert_eq!(dashboard.status, None);
        assert_eq!(snapshot.total, Decimal::from(1050));
        assert_eq!(snapshot.accounts[0].previous, Decimal::ZERO);
        assert_eq!(snapshot.accounts[0].change, Decimal::from(1050));
        assert_eq!(snapshot.month_to_date, Decimal::from(50));
    }

    #[test]
    fn empty_day_reports_carried_date() {
        let book = january();
        let dashboard = load_dashboard(&book, date(2026, 1, 20), true).unwrap();
        let (snapshot, has_data) = dashboard.snapshot.unwrap();
        assert!(!has_data);
        assert_eq!(snapshot.effective_date, date(2026, 1, 16));
        assert_eq!(
            dashboard.status.as_deref(),
            Some("No entries for 2026-01-20, showing 2026-01-16")
        );
    }

    #[test]
    fn missing_month_is_soft() {
        let book = january();
        let dashboard = load_dashboard(&book, date(2026, 2, 3), false).unwrap();
        assert!(!dashboard.month_found);
        assert!(dashboard.snapshot.is_none());
        assert_eq!(dashboard.status.as_deref(), Some("No sheet for February 2026"));
    }

    #[test]
    fn month_selection_uses_latest_populated_day() {
        let book = january();
        assert_eq!(
            latest_date_in_month(&book, date(2026, 1, 1)).unwrap(),
            date(2026, 1, 16)
        );
        assert_eq!(
            latest_date_in_month(&book, date(2026, 4, 1)).unwrap(),
            date(2026, 4, 1)
        );
    }

    #[test]
    fn missing_total_row_is_an_error() {
        let mut sheet = MemorySheet::new("Data Over time January 2026");
        sheet.set_cell(1, 2, date(2026, 1, 1).into());
        let mut book = MemoryWorkbook::new();
        book.push(sheet);
        assert!(matches!(
            load_dashboard(&book, date(2026, 1, 1), false),
            Err(PortfolioError::MissingTotalRow { .. })
        ));
    }
}
