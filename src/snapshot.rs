//! Срез портфеля на дату: изменения по счетам, итог, MTD и последние дневные изменения.

use rust_decimal::Decimal;

use crate::types::{AccountSnapshot, DailyChange, Money, SheetInfo, Snapshot};
use crate::utils::ratio;

/// Сколько последних дневных изменений попадает в срез.
pub const RECENT_WINDOW: usize = 25;

/// Builder для расчёта [`Snapshot`] по разобранному листу.
///
/// # Пример
///
/// ```
/// # use portfolio_dashboard::{MemorySheet, Sheet, SnapshotBuilder, parse_sheet};
/// # use chrono::NaiveDate;
/// let mut sheet = MemorySheet::new("Data Over time January 2026");
/// sheet.set_cell(1, 2, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap().into());
/// sheet.set_cell(1, 3, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().into());
/// sheet.set_cell(4, 1, "Cash".into());
/// sheet.set_cell(4, 2, 1000.0.into());
/// sheet.set_cell(5, 1, "Total".into());
/// let info = parse_sheet(&sheet).unwrap();
/// let (snapshot, has_data) = SnapshotBuilder::new(&info).carry_forward(true).build(3);
/// assert!(!has_data);
/// assert_eq!(snapshot.total_change, rust_decimal::Decimal::ZERO);
/// ```
pub struct SnapshotBuilder<'s, 'a> {
    info: &'s SheetInfo<'a>,
    carry_forward: bool,
    window: usize,
}

impl<'s, 'a> SnapshotBuilder<'s, 'a> {
    /// Создаёт builder без переноса значений в пустые дни.
    #[inline]
    pub const fn new(info: &'s SheetInfo<'a>) -> Self {
        Self {
            info,
            carry_forward: false,
            window: RECENT_WINDOW,
        }
    }

    /// Подставлять ли ближайший заполненный день, если в выбранном нет данных.
    #[inline]
    pub const fn carry_forward(mut self, enabled: bool) -> Self {
        self.carry_forward = enabled;
        self
    }

    /// Размер окна последних дневных изменений.
    #[inline]
    pub const fn window(mut self, days: usize) -> Self {
        self.window = days;
        self
    }

    /// Считает срез для столбца `column` и сообщает, есть ли в нём данные.
    pub fn build(&self, column: u32) -> (Snapshot, bool) {
        let info = self.info;
        let has_data = info.has_data(column);
        let carried = self.carry_forward && !has_data;

        let effective = if carried {
            info.previous_populated(column).unwrap_or(column)
        } else {
            column
        };
        // Без переноса пустой предыдущий день читается как ноль; с переносом
        // берётся ближайший заполненный, как в `day_total`.
        let previous = if self.carry_forward {
            info.previous_populated(effective)
        } else {
            info.previous_column(effective)
        };

        let accounts: Vec<AccountSnapshot> = info
            .account_rows
            .iter()
            .map(|account| {
                let current = info.value(account.row, effective);
                // Пустой день с переносом показывает нулевое изменение, а не
                // разницу с устаревшими данными.
                let prev = if carried {
                    current
                } else {
                    previous.map_or(Decimal::ZERO, |p| info.value(account.row, p))
                };
                let change = current - prev;
                AccountSnapshot {
                    name: account.name.clone(),
                    current,
                    previous: prev,
                    change,
                    change_pct: ratio(change, prev),
                }
            })
            .collect();

        let total: Money = accounts.iter().map(|a| a.current).sum();
        let previous_total: Money = accounts.iter().map(|a| a.previous).sum();
        let total_change = total - previous_total;

        let baseline = info
            .date_columns
            .first()
            .map_or(Decimal::ZERO, |first| info.total(first.column));
        let month_to_date = total - baseline;

        let snapshot = Snapshot {
            date: info.date_of(column).unwrap_or_default(),
            effective_date: info.date_of(effective).unwrap_or_default(),
            accounts,
            total,
            total_change,
            total_change_pct: ratio(total_change, previous_total),
            month_to_date,
            month_to_date_pct: ratio(month_to_date, baseline),
            recent_changes: self.recent_changes(column),
            sheet_name: info.name.clone(),
        };
        (snapshot, has_data)
    }

    /// Итог дня с учётом переноса из ближайшего заполненного дня.
    fn day_total(&self, column: u32) -> Money {
        let info = self.info;
        if self.carry_forward && !info.has_data(column) {
            info.previous_populated(column)
                .map_or(Decimal::ZERO, |c| info.total(c))
        } else {
            info.total(column)
        }
    }

    /// Попарные изменения итога по последним `window + 1` дням не позже `column`.
    fn recent_changes(&self, column: u32) -> Vec<DailyChange> {
        let days: Vec<_> = self
            .info
            .date_columns
            .iter()
            .filter(|dc| dc.column <= column)
            .collect();
        let start = days.len().saturating_sub(self.window + 1);
        let totals: Vec<_> = days[start..]
            .iter()
            .map(|dc| (dc.date, self.day_total(dc.column)))
            .collect();
        totals
            .windows(2)
            .map(|pair| DailyChange {
                date: pair[1].0,
                change: pair[1].1 - pair[0].1,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{MemorySheet, Sheet};
    use crate::parser::parse_sheet;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Лист января 2026: столбцы 2..=33 с 31.12.2025 по 31.01.2026.
    fn january() -> MemorySheet {
        let mut sheet = MemorySheet::new("Data Over time January 2026");
        let mut date = d(2025, 12, 31);
        for column in 2..=33 {
            sheet.set_cell(1, column, date.into());
            date = date.succ_opt().unwrap();
        }
        sheet.set_cell(4, 1, "Cash".into());
        sheet.set_cell(4, 2, 1000.0.into());
        sheet.set_cell(4, 18, 1050.0.into());
        sheet.set_cell(5, 1, "Total".into());
        sheet
    }

    #[test]
    fn view_without_carry_reads_blank_previous_as_zero() {
        let sheet = january();
        let info = parse_sheet(&sheet).unwrap();
        let (snap, has_data) = SnapshotBuilder::new(&info).build(18);

        assert!(has_data);
        assert_eq!(snap.date, d(2026, 1, 16));
        let cash = &snap.accounts[0];
        assert_eq!(cash.current, dec("1050"));
        assert_eq!(cash.previous, Decimal::ZERO);
        assert_eq!(cash.change, dec("1050"));
        assert_eq!(cash.change_pct, Decimal::ZERO);
        assert_eq!(snap.total, dec("1050"));
        assert_eq!(snap.total_change_pct, Decimal::ZERO);
        assert_eq!(snap.month_to_date, dec("50"));
        assert_eq!(snap.month_to_date_pct, dec("0.05"));
    }

    #[test]
    fn baseline_column_has_zero_month_to_date() {
        let sheet = january();
        let info = parse_sheet(&sheet).unwrap();
        let (snap, _) = SnapshotBuilder::new(&info).build(2);
        assert_eq!(snap.month_to_date, Decimal::ZERO);
        assert_eq!(snap.month_to_date_pct, Decimal::ZERO);
    }

    #[test]
    fn carry_forward_on_empty_day_shows_no_change() {
        let sheet = january();
        let info = parse_sheet(&sheet).unwrap();
        let (snap, has_data) = SnapshotBuilder::new(&info).carry_forward(true).build(20);

        assert!(!has_data);
        assert_eq!(snap.effective_date, d(2026, 1, 16));
        assert!(snap.accounts.iter().all(|a| a.change.is_zero()));
        assert_eq!(snap.total, dec("1050"));
        assert_eq!(snap.total_change, Decimal::ZERO);
        assert_eq!(snap.month_to_date, dec("50"));
    }

    #[test]
    fn carry_forward_reads_previous_day_from_last_populated() {
        let sheet = january();
        let info = parse_sheet(&sheet).unwrap();
        let (snap, has_data) = SnapshotBuilder::new(&info).carry_forward(true).build(18);

        assert!(has_data);
        let cash = &snap.accounts[0];
        assert_eq!(cash.previous, dec("1000"));
        assert_eq!(cash.change, dec("50"));
        assert_eq!(cash.change_pct, dec("0.05"));
        assert_eq!(snap.total_change, dec("50"));
        assert_eq!(snap.total_change, snap.recent_changes.last().unwrap().change);
    }

    #[test]
    fn carry_forward_without_earlier_data_renders_zero() {
        let mut sheet = january();
        sheet.clear_cell(4, 2);
        sheet.set_cell(4, 3, 10.0.into());
        sheet.clear_cell(4, 18);
        let info = parse_sheet(&sheet).unwrap();
        // Нет строк счетов: значение в базовом столбце пустое.
        assert!(info.account_rows.is_empty());
        let (snap, has_data) = SnapshotBuilder::new(&info).carry_forward(true).build(2);
        assert!(!has_data);
        assert_eq!(snap.total, Decimal::ZERO);
    }

    #[test]
    fn percent_change_uses_previous_day() {
        let mut sheet = january();
        sheet.set_cell(4, 17, 1000.0.into());
        let info = parse_sheet(&sheet).unwrap();
        let (snap, _) = SnapshotBuilder::new(&info).build(18);
        assert_eq!(snap.total_change, dec("50"));
        assert_eq!(snap.total_change_pct, dec("0.05"));
        assert_eq!(snap.accounts[0].change_pct, dec("0.05"));
    }

    #[test]
    fn recent_changes_are_bounded_and_ascending() {
        let mut sheet = january();
        for column in 3..=33 {
            sheet.set_cell(4, column, f64::from(1000 + column).into());
        }
        let info = parse_sheet(&sheet).unwrap();
        assert_eq!(info.date_columns.last().unwrap().date, d(2026, 1, 31));
        let (snap, _) = SnapshotBuilder::new(&info).build(33);
        assert_eq!(snap.recent_changes.len(), RECENT_WINDOW);
        assert_eq!(snap.recent_changes.last().unwrap().date, d(2026, 1, 31));
        assert!(snap.recent_changes.iter().all(|c| c.change == Decimal::ONE));

        let (early, _) = SnapshotBuilder::new(&info).window(3).build(4);
        assert_eq!(early.recent_changes.len(), 2);
        assert_eq!(early.recent_changes[0].change, dec("3"));
    }

    #[test]
    fn recent_changes_carry_empty_days_when_requested() {
        let sheet = january();
        let info = parse_sheet(&sheet).unwrap();
        let (plain, _) = SnapshotBuilder::new(&info).window(3).build(19);
        let changes: Vec<_> = plain.recent_changes.iter().map(|c| c.change).collect();
        assert_eq!(changes, [Decimal::ZERO, dec("1050"), dec("-1050")]);

        let (carried, _) = SnapshotBuilder::new(&info).carry_forward(true).window(3).build(19);
        let changes: Vec<_> = carried.recent_changes.iter().map(|c| c.change).collect();
        assert_eq!(changes, [Decimal::ZERO, dec("50"), Decimal::ZERO]);
    }
}
