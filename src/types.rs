//! Доменные типы: разобранный лист, срезы по счетам и сводка финансового года.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::grid::Sheet;

/// Денежное значение, используем `Decimal` для точных расчётов.
pub type Money = Decimal;

/// Столбец листа, соответствующий одному календарному дню.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateColumn {
    /// Дата из заголовка.
    pub date: NaiveDate,
    /// Номер столбца (с 1).
    pub column: u32,
}

/// Строка листа с ежедневными значениями одного счёта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    /// Название счёта из первого столбца.
    pub name: String,
    /// Номер строки (с 1).
    pub row: u32,
}

/// Результат разбора месячного листа.
///
/// Пустые `date_columns` или `account_rows` не считаются ошибкой разбора:
/// вызывающий код сам решает, как сообщить об отсутствии данных.
#[derive(Clone)]
pub struct SheetInfo<'a> {
    /// Имя листа.
    pub name: String,
    /// Непрерывная последовательность дат по возрастанию.
    pub date_columns: Vec<DateColumn>,
    /// Строки счетов сверху вниз.
    pub account_rows: Vec<AccountRow>,
    /// Номер строки «Total».
    pub total_row: u32,
    /// Лист, из которого читаются значения.
    pub sheet: &'a dyn Sheet,
}

impl SheetInfo<'_> {
    /// Есть ли на листе и даты, и счета.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self.date_columns.is_empty() && !self.account_rows.is_empty()
    }

    /// Столбец для даты, если он есть на листе.
    #[inline]
    pub fn column_for(&self, date: NaiveDate) -> Option<u32> {
        self.date_columns
            .iter()
            .find(|dc| dc.date == date)
            .map(|dc| dc.column)
    }

    /// Дата столбца, если столбец распознан как дата.
    #[inline]
    pub fn date_of(&self, column: u32) -> Option<NaiveDate> {
        self.date_columns
            .iter()
            .find(|dc| dc.column == column)
            .map(|dc| dc.date)
    }
}

impl std::fmt::Debug for SheetInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetInfo")
            .field("name", &self.name)
            .field("date_columns", &self.date_columns)
            .field("account_rows", &self.account_rows)
            .field("total_row", &self.total_row)
            .finish_non_exhaustive()
    }
}

/// Изменение значения одного счёта за день.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Название счёта.
    pub name: String,
    /// Значение на выбранную дату.
    pub current: Money,
    /// Значение на предыдущую дату.
    pub previous: Money,
    /// Абсолютное изменение.
    pub change: Money,
    /// Относительное изменение (доля, не проценты); ноль при нулевой базе.
    pub change_pct: Decimal,
}

/// Изменение итога за один день для мини-графика.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyChange {
    /// День, на который посчитано изменение.
    pub date: NaiveDate,
    /// Изменение итога относительно предыдущего дня.
    pub change: Money,
}

/// Срез портфеля на дату.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Запрошенная дата.
    pub date: NaiveDate,
    /// Дата, из которой фактически взяты значения (с учётом переноса).
    pub effective_date: NaiveDate,
    /// Счета в порядке строк листа.
    pub accounts: Vec<AccountSnapshot>,
    /// Сумма по счетам.
    pub total: Money,
    /// Изменение итога за день.
    pub total_change: Money,
    /// Относительное изменение итога.
    pub total_change_pct: Decimal,
    /// Изменение с начала месяца.
    pub month_to_date: Money,
    /// Относительное изменение с начала месяца.
    pub month_to_date_pct: Decimal,
    /// Последние дневные изменения итога по возрастанию дат.
    pub recent_changes: Vec<DailyChange>,
    /// Имя листа.
    pub sheet_name: String,
}

/// Показатели одного месяца финансового года.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FyMetrics {
    /// Доходность за месяц (доля).
    pub ret: Option<Decimal>,
    /// Денежная оценка на конец месяца.
    pub cash: Option<Money>,
    /// Прибыль/убыток за месяц.
    pub pnl: Option<Money>,
}

impl FyMetrics {
    /// Есть ли хотя бы один показатель.
    #[inline]
    pub const fn any(&self) -> bool {
        self.ret.is_some() || self.cash.is_some() || self.pnl.is_some()
    }
}

/// Столбец месяца в таблице финансового года.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FyMonth {
    /// Подпись из заголовка.
    pub label: String,
    /// Номер месяца 1..=12.
    pub month: u32,
    /// Календарный год, если его удалось вывести из заголовка таблицы.
    pub year: Option<i32>,
    /// Значения показателей.
    pub metrics: FyMetrics,
}

/// Таблица финансового года с листа «Dashboard».
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FySummary {
    /// Заголовок таблицы.
    pub title: String,
    /// Месяцы в порядке столбцов.
    pub months: Vec<FyMonth>,
    /// Значения из столбца «Total», если он есть.
    pub totals: Option<FyMetrics>,
}

/// Итоги финансового года на выбранную дату. Не хранятся, считаются при отрисовке.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FyTotals {
    /// Подпись последнего месяца в срезе с начала года.
    pub through: Option<String>,
    /// Доходность с начала года.
    pub ytd_return: Option<Decimal>,
    /// Первая денежная оценка в срезе.
    pub ytd_cash_start: Option<Money>,
    /// Последняя денежная оценка в срезе.
    pub ytd_cash_latest: Option<Money>,
    /// Прибыль/убыток с начала года.
    pub ytd_pnl: Option<Money>,
    /// Доходность за весь год.
    pub year_return: Option<Decimal>,
    /// Денежная оценка за весь год.
    pub year_cash: Option<Money>,
    /// Прибыль/убыток за весь год.
    pub year_pnl: Option<Money>,
}

/// Начальное значение счёта при создании книги с нуля.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSeed {
    /// Название счёта.
    pub name: String,
    /// Стоимость на дату создания.
    pub value: Money,
}
