//! Абстракция табличной книги: типизированные ячейки, листы и декларативные формулы.
//!
//! Алгоритмы разбора работают только через [`Sheet`] и [`Workbook`], поэтому их
//! можно проверять на [`MemoryWorkbook`] без файла `.xlsx`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::PortfolioError;

/// Типизированное значение ячейки.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// Пустая ячейка.
    #[default]
    Empty,
    /// Число.
    Number(f64),
    /// Текст.
    Text(String),
    /// Дата (число с форматом даты в контейнере).
    Date(NaiveDate),
}

impl CellValue {
    /// Пустая ячейка или строка из одних пробелов.
    #[inline]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) | Self::Date(_) => false,
        }
    }

    /// Числовое значение ячейки.
    #[inline]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Текст ячейки без окружающих пробелов.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.trim()),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// Формула, которую адаптер переводит в синтаксис своего контейнера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// Сумма столбца `column` по строкам `first_row..=last_row`.
    ColumnSum {
        /// Столбец суммы.
        column: u32,
        /// Первая строка диапазона.
        first_row: u32,
        /// Последняя строка диапазона.
        last_row: u32,
    },
    /// Изменение итога к предыдущему столбцу; ноль, если итог столбца нулевой.
    DayChange {
        /// Столбец текущего дня.
        column: u32,
        /// Строка итогов.
        total_row: u32,
    },
}

/// Лист с доступом к ячейкам по (строка, столбец), нумерация с 1.
pub trait Sheet {
    /// Имя листа.
    fn name(&self) -> &str;
    /// Значение ячейки; отсутствующая ячейка читается как [`CellValue::Empty`].
    fn cell(&self, row: u32, column: u32) -> CellValue;
    /// Последняя использованная строка (0 для пустого листа).
    fn last_row(&self) -> u32;
    /// Последний использованный столбец (0 для пустого листа).
    fn last_column(&self) -> u32;
    /// Записывает статическое значение.
    fn set_cell(&mut self, row: u32, column: u32, value: CellValue);
    /// Записывает формулу.
    fn set_formula(&mut self, row: u32, column: u32, formula: Formula);
    /// Очищает ячейку.
    fn clear_cell(&mut self, row: u32, column: u32);
}

/// Книга с листами, адресуемыми по имени.
pub trait Workbook {
    /// Имена листов в порядке книги.
    fn sheet_names(&self) -> Vec<String>;
    /// Лист по точному имени.
    fn sheet(&self, name: &str) -> Option<&dyn Sheet>;
    /// Изменяемый лист по точному имени.
    fn sheet_mut(&mut self, name: &str) -> Option<&mut dyn Sheet>;
    /// Добавляет пустой лист.
    fn add_sheet(&mut self, name: &str) -> Result<&mut dyn Sheet, PortfolioError>;
    /// Копирует лист `source` целиком под именем `new_name`.
    fn duplicate_sheet(
        &mut self,
        source: &str,
        new_name: &str,
    ) -> Result<&mut dyn Sheet, PortfolioError>;
}

/// Ищет лист по имени без учёта регистра и возвращает его точное имя.
pub fn find_sheet_ignore_case(workbook: &dyn Workbook, name: &str) -> Option<String> {
    workbook
        .sheet_names()
        .into_iter()
        .find(|candidate| candidate.trim().eq_ignore_ascii_case(name))
}

/// Лист в памяти.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    formulas: BTreeMap<(u32, u32), Formula>,
}

impl MemorySheet {
    /// Создаёт пустой лист.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Записанная формула ячейки.
    #[inline]
    pub fn formula(&self, row: u32, column: u32) -> Option<&Formula> {
        self.formulas.get(&(row, column))
    }
}

impl Sheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, row: u32, column: u32) -> CellValue {
        self.cells.get(&(row, column)).cloned().unwrap_or_default()
    }

    fn last_row(&self) -> u32 {
        self.cells
            .keys()
            .chain(self.formulas.keys())
            .map(|&(row, _)| row)
            .max()
            .unwrap_or(0)
    }

    fn last_column(&self) -> u32 {
        self.cells
            .keys()
            .chain(self.formulas.keys())
            .map(|&(_, column)| column)
            .max()
            .unwrap_or(0)
    }

    fn set_cell(&mut self, row: u32, column: u32, value: CellValue) {
        self.formulas.remove(&(row, column));
        if value == CellValue::Empty {
            self.cells.remove(&(row, column));
        } else {
            self.cells.insert((row, column), value);
        }
    }

    fn set_formula(&mut self, row: u32, column: u32, formula: Formula) {
        self.cells.remove(&(row, column));
        self.formulas.insert((row, column), formula);
    }

    fn clear_cell(&mut self, row: u32, column: u32) {
        self.cells.remove(&(row, column));
        self.formulas.remove(&(row, column));
    }
}

/// Книга в памяти.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
}

impl MemoryWorkbook {
    /// Создаёт книгу без листов.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет готовый лист.
    pub fn push(&mut self, sheet: MemorySheet) {
        self.sheets.push(sheet);
    }

    /// Конкретный лист, чтобы проверить записанные формулы.
    pub fn memory_sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn sheet(&self, name: &str) -> Option<&dyn Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s as &dyn Sheet)
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut dyn Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .map(|s| s as &mut dyn Sheet)
    }

    fn add_sheet(&mut self, name: &str) -> Result<&mut dyn Sheet, PortfolioError> {
        if self.sheets.iter().any(|s| s.name == name) {
            return Err(PortfolioError::SheetExists {
                name: name.to_string(),
            });
        }
        self.sheets.push(MemorySheet::new(name));
        let idx = self.sheets.len() - 1;
        Ok(&mut self.sheets[idx])
    }

    fn duplicate_sheet(
        &mut self,
        source: &str,
        new_name: &str,
    ) -> Result<&mut dyn Sheet, PortfolioError> {
        if self.sheets.iter().any(|s| s.name == new_name) {
            return Err(PortfolioError::SheetExists {
                name: new_name.to_string(),
            });
        }
        let mut copy = self
            .memory_sheet(source)
            .cloned()
            .ok_or_else(|| PortfolioError::SheetNotFound {
                name: source.to_string(),
            })?;
        copy.name = new_name.to_string();
        self.sheets.push(copy);
        let idx = self.sheets.len() - 1;
        Ok(&mut self.sheets[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sheet_tracks_used_range() {
        let mut sheet = MemorySheet::new("S");
        assert_eq!((sheet.last_row(), sheet.last_column()), (0, 0));
        sheet.set_cell(3, 2, 5.0.into());
        sheet.set_formula(7, 4, Formula::DayChange { column: 4, total_row: 6 });
        assert_eq!((sheet.last_row(), sheet.last_column()), (7, 4));
        sheet.clear_cell(7, 4);
        assert_eq!((sheet.last_row(), sheet.last_column()), (3, 2));
    }

    #[test]
    fn value_overwrites_formula() {
        let mut sheet = MemorySheet::new("S");
        sheet.set_formula(1, 1, Formula::ColumnSum { column: 1, first_row: 2, last_row: 3 });
        sheet.set_cell(1, 1, "Total".into());
        assert!(sheet.formula(1, 1).is_none());
        assert_eq!(sheet.cell(1, 1).as_text(), Some("Total"));
    }

    #[test]
    fn duplicate_copies_cells_and_rejects_existing_names() {
        let mut book = MemoryWorkbook::new();
        let sheet = book.add_sheet("A").unwrap();
        sheet.set_cell(1, 1, 10.0.into());
        book.duplicate_sheet("A", "B").unwrap();
        assert_eq!(book.sheet("B").unwrap().cell(1, 1), CellValue::Number(10.0));
        assert!(matches!(
            book.duplicate_sheet("A", "B"),
            Err(PortfolioError::SheetExists { .. })
        ));
        assert!(matches!(
            book.duplicate_sheet("missing", "C"),
            Err(PortfolioError::SheetNotFound { .. })
        ));
    }

    #[test]
    fn finds_sheet_ignoring_case() {
        let mut book = MemoryWorkbook::new();
        book.add_sheet("DashBoard").unwrap();
        assert_eq!(
            find_sheet_ignore_case(&book, "dashboard").as_deref(),
            Some("DashBoard")
        );
        assert!(find_sheet_ignore_case(&book, "Summary").is_none());
    }
}
