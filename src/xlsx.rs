//! Адаптер книги `.xlsx` поверх `umya-spreadsheet`.

use std::path::Path;

use tracing::{debug, info};
use umya_spreadsheet::helper::coordinate::string_from_column_index;
use umya_spreadsheet::{Cell, Spreadsheet, Worksheet};

use crate::error::PortfolioError;
use crate::grid::{CellValue, Formula, Sheet, Workbook};
use crate::utils::{date_from_serial, serial_from_date};

/// Формат, которым записываются даты заголовка.
const DATE_FORMAT: &str = "yyyy-mm-dd";

/// Книга `.xlsx`, полностью загруженная в память.
pub struct XlsxWorkbook {
    book: Spreadsheet,
}

impl std::fmt::Debug for XlsxWorkbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxWorkbook")
            .field("sheets", &self.sheet_names())
            .finish()
    }
}

impl XlsxWorkbook {
    /// Читает книгу из файла.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PortfolioError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PortfolioError::WorkbookNotFound {
                path: path.display().to_string(),
            });
        }
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|err| PortfolioError::Workbook(err.to_string()))?;
        debug!(path = %path.display(), "opened workbook");
        Ok(Self { book })
    }

    /// Создаёт книгу без листов.
    #[inline]
    pub fn create() -> Self {
        Self {
            book: umya_spreadsheet::new_file_empty_worksheet(),
        }
    }

    /// Открывает книгу, если файл есть, иначе создаёт пустую.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self, PortfolioError> {
        match Self::open(path) {
            Err(PortfolioError::WorkbookNotFound { .. }) => Ok(Self::create()),
            other => other,
        }
    }

    /// Сохраняет книгу одной записью.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PortfolioError> {
        let path = path.as_ref();
        umya_spreadsheet::writer::xlsx::write(&self.book, path)
            .map_err(|err| PortfolioError::Workbook(err.to_string()))?;
        info!(path = %path.display(), "saved workbook");
        Ok(())
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect()
    }

    fn sheet(&self, name: &str) -> Option<&dyn Sheet> {
        self.book
            .get_sheet_by_name(name)
            .map(|sheet| sheet as &dyn Sheet)
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut dyn Sheet> {
        self.book
            .get_sheet_by_name_mut(name)
            .map(|sheet| sheet as &mut dyn Sheet)
    }

    fn add_sheet(&mut self, name: &str) -> Result<&mut dyn Sheet, PortfolioError> {
        if self.book.get_sheet_by_name(name).is_some() {
            return Err(PortfolioError::SheetExists {
                name: name.to_string(),
            });
        }
        let sheet = self
            .book
            .new_sheet(name)
            .map_err(|err| PortfolioError::Workbook(err.to_string()))?;
        Ok(sheet)
    }

    fn duplicate_sheet(
        &mut self,
        source: &str,
        new_name: &str,
    ) -> Result<&mut dyn Sheet, PortfolioError> {
        let cells: Vec<Cell> = self
            .book
            .get_sheet_by_name(source)
            .ok_or_else(|| PortfolioError::SheetNotFound {
                name: source.to_string(),
            })?
            .get_cell_collection()
            .into_iter()
            .cloned()
            .collect();
        if self.book.get_sheet_by_name(new_name).is_some() {
            return Err(PortfolioError::SheetExists {
                name: new_name.to_string(),
            });
        }
        // Новый лист регистрируется книгой, чтобы у копии был свой идентификатор.
        let sheet = self
            .book
            .new_sheet(new_name)
            .map_err(|err| PortfolioError::Workbook(err.to_string()))?;
        for cell in cells {
            sheet.set_cell(cell);
        }
        debug!(source, target = new_name, "duplicated sheet");
        Ok(sheet)
    }
}

/// Код числового формата ячейки, если он задан и отличается от «General».
fn number_format(cell: &Cell) -> Option<&str> {
    cell.get_style()
        .get_number_format()
        .map(|fmt| fmt.get_format_code())
        .filter(|code| !code.eq_ignore_ascii_case("general"))
}

/// Похож ли формат на формат даты: есть день или год вне кавычек.
///
/// Секции в квадратных скобках (`[Red]`, `[$-409]`) и символы после `\`, `_` и `*`
/// литеральные и не считаются.
fn is_date_format(code: &str) -> bool {
    let mut chars = code.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                chars.by_ref().find(|&c| c == '"');
            }
            '[' => {
                chars.by_ref().find(|&c| c == ']');
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            'd' | 'D' | 'y' | 'Y' => return true,
            _ => {}
        }
    }
    false
}

/// Переводит ячейку в типизированное значение.
fn cell_value(cell: &Cell) -> CellValue {
    let raw = cell.get_value();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Some(number) = trimmed.parse::<f64>().ok().filter(|n| n.is_finite()) {
        if number_format(cell).is_some_and(is_date_format) {
            if let Some(date) = date_from_serial(number) {
                return CellValue::Date(date);
            }
        }
        return CellValue::Number(number);
    }
    CellValue::Text(raw.to_string())
}

/// A1-ссылка.
fn reference(column: u32, row: u32) -> String {
    format!("{}{row}", string_from_column_index(&column))
}

/// Текст формулы в синтаксисе Excel (без ведущего `=`).
fn formula_text(formula: Formula) -> String {
    match formula {
        Formula::ColumnSum {
            column,
            first_row,
            last_row,
        } => format!(
            "SUM({}:{})",
            reference(column, first_row),
            reference(column, last_row)
        ),
        Formula::DayChange { column, total_row } => {
            let current = reference(column, total_row);
            let previous = reference(column.saturating_sub(1).max(1), total_row);
            format!("IF({current}=0,0,{current}-{previous})")
        }
    }
}

impl Sheet for Worksheet {
    fn name(&self) -> &str {
        self.get_name()
    }

    fn cell(&self, row: u32, column: u32) -> CellValue {
        self.get_cell((column, row))
            .map_or(CellValue::Empty, cell_value)
    }

    fn last_row(&self) -> u32 {
        self.get_highest_column_and_row().1
    }

    fn last_column(&self) -> u32 {
        self.get_highest_column_and_row().0
    }

    fn set_cell(&mut self, row: u32, column: u32, value: CellValue) {
        let cell = self.get_cell_mut((column, row));
        match value {
            CellValue::Empty => {
                cell.set_blank();
            }
            CellValue::Number(number) => {
                cell.set_value_number(number);
            }
            CellValue::Text(text) => {
                cell.set_value_string(text);
            }
            CellValue::Date(date) => {
                cell.set_value_number(serial_from_date(date));
                cell.get_style_mut()
                    .get_number_format_mut()
                    .set_format_code(DATE_FORMAT);
            }
        }
    }

    fn set_formula(&mut self, row: u32, column: u32, formula: Formula) {
        self.get_cell_mut((column, row))
            .set_formula(formula_text(formula));
    }

    fn clear_cell(&mut self, row: u32, column: u32) {
        if self.get_cell((column, row)).is_some() {
            self.get_cell_mut((column, row)).set_blank();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formulas_use_a1_references() {
        assert_eq!(
            formula_text(Formula::ColumnSum {
                column: 3,
                first_row: 4,
                last_row: 6
            }),
            "SUM(C4:C6)"
        );
        assert_eq!(
            formula_text(Formula::DayChange {
                column: 28,
                total_row: 7
            }),
            "IF(AB7=0,0,AB7-AA7)"
        );
    }

    #[test]
    fn date_formats_are_recognized() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("d-mmm"));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("0.00\" days\""));
        assert!(!is_date_format("#,##0.00;[Red]-#,##0.00"));
        assert!(!is_date_format("[Blue]0\\d"));
        assert!(!is_date_format("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"));
        assert!(is_date_format("[$-409]d-mmm-yy"));
        assert!(is_date_format("[Red]yyyy-mm-dd"));
    }

    #[test]
    fn worksheet_round_trips_typed_cells() {
        let mut book = XlsxWorkbook::create();
        let sheet = book.add_sheet("Data Over time January 2026").unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        sheet.set_cell(1, 2, date.into());
        sheet.set_cell(4, 1, "Cash".into());
        sheet.set_cell(4, 2, 1050.5.into());

        let sheet = book.sheet("Data Over time January 2026").unwrap();
        assert_eq!(sheet.cell(1, 2), CellValue::Date(date));
        assert_eq!(sheet.cell(4, 1), CellValue::Text("Cash".into()));
        assert_eq!(sheet.cell(4, 2), CellValue::Number(1050.5));
        assert_eq!(sheet.cell(9, 9), CellValue::Empty);
        assert_eq!((sheet.last_row(), sheet.last_column()), (4, 2));
    }

    #[test]
    fn currency_formatted_amount_stays_a_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("currency.xlsx");
        let mut book = XlsxWorkbook::create();
        book.add_sheet("Data Over time January 2026").unwrap();
        let sheet = book
            .book
            .get_sheet_by_name_mut("Data Over time January 2026")
            .unwrap();
        let cell = sheet.get_cell_mut((2u32, 4u32));
        cell.set_value_number(1000.0);
        cell.get_style_mut()
            .get_number_format_mut()
            .set_format_code("#,##0.00;[Red]-#,##0.00");
        book.save(&path).unwrap();

        let book = XlsxWorkbook::open(&path).unwrap();
        let sheet = book.sheet("Data Over time January 2026").unwrap();
        assert_eq!(sheet.cell(4, 2), CellValue::Number(1000.0));
    }

    #[test]
    fn duplicate_copies_values_into_new_sheet() {
        let mut book = XlsxWorkbook::create();
        book.add_sheet("A").unwrap().set_cell(2, 3, "x".into());
        book.duplicate_sheet("A", "B").unwrap();
        assert_eq!(book.sheet_names(), ["A", "B"]);
        assert_eq!(book.sheet("B").unwrap().cell(2, 3), CellValue::Text("x".into()));
        assert!(matches!(
            book.add_sheet("B"),
            Err(PortfolioError::SheetExists { .. })
        ));
    }
}
