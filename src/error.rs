//! Ошибки чтения книги, разбора листов и ввода пользователя.

use chrono::NaiveDate;

/// Ошибка разбора книги или выполнения команды.
#[derive(thiserror::Error, Debug)]
pub enum PortfolioError {
    /// Ошибка ввода-вывода (файл, терминал).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Ошибка библиотеки чтения/записи `.xlsx`.
    #[error("Workbook error: {0}")]
    Workbook(String),
    /// Файл книги не найден.
    #[error("Workbook '{path}' not found")]
    WorkbookNotFound {
        /// Путь к файлу.
        path: String,
    },
    /// На листе нет строки «Total».
    #[error("Sheet '{sheet}' has no 'Total' row")]
    MissingTotalRow {
        /// Имя листа.
        sheet: String,
    },
    /// Нет предыдущего месячного листа для копирования.
    #[error("No prior month sheet to copy for '{target}'")]
    NoPriorMonth {
        /// Имя листа, который требовалось создать.
        target: String,
    },
    /// Лист с таким именем уже существует.
    #[error("Sheet '{name}' already exists")]
    SheetExists {
        /// Имя листа.
        name: String,
    },
    /// Лист не найден.
    #[error("Sheet '{name}' not found")]
    SheetNotFound {
        /// Имя листа.
        name: String,
    },
    /// На листе нет столбца для даты.
    #[error("Sheet '{sheet}' has no column for {date}")]
    DateNotInSheet {
        /// Запрошенная дата.
        date: NaiveDate,
        /// Имя листа.
        sheet: String,
    },
    /// На листе не удалось распознать даты или счета.
    #[error("Sheet '{sheet}' has no recognizable dates or accounts")]
    NoRecognizableData {
        /// Имя листа.
        sheet: String,
    },
    /// Не задан ни один счёт.
    #[error("At least one account is required")]
    NoAccounts,
    /// Некорректная дата.
    #[error("Invalid date '{value}', expected yyyy-MM-dd")]
    InvalidDate {
        /// Исходное значение.
        value: String,
    },
    /// Некорректный месяц.
    #[error("Invalid month '{value}', expected yyyy-MM")]
    InvalidMonth {
        /// Исходное значение.
        value: String,
    },
    /// Некорректная сумма.
    #[error("Invalid amount '{value}'")]
    InvalidAmount {
        /// Исходное значение.
        value: String,
    },
    /// Отрицательная сумма.
    #[error("Amount must not be negative: '{value}'")]
    NegativeAmount {
        /// Исходное значение.
        value: String,
    },
}

