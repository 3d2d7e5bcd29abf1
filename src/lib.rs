#![warn(missing_docs)]
//! Библиотека для чтения книги дневных оценок портфеля: разбор месячных листов,
//! расчёт срезов и сводки финансового года, ввод значений за день.

pub mod app;
pub mod cli;
pub mod config;
mod dashboard;
mod entry;
mod error;
mod fy;
mod grid;
pub mod logging;
mod month;
mod parser;
pub mod render;
mod snapshot;
mod types;
mod utils;
mod xlsx;

pub use crate::dashboard::{Dashboard, latest_date_in_month, load_dashboard};
pub use crate::entry::{
    AddOutcome, DayEntry, Prompt, StdinPrompt, add_entries, default_entries, write_day_entries,
};
pub use crate::error::PortfolioError;
pub use crate::fy::{DASHBOARD_SHEET, extract_fy_summary, parse_fy_sheet};
pub use crate::grid::{
    CellValue, Formula, MemorySheet, MemoryWorkbook, Sheet, Workbook, find_sheet_ignore_case,
};
pub use crate::month::{bootstrap_month_sheet, ensure_month_sheet, find_month_sheet, month_sheets};
pub use crate::parser::{contiguous_run, parse_sheet};
pub use crate::snapshot::{RECENT_WINDOW, SnapshotBuilder};
pub use crate::types::*;
pub use crate::utils::{
    month_sheet_name, parse_amount, parse_date_arg, parse_month_arg, parse_month_sheet_name,
};
pub use crate::xlsx::XlsxWorkbook;
