//! Интерактивный режим: состояние выбора даты, переходы по клавишам и цикл ввода.

use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType};
use tracing::{debug, warn};

use crate::config::Config;
use crate::dashboard::{Dashboard, load_dashboard};
use crate::entry::{AddOutcome, Prompt, StdinPrompt, add_entries};
use crate::error::PortfolioError;
use crate::render::{RenderOptions, render_dashboard};
use crate::utils::shift_months;
use crate::xlsx::XlsxWorkbook;

/// Событие ввода в интерактивном режиме.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// На день назад.
    PreviousDay,
    /// На день вперёд.
    NextDay,
    /// На месяц назад.
    PreviousMonth,
    /// На месяц вперёд.
    NextMonth,
    /// К сегодняшней дате.
    Today,
    /// Ввести значения за выбранный день.
    Add,
    /// Перечитать книгу.
    Refresh,
    /// Выйти.
    Quit,
}

/// Что сделать после перехода.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    /// Перерисовать панель.
    Redraw,
    /// Запустить ввод значений за выбранную дату.
    Add,
    /// Завершить цикл.
    Quit,
}

/// Состояние интерактивной сессии.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// Выбранная дата.
    pub selected: NaiveDate,
    /// Сообщение, которое покажется при следующей отрисовке.
    pub status: Option<String>,
    /// Есть ли лист месяца выбранной даты.
    pub month_found: bool,
}

impl UiState {
    /// Начальное состояние.
    pub const fn new(selected: NaiveDate) -> Self {
        Self {
            selected,
            status: None,
            month_found: false,
        }
    }

    /// Применяет событие к состоянию.
    pub fn apply(&mut self, event: UiEvent, today: NaiveDate) -> UiAction {
        let selected = match event {
            UiEvent::PreviousDay => self.selected.pred_opt(),
            UiEvent::NextDay => self.selected.succ_opt(),
            UiEvent::PreviousMonth => Some(shift_months(self.selected, -1)),
            UiEvent::NextMonth => Some(shift_months(self.selected, 1)),
            UiEvent::Today => Some(today),
            UiEvent::Refresh => return UiAction::Redraw,
            UiEvent::Add => return UiAction::Add,
            UiEvent::Quit => return UiAction::Quit,
        };
        if let Some(selected) = selected {
            self.selected = selected;
        }
        self.status = None;
        UiAction::Redraw
    }
}

/// Переводит нажатие клавиши в событие.
pub fn event_for_key(key: KeyEvent) -> Option<UiEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UiEvent::Quit);
    }
    let event = match key.code {
        KeyCode::Left | KeyCode::Char('h') => UiEvent::PreviousDay,
        KeyCode::Right | KeyCode::Char('l') => UiEvent::NextDay,
        KeyCode::Up | KeyCode::PageUp | KeyCode::Char('k') => UiEvent::PreviousMonth,
        KeyCode::Down | KeyCode::PageDown | KeyCode::Char('j') => UiEvent::NextMonth,
        KeyCode::Char('t') => UiEvent::Today,
        KeyCode::Char('a') => UiEvent::Add,
        KeyCode::Char('r') => UiEvent::Refresh,
        KeyCode::Char('q') | KeyCode::Esc => UiEvent::Quit,
        _ => return None,
    };
    Some(event)
}

/// Открывает книгу (или создаёт пустую), вводит значения за день и сохраняет
/// файл, если что-то изменилось.
pub fn add_to_file(
    path: &Path,
    date: Option<NaiveDate>,
    today: NaiveDate,
    prompt: &mut dyn Prompt,
) -> Result<AddOutcome, PortfolioError> {
    let mut book = XlsxWorkbook::open_or_create(path)?;
    let outcome = add_entries(&mut book, date, today, prompt)?;
    if outcome.changed() {
        book.save(path)?;
    }
    Ok(outcome)
}

/// Текст статуса после ввода. Ошибки ввода показываются в панели, наружу
/// выходят только ошибки ввода-вывода.
fn add_status(result: Result<AddOutcome, PortfolioError>) -> Result<String, PortfolioError> {
    match result {
        Ok(outcome) => Ok(outcome.to_string()),
        Err(err @ PortfolioError::Io(_)) => Err(err),
        Err(err) => {
            warn!(%err, "add failed");
            Ok(err.to_string())
        }
    }
}

/// Raw-режим терминала, выключается при drop.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Ждёт клавишу, у которой есть событие. Raw-режим держится только на время ожидания.
fn next_event() -> Result<UiEvent, PortfolioError> {
    let _raw = RawMode::enable()?;
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(event) = event_for_key(key) {
                    return Ok(event);
                }
            }
            Event::Resize(..) => return Ok(UiEvent::Refresh),
            _ => {}
        }
    }
}

/// Читает книгу заново и собирает панель; отсутствующий файл не ошибка.
fn load(config: &Config, date: NaiveDate) -> Result<Dashboard, PortfolioError> {
    match XlsxWorkbook::open(&config.file) {
        Ok(book) => load_dashboard(&book, date, true),
        Err(err @ PortfolioError::WorkbookNotFound { .. }) => {
            Ok(Dashboard::empty(date, format!("{err}, press 'a' to create it")))
        }
        Err(err) => Err(err),
    }
}

/// Цикл интерактивного режима.
pub fn run_interactive(
    config: &Config,
    start: NaiveDate,
    today: fn() -> NaiveDate,
) -> Result<(), PortfolioError> {
    let options = RenderOptions {
        symbols: config.symbols,
        color: config.color,
        interactive: true,
    };
    let mut state = UiState::new(start);
    let mut stdout = io::stdout();
    loop {
        let mut dashboard = load(config, state.selected)?;
        state.month_found = dashboard.month_found;
        if let Some(status) = state.status.take() {
            dashboard.status = Some(status);
        }
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        write!(stdout, "{}", render_dashboard(&dashboard, &options))?;
        stdout.flush()?;

        let event = next_event()?;
        debug!(?event, selected = %state.selected, "key");
        match state.apply(event, today()) {
            UiAction::Redraw => {}
            UiAction::Quit => return Ok(()),
            UiAction::Add => {
                writeln!(stdout)?;
                let result =
                    add_to_file(&config.file, Some(state.selected), today(), &mut StdinPrompt);
                state.status = Some(add_status(result)?);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn day_steps_cross_month_boundaries() {
        let today = date(2026, 3, 10);
        let mut state = UiState::new(date(2026, 3, 1));
        state.status = Some("Saved".into());
        assert_eq!(state.apply(UiEvent::PreviousDay, today), UiAction::Redraw);
        assert_eq!(state.selected, date(2026, 2, 28));
        assert_eq!(state.status, None);
        state.apply(UiEvent::NextDay, today);
        assert_eq!(state.selected, date(2026, 3, 1));
    }

    #[test]
    fn month_steps_clamp_day() {
        let today = date(2026, 3, 10);
        let mut state = UiState::new(date(2026, 3, 31));
        state.apply(UiEvent::PreviousMonth, today);
        assert_eq!(state.selected, date(2026, 2, 28));
        state.apply(UiEvent::NextMonth, today);
        assert_eq!(state.selected, date(2026, 3, 28));
        state.apply(UiEvent::Today, today);
        assert_eq!(state.selected, today);
    }

    #[test]
    fn add_and_quit_keep_selection() {
        let mut state = UiState::new(date(2026, 1, 5));
        state.status = Some("pending".into());
        assert_eq!(state.apply(UiEvent::Add, date(2026, 1, 9)), UiAction::Add);
        assert_eq!(state.apply(UiEvent::Refresh, date(2026, 1, 9)), UiAction::Redraw);
        assert_eq!(state.apply(UiEvent::Quit, date(2026, 1, 9)), UiAction::Quit);
        assert_eq!(state.selected, date(2026, 1, 5));
        assert_eq!(state.status.as_deref(), Some("pending"));
    }

    #[test]
    fn add_errors_become_status_lines() {
        let status = add_status(Err(PortfolioError::NoAccounts)).unwrap();
        assert_eq!(status, "At least one account is required");
        let status = add_status(Err(PortfolioError::NoPriorMonth {
            target: "Data Over time January 2026".into(),
        }))
        .unwrap();
        assert!(status.starts_with("No prior month sheet"));
        let status = add_status(Ok(AddOutcome::Declined)).unwrap();
        assert_eq!(status, "Existing entries kept");

        let closed = io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed");
        assert!(matches!(
            add_status(Err(closed.into())),
            Err(PortfolioError::Io(_))
        ));
    }

    #[test]
    fn keys_map_to_events() {
        assert_eq!(event_for_key(key(KeyCode::Left)), Some(UiEvent::PreviousDay));
        assert_eq!(event_for_key(key(KeyCode::Char('l'))), Some(UiEvent::NextDay));
        assert_eq!(event_for_key(key(KeyCode::PageUp)), Some(UiEvent::PreviousMonth));
        assert_eq!(event_for_key(key(KeyCode::Char('j'))), Some(UiEvent::NextMonth));
        assert_eq!(event_for_key(key(KeyCode::Char('t'))), Some(UiEvent::Today));
        assert_eq!(event_for_key(key(KeyCode::Char('a'))), Some(UiEvent::Add));
        assert_eq!(event_for_key(key(KeyCode::Char('r'))), Some(UiEvent::Refresh));
        assert_eq!(event_for_key(key(KeyCode::Esc)), Some(UiEvent::Quit));
        assert_eq!(
            event_for_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(UiEvent::Quit)
        );
        assert_eq!(event_for_key(key(KeyCode::Char('c'))), None);
    }
}
