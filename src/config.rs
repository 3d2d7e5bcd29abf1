//! Настройки процесса: путь к книге, набор символов и цвет.

use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

/// Переменная, принудительно включающая ASCII-символы.
pub const ASCII_ENV: &str = "PORTFOLIO_ASCII";
/// Переменная, принудительно включающая Unicode-символы.
pub const UNICODE_ENV: &str = "PORTFOLIO_UNICODE";

/// Режим вывода символов валюты и графиков.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMode {
    /// Только ASCII.
    Ascii,
    /// Unicode-символы.
    Unicode,
}

impl SymbolMode {
    /// Определяет режим по окружению.
    ///
    /// `PORTFOLIO_ASCII=1` проверяется первым и побеждает `PORTFOLIO_UNICODE=1`.
    /// Без явных флагов перенаправленный вывод и `TERM=dumb` дают ASCII, известные
    /// Unicode-терминалы и UTF-8 локаль дают Unicode.
    pub fn detect<F>(lookup: F, redirected: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).is_some_and(|v| v.trim() == "1");
        if flag(ASCII_ENV) {
            return Self::Ascii;
        }
        if flag(UNICODE_ENV) {
            return Self::Unicode;
        }
        if redirected || lookup("TERM").is_some_and(|term| term == "dumb") {
            return Self::Ascii;
        }
        if lookup("WT_SESSION").is_some() || lookup("TERM_PROGRAM").is_some() {
            return Self::Unicode;
        }
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .into_iter()
            .find_map(|key| lookup(key).filter(|v| !v.is_empty()));
        match locale {
            Some(locale) if locale.to_ascii_uppercase().replace('-', "").contains("UTF8") => {
                Self::Unicode
            }
            _ => Self::Ascii,
        }
    }

    /// Набор символов для режима.
    pub const fn symbols(self) -> Symbols {
        match self {
            Self::Ascii => Symbols {
                currency: "Rs ",
                up: "+",
                down: "-",
                bar: '#',
                rule: '-',
            },
            Self::Unicode => Symbols {
                currency: "₹",
                up: "▲",
                down: "▼",
                bar: '█',
                rule: '─',
            },
        }
    }
}

/// Символы, которыми рисуется панель.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbols {
    /// Префикс денежной суммы.
    pub currency: &'static str,
    /// Маркер роста.
    pub up: &'static str,
    /// Маркер падения.
    pub down: &'static str,
    /// Символ столбика графика.
    pub bar: char,
    /// Символ разделителя.
    pub rule: char,
}

/// Настройки одного запуска.
#[derive(Debug, Clone)]
pub struct Config {
    /// Путь к книге.
    pub file: PathBuf,
    /// Символы вывода.
    pub symbols: Symbols,
    /// Раскрашивать ли вывод.
    pub color: bool,
}

impl Config {
    /// Собирает настройки из пути к книге и окружения процесса.
    pub fn from_env(file: PathBuf) -> Self {
        let redirected = !io::stdout().is_terminal();
        let mode = SymbolMode::detect(|key| env::var(key).ok(), redirected);
        Self {
            file,
            symbols: mode.symbols(),
            color: !redirected && env::var_os("NO_COLOR").is_none(),
        }
    }
}
