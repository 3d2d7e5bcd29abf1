//! Диагностические логи в stderr; stdout занят панелью.

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Переменная с фильтром логов в синтаксисе `EnvFilter`.
pub const LOG_ENV: &str = "PORTFOLIO_LOG";

/// Устанавливает подписчика `tracing`. Повторный вызов ничего не делает.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
