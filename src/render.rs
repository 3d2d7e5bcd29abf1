//! Текстовая отрисовка панели. Функции чистые: на входе данные, на выходе строка.

use std::fmt::{self, Write as _};

use crossterm::style::{Color, Stylize, style};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::Symbols;
use crate::dashboard::Dashboard;
use crate::types::{FyMetrics, FySummary, FyTotals, Money, Snapshot};

/// Заглушка для отсутствующего значения.
pub const PLACEHOLDER: &str = "-";

const WIDTH: usize = 64;
const BAR_WIDTH: u32 = 24;

/// Параметры отрисовки.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Символы валюты и графиков.
    pub symbols: Symbols,
    /// Раскрашивать ли вывод ANSI-цветами.
    pub color: bool,
    /// Показывать ли подсказку по клавишам.
    pub interactive: bool,
}

/// Сумма с символом валюты, разделителями тысяч и двумя знаками.
pub fn format_money(value: Money, symbols: &Symbols) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (int, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("{sign}{}{}.{frac}", symbols.currency, group_thousands(int))
}

/// Изменение суммы со знаком «+» для роста.
pub fn format_change(value: Money, symbols: &Symbols) -> String {
    let text = format_money(value, symbols);
    if value.round_dp(2) > Decimal::ZERO {
        format!("+{text}")
    } else {
        text
    }
}

/// Доля в процентах со знаком.
pub fn format_pct(ratio: Decimal) -> String {
    let pct = (ratio * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if pct > Decimal::ZERO {
        "+"
    } else if pct < Decimal::ZERO {
        "-"
    } else {
        ""
    };
    format!("{sign}{:.2}%", pct.abs())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn paint(text: String, color: Color, options: &RenderOptions) -> String {
    if options.color {
        style(text).with(color).to_string()
    } else {
        text
    }
}

fn bold(text: String, options: &RenderOptions) -> String {
    if options.color {
        style(text).bold().to_string()
    } else {
        text
    }
}

/// Цвет по знаку изменения.
fn tone(value: Decimal) -> Color {
    if value > Decimal::ZERO {
        Color::Green
    } else if value < Decimal::ZERO {
        Color::Red
    } else {
        Color::Reset
    }
}

fn rule(options: &RenderOptions) -> String {
    options.symbols.rule.to_string().repeat(WIDTH)
}

fn money_or_placeholder(value: Option<Money>, symbols: &Symbols) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| format_money(v, symbols))
}

fn pct_or_placeholder(value: Option<Decimal>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), format_pct)
}

/// Отрисовывает панель целиком.
pub fn render_dashboard(dashboard: &Dashboard, options: &RenderOptions) -> String {
    let mut out = String::new();
    let sheet = dashboard
        .snapshot
        .as_ref()
        .map_or(PLACEHOLDER, |(s, _)| s.sheet_name.as_str());
    push_line(
        &mut out,
        format_args!(
            "{}  {}",
            bold(format!("Portfolio {}", dashboard.date), options),
            sheet
        ),
    );
    push_line(&mut out, rule(options));

    match &dashboard.snapshot {
        Some((snapshot, _)) => render_snapshot(&mut out, snapshot, options),
        None => {
            push_line(
                &mut out,
                format_args!(
                    "{:<20}{:>16}{:>16}{:>10}",
                    "Total", PLACEHOLDER, PLACEHOLDER, PLACEHOLDER
                ),
            );
        }
    }

    if let Some(fy) = &dashboard.fy {
        push_line(&mut out, rule(options));
        render_fy(&mut out, fy, dashboard, options);
    }

    if let Some(status) = &dashboard.status {
        push_line(&mut out, rule(options));
        push_line(&mut out, paint(status.clone(), Color::Yellow, options));
    }

    if options.interactive {
        push_line(&mut out, rule(options));
        push_line(&mut out, "h/l day  k/j month  t today  a add  r refresh  q quit");
        if !dashboard.month_found {
            push_line(&mut out, "press 'a' to create this month");
        }
    }
    out
}

fn render_snapshot(out: &mut String, snapshot: &Snapshot, options: &RenderOptions) {
    let symbols = &options.symbols;
    push_line(
        out,
        format_args!("{:<20}{:>16}{:>16}{:>10}", "Account", "Value", "Change", "%"),
    );
    for account in &snapshot.accounts {
        push_line(
            out,
            format_args!(
                "{:<20}{:>16}{}{}",
                account.name,
                format_money(account.current, symbols),
                paint(
                    format!("{:>16}", format_change(account.change, symbols)),
                    tone(account.change),
                    options
                ),
                paint(
                    format!("{:>10}", format_pct(account.change_pct)),
                    tone(account.change),
                    options
                ),
            ),
        );
    }
    push_line(
        out,
        format_args!(
            "{}{}{}",
            bold(
                format!(
                    "{:<20}{:>16}",
                    "Total",
                    format_money(snapshot.total, symbols)
                ),
                options
            ),
            paint(
                format!("{:>16}", format_change(snapshot.total_change, symbols)),
                tone(snapshot.total_change),
                options
            ),
            paint(
                format!("{:>10}", format_pct(snapshot.total_change_pct)),
                tone(snapshot.total_change),
                options
            ),
        ),
    );
    push_line(
        out,
        format_args!(
            "{:<36}{}{}",
            "Month to date",
            paint(
                format!("{:>16}", format_change(snapshot.month_to_date, symbols)),
                tone(snapshot.month_to_date),
                options
            ),
            paint(
                format!("{:>10}", format_pct(snapshot.month_to_date_pct)),
                tone(snapshot.month_to_date),
                options
            ),
        ),
    );
    if snapshot.effective_date != snapshot.date {
        push_line(out, format_args!("Values as of {}", snapshot.effective_date));
    }

    if snapshot.recent_changes.is_empty() {
        return;
    }
    out.push('\n');
    push_line(out, "Recent daily changes");
    let max = snapshot
        .recent_changes
        .iter()
        .map(|c| c.change.abs())
        .max()
        .unwrap_or_default();
    for day in &snapshot.recent_changes {
        let marker = if day.change < Decimal::ZERO {
            symbols.down
        } else {
            symbols.up
        };
        let bar = symbols.bar.to_string().repeat(bar_len(day.change, max));
        push_line(
            out,
            format_args!(
                "{}  {} {} {}",
                day.date.format("%d %b"),
                marker,
                paint(bar, tone(day.change), options),
                format_change(day.change, symbols),
            ),
        );
    }
}

/// Дописывает строку и перевод строки.
fn push_line(out: &mut String, line: impl fmt::Display) {
    let _ = writeln!(out, "{line}");
}

/// Длина столбика относительно максимального изменения в окне.
fn bar_len(change: Money, max: Money) -> usize {
    if max.is_zero() {
        return 0;
    }
    (change.abs() * Decimal::from(BAR_WIDTH) / max)
        .round()
        .to_usize()
        .unwrap_or(0)
}

fn render_fy(out: &mut String, fy: &FySummary, dashboard: &Dashboard, options: &RenderOptions) {
    let symbols = &options.symbols;
    push_line(out, bold(fy.title.clone(), options));
    push_line(
        out,
        format_args!("{:<12}{:>12}{:>18}{:>18}", "Month", "Return", "Cash", "PnL"),
    );
    let row = |out: &mut String, label: &str, metrics: &FyMetrics| {
        push_line(
            out,
            format_args!(
                "{:<12}{:>12}{:>18}{:>18}",
                label,
                pct_or_placeholder(metrics.ret),
                money_or_placeholder(metrics.cash, symbols),
                money_or_placeholder(metrics.pnl, symbols),
            ),
        );
    };
    for month in &fy.months {
        let label = month
            .year
            .map_or_else(|| month.label.clone(), |year| format!("{} {year}", month.label));
        row(out, &label, &month.metrics);
    }
    if let Some(totals) = &fy.totals {
        row(out, "Total", totals);
    }

    let totals = FyTotals::compute(fy, dashboard.date);
    out.push('\n');
    push_line(
        out,
        format_args!(
            "YTD through {}: return {}, cash {} {} {}, PnL {}",
            totals.through.as_deref().unwrap_or(PLACEHOLDER),
            pct_or_placeholder(totals.ytd_return),
            money_or_placeholder(totals.ytd_cash_start, symbols),
            if symbols.currency.is_ascii() { "->" } else { "→" },
            money_or_placeholder(totals.ytd_cash_latest, symbols),
            money_or_placeholder(totals.ytd_pnl, symbols),
        ),
    );
    push_line(
        out,
        format_args!(
            "Full year: return {}, cash {}, PnL {}",
            pct_or_placeholder(totals.year_return),
            money_or_placeholder(totals.year_cash, symbols),
            money_or_placeholder(totals.year_pnl, symbols),
        ),
    );
}
