//! Plain-text rendering of tables and notifications.

use crate::alerts::{AlertLevel, Notification, NotificationBuckets};
use crate::models::{PositionSet, StockQuote, ViewMode, Watchlist, WatchlistTicker};
use crate::positions::{PositionColumn, PositionTotals};
use crate::watchlist::{TableSort, WatchlistColumn, columns_for_view};
use chrono::Local;
use num_format::{Locale, ToFormattedString};
use std::fmt::Write;

/// Format a dollar amount with thousands separators.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Format a percentage with a direction arrow; missing values show as
/// `0.00%`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        None => "0.00%".to_string(),
        Some(v) if v >= 0.0 => format!("▲ {:.2}%", v),
        Some(v) => format!("▼ {:.2}%", v.abs()),
    }
}

/// Format a signed dollar change.
fn format_change(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", format_currency(value))
    } else {
        format_currency(value)
    }
}

fn format_volume(volume: Option<u64>) -> String {
    match volume {
        Some(v) if v >= 1_000_000_000 => format!("{:.2}B", v as f64 / 1_000_000_000.0),
        Some(v) if v >= 1_000_000 => format!("{:.2}M", v as f64 / 1_000_000.0),
        Some(v) => v.to_formatted_string(&Locale::en),
        None => "-".to_string(),
    }
}

fn format_market_cap(market_cap: Option<f64>) -> String {
    match market_cap {
        Some(cap) if cap >= 1e12 => format!("${:.2}T", cap / 1e12),
        Some(cap) if cap >= 1e9 => format!("${:.2}B", cap / 1e9),
        Some(cap) if cap >= 1e6 => format!("${:.2}M", cap / 1e6),
        Some(cap) => format_currency(cap),
        None => "-".to_string(),
    }
}

/// Truncate string to max length.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

fn cell(column: WatchlistColumn, t: &WatchlistTicker) -> String {
    match column {
        WatchlistColumn::Symbol => t.symbol.clone(),
        WatchlistColumn::Exchange => t.exchange.clone(),
        c if c.is_percentage() => format_percent(c.value(t)),
        c => format_currency(c.value(t).unwrap_or(0.0)),
    }
}

fn column_width(column: WatchlistColumn) -> usize {
    match column {
        WatchlistColumn::Symbol => 8,
        WatchlistColumn::Exchange => 8,
        _ => 12,
    }
}

/// Render a watchlist table with the columns of `view`, sorted.
pub fn watchlist_table(watchlist: &Watchlist, view: ViewMode, sort: TableSort) -> String {
    let columns = columns_for_view(view);
    let mut rows = watchlist.tickers.clone();
    crate::watchlist::sort_tickers(&mut rows, sort);

    let mut out = String::new();
    let _ = writeln!(out, "=== {} ({} tickers) ===", watchlist.name, rows.len());

    let mut header = String::new();
    for column in &columns {
        let mut title = column.header().to_string();
        if *column == sort.column {
            title.push_str(sort.direction.arrow());
        }
        push_cell(&mut header, *column, &title);
    }
    let _ = writeln!(out, "{}", header.trim_end());
    let _ = writeln!(out, "{}", "-".repeat(header.trim_end().chars().count()));

    if rows.is_empty() {
        let _ = writeln!(out, "No tickers yet. Add one with `tickerwatch watchlist add`.");
        return out;
    }

    for t in &rows {
        let mut line = String::new();
        for column in &columns {
            push_cell(&mut line, *column, &cell(*column, t));
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn push_cell(line: &mut String, column: WatchlistColumn, text: &str) {
    let width = column_width(column);
    match column {
        WatchlistColumn::Symbol | WatchlistColumn::Exchange => {
            let _ = write!(line, "{:<width$} ", text, width = width);
        }
        _ => {
            let _ = write!(line, "{:>width$} ", text, width = width);
        }
    }
}

/// Render a position set with ids, the sorted column marked, and totals.
pub fn positions_table(set: &PositionSet, sorted_by: PositionColumn) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ({} positions) ===", set.name, set.tickers.len());

    let header = format!(
        "{:<10} {:<8} {:>6} {:>12} {:>12} {:>12} {:>14} {:>12} {:>14}  {}",
        PositionColumn::PurchaseDate.header(),
        PositionColumn::Symbol.header(),
        PositionColumn::Quantity.header(),
        PositionColumn::PurchasePrice.header(),
        PositionColumn::Price.header(),
        PositionColumn::PriceChange.header(),
        PositionColumn::GainOrLoss.header(),
        "GAIN%",
        PositionColumn::MarketValue.header(),
        "ID"
    );
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));

    for p in &set.tickers {
        let date = p
            .purchase_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:>6} {:>12} {:>12} {:>12} {:>14} {:>12} {:>14}  {}",
            date,
            p.symbol,
            p.quantity,
            format_currency(p.purchase_price),
            format_currency(p.price),
            format_change(p.price_change),
            format_change(p.gain_or_loss),
            format_percent(Some(p.gain_or_loss_percent())),
            format_currency(p.market_value),
            p.position_id()
        );
    }

    let totals = PositionTotals::of(&set.tickers);
    let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));
    let _ = writeln!(
        out,
        "Cost: {}  Value: {}  Gain/Loss: {} ({})  Sorted by: {}",
        format_currency(totals.cost_basis),
        format_currency(totals.market_value),
        format_change(totals.gain_or_loss),
        format_percent(Some(totals.gain_or_loss_percent())),
        sorted_by.header()
    );
    out
}

/// One notification as a sentence.
pub fn notification_line(level: AlertLevel, n: &Notification) -> String {
    let verb = match level {
        AlertLevel::Exact => "hit",
        AlertLevel::Near => "is near",
        AlertLevel::Urgent => "is far from",
    };
    let mut line = format!(
        "{} in {} {} its alert price of {} Current Price: {}",
        n.symbol,
        n.watchlist_name,
        verb,
        format_currency(n.alert_price),
        format_currency(n.price)
    );
    if level != AlertLevel::Exact {
        let _ = write!(
            line,
            " ({})",
            format_percent(Some(n.current_vs_alert_price_percentage))
        );
    }
    line
}

/// All notification buckets, exact first.
pub fn notifications(buckets: &NotificationBuckets) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Notifications ({}) {} ===",
        buckets.count(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if buckets.is_empty() {
        let _ = writeln!(out, "No notifications.");
        return out;
    }

    for (level, title) in [
        (AlertLevel::Exact, "Exact"),
        (AlertLevel::Near, "Near"),
        (AlertLevel::Urgent, "Urgent"),
    ] {
        let bucket = buckets.bucket(level);
        if bucket.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({})", title, bucket.len());
        for n in bucket {
            let _ = writeln!(out, "  {}", notification_line(level, n));
        }
    }
    out
}

/// The daily popup for exact matches.
pub fn popup(shown: &[&Notification]) -> String {
    let mut out = String::new();
    for n in shown {
        let _ = writeln!(
            out,
            "{} in {} hit its alert at {}!",
            n.symbol,
            n.watchlist_name,
            format_currency(n.alert_price)
        );
    }
    out
}

/// A single quote.
pub fn quote(q: &StockQuote) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", q.symbol, q.name);
    let _ = writeln!(
        out,
        "Price: {}  {}  ({})",
        format_currency(q.price.unwrap_or(0.0)),
        format_change(q.change.unwrap_or(0.0)),
        format_percent(q.changes_percentage)
    );
    let _ = writeln!(
        out,
        "Open: {}  Previous Close: {}",
        q.open.map(format_currency).unwrap_or_else(|| "-".to_string()),
        q.previous_close.map(format_currency).unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(
        out,
        "Day: {} - {}   Year: {} - {}",
        format_currency(q.day_low.unwrap_or(0.0)),
        format_currency(q.day_high.unwrap_or(0.0)),
        format_currency(q.year_low.unwrap_or(0.0)),
        format_currency(q.year_high.unwrap_or(0.0))
    );
    let _ = writeln!(
        out,
        "Volume: {} (avg {})  Market Cap: {}  Exchange: {}",
        format_volume(q.volume),
        format_volume(q.avg_volume),
        format_market_cap(q.market_cap),
        if q.exchange.is_empty() { "-" } else { q.exchange.as_str() }
    );
    if let Some(at) = q.quoted_at() {
        let _ = writeln!(out, "As of {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    }
    out
}

/// Search results, one per line.
pub fn search_results(results: &[&StockQuote]) -> String {
    if results.is_empty() {
        return "No matching stocks.\n".to_string();
    }
    let mut out = String::new();
    for q in results {
        let _ = writeln!(
            out,
            "{:<8} {:<30} {:>12}",
            q.symbol,
            truncate_string(&q.name, 30),
            q.price.map(format_currency).unwrap_or_else(|| "-".to_string())
        );
    }
    out
}
