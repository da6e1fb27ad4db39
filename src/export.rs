//! Data export for spreadsheets and other tools.
//!
//! Provides CSV, JSON, and plain text export formats.

use crate::cli::ExportFormat;
use crate::models::{PositionSet, Watchlist};
use crate::positions::PositionTotals;
use anyhow::{Context, Result};

/// Export watchlists in the specified format.
pub fn export_watchlists(watchlists: &[Watchlist], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(watchlists_text(watchlists)),
        ExportFormat::Csv => Ok(watchlists_csv(watchlists)),
        ExportFormat::Json => {
            serde_json::to_string_pretty(watchlists).context("Failed to serialize watchlists")
        }
    }
}

/// Export position sets in the specified format.
pub fn export_positions(sets: &[PositionSet], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(positions_text(sets)),
        ExportFormat::Csv => Ok(positions_csv(sets)),
        ExportFormat::Json => {
            serde_json::to_string_pretty(sets).context("Failed to serialize positions")
        }
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Quote a CSV field, doubling embedded quotes.
fn csv_field(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn watchlists_text(watchlists: &[Watchlist]) -> String {
    let mut output = String::new();

    output.push_str("TICKERWATCH WATCHLIST EXPORT\n");
    output.push_str("============================\n\n");

    for wl in watchlists {
        output.push_str(&format!("Watchlist: {}\n", wl.name));
        for t in &wl.tickers {
            output.push_str(&format!("  Symbol: {}\n", t.symbol));
            if !t.name.is_empty() {
                output.push_str(&format!("  Name: {}\n", t.name));
            }
            output.push_str(&format!("  Alert Price: ${}\n", optional(t.alert_price)));
            output.push_str(&format!("  Price: ${}\n", optional(t.price)));
            output.push_str(&format!(
                "  Current vs Alert: {}%\n",
                optional(t.current_vs_alert_price_percentage)
            ));
            output.push('\n');
        }
        if wl.tickers.is_empty() {
            output.push_str("  (empty)\n\n");
        }
    }

    output
}

fn watchlists_csv(watchlists: &[Watchlist]) -> String {
    let mut output = String::new();

    output.push_str(
        "Watchlist,Symbol,Name,Exchange,AlertPrice,Price,CurrentVsAlert%,PreviousClose,Change%,\
DayHigh,DayLow,YearHigh,YearLow\n",
    );

    for wl in watchlists {
        for t in &wl.tickers {
            output.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
                csv_field(&wl.name),
                csv_field(&t.symbol),
                csv_field(&t.name),
                csv_field(&t.exchange),
                optional(t.alert_price),
                optional(t.price),
                optional(t.current_vs_alert_price_percentage),
                optional(t.previous_close),
                optional(t.changes_percentage),
                optional(t.day_high),
                optional(t.day_low),
                optional(t.year_high),
                optional(t.year_low),
            ));
        }
    }

    output
}

fn positions_text(sets: &[PositionSet]) -> String {
    let mut output = String::new();

    output.push_str("TICKERWATCH POSITIONS EXPORT\n");
    output.push_str("============================\n\n");

    for set in sets {
        output.push_str(&format!("Positions: {}\n", set.name));
        for p in &set.tickers {
            output.push_str(&format!("  Symbol: {}\n", p.symbol));
            if let Some(date) = p.purchase_date {
                output.push_str(&format!("  Purchased: {}\n", date.format("%Y-%m-%d")));
            }
            output.push_str(&format!("  Quantity: {}\n", p.quantity));
            output.push_str(&format!("  Purchase Price: ${:.2}\n", p.purchase_price));
            output.push_str(&format!("  Price: ${:.2}\n", p.price));
            output.push_str(&format!("  Market Value: ${:.2}\n", p.market_value));
            output.push_str(&format!("  Gain/Loss: {:+.2}\n", p.gain_or_loss));
            output.push('\n');
        }
        let totals = PositionTotals::of(&set.tickers);
        output.push_str(&format!(
            "  Total Cost: ${:.2}  Total Value: ${:.2}  Total Gain/Loss: {:+.2}\n\n",
            totals.cost_basis, totals.market_value, totals.gain_or_loss
        ));
    }

    output
}

fn positions_csv(sets: &[PositionSet]) -> String {
    let mut output = String::new();

    output.push_str(
        "Positions,Symbol,PurchaseDate,Quantity,PurchasePrice,Price,PriceChange,GainOrLoss,\
MarketValue,TargetSellPrice\n",
    );

    for set in sets {
        for p in &set.tickers {
            let date = p
                .purchase_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            output.push_str(&format!(
                "{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{}\n",
                csv_field(&set.name),
                csv_field(&p.symbol),
                date,
                p.quantity,
                p.purchase_price,
                p.price,
                p.price_change,
                p.gain_or_loss,
                p.market_value,
                optional(p.target_sell_price),
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PositionTicker, WatchlistTicker};

    fn watchlist() -> Watchlist {
        Watchlist {
            name: "my \"tech\"".to_string(),
            user_id: "u1".to_string(),
            tickers: vec![WatchlistTicker {
                symbol: "AAPL".to_string(),
                name: "Apple Inc.".to_string(),
                alert_price: Some(150.0),
                price: Some(151.25),
                ..Default::default()
            }],
        }
    }

    fn position_set() -> PositionSet {
        let mut p = PositionTicker {
            symbol: "MSFT".to_string(),
            purchase_price: 300.0,
            quantity: 2,
            price: 310.0,
            ..Default::default()
        };
        p.refresh_derived();
        PositionSet {
            name: "IRA".to_string(),
            user_id: "u1".to_string(),
            tickers: vec![p],
        }
    }

    #[test]
    fn test_export_watchlists_csv() {
        let csv = export_watchlists(&[watchlist()], ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Watchlist,Symbol,Name"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"my \"\"tech\"\"\",\"AAPL\",\"Apple Inc.\""));
        assert!(row.contains(",150.00,151.25,"));
    }

    #[test]
    fn test_export_watchlists_json_uses_backend_names() {
        let json = export_watchlists(&[watchlist()], ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["watchlistName"], "my \"tech\"");
        assert_eq!(value[0]["tickers"][0]["alertPrice"], 150.0);
    }

    #[test]
    fn test_export_positions_text_totals() {
        let text = export_positions(&[position_set()], ExportFormat::Text).unwrap();
        assert!(text.contains("Positions: IRA"));
        assert!(text.contains("Market Value: $620.00"));
        assert!(text.contains("Total Cost: $600.00"));
        assert!(text.contains("Total Gain/Loss: +20.00"));
    }

    #[test]
    fn test_export_positions_csv() {
        let csv = export_positions(&[position_set()], ExportFormat::Csv).unwrap();
        assert!(csv.contains("\"IRA\",\"MSFT\",,2,300.00,310.00,10.00,20.00,620.00,"));
    }
}
