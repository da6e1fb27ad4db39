//! Data models for watchlists, positions and the quotes behind them.
//!
//! Wire names follow the backend's camelCase JSON, including its few
//! irregular spellings (`userID`, `purchasedstocksName`, `photoURL`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A live quote as served by the stock endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockQuote {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,
    /// Company name
    pub name: String,
    /// Current price
    pub price: Option<f64>,
    /// Percentage change from previous close
    pub changes_percentage: Option<f64>,
    /// Price change from previous close
    pub change: Option<f64>,
    /// Day's low price
    pub day_low: Option<f64>,
    /// Day's high price
    pub day_high: Option<f64>,
    /// 52-week high
    pub year_high: Option<f64>,
    /// 52-week low
    pub year_low: Option<f64>,
    /// Market capitalization
    pub market_cap: Option<f64>,
    /// Exchange where the security is traded
    pub exchange: String,
    /// Trading volume
    pub volume: Option<u64>,
    /// Average volume
    pub avg_volume: Option<u64>,
    /// Opening price for the day
    pub open: Option<f64>,
    /// Previous closing price
    pub previous_close: Option<f64>,
    /// Unix timestamp of the quote
    pub timestamp: Option<i64>,
}

impl StockQuote {
    /// Quote time, if the backend sent one.
    pub fn quoted_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
    }
}

/// The part of a watchlist ticker the user owns: symbol and alert price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalWatchlistTicker {
    pub symbol: String,
    pub alert_price: Option<f64>,
}

/// A watchlist row: the user's alert price merged with the live quote and
/// the percentages the backend derives from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchlistTicker {
    pub symbol: String,
    pub alert_price: Option<f64>,
    pub name: String,
    pub exchange: String,
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub changes_percentage: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub current_vs_alert_price_percentage: Option<f64>,
    pub near_high_vs_current_percentage: Option<f64>,
    pub year_high_vs_current_percentage: Option<f64>,
    pub near_low_vs_current_percentage: Option<f64>,
    pub year_low_vs_current_percentage: Option<f64>,
}

impl WatchlistTicker {
    /// The symbol/alert pair sent back when editing alert prices.
    pub fn minimal(&self) -> MinimalWatchlistTicker {
        MinimalWatchlistTicker {
            symbol: self.symbol.clone(),
            alert_price: self.alert_price,
        }
    }
}

/// A named list of tracked tickers owned by one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    #[serde(rename = "watchlistName")]
    pub name: String,
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub tickers: Vec<WatchlistTicker>,
}

/// A recorded stock purchase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionTicker {
    pub symbol: String,
    pub purchase_price: f64,
    pub quantity: u64,
    pub purchase_date: Option<DateTime<Utc>>,
    pub price: f64,
    pub price_change: f64,
    pub gain_or_loss: f64,
    pub market_value: f64,
    pub target_sell_price: Option<f64>,
}

impl PositionTicker {
    /// Total amount paid for the position.
    pub fn cost_basis(&self) -> f64 {
        self.purchase_price * self.quantity as f64
    }

    /// Gain/loss as a percentage of cost basis.
    pub fn gain_or_loss_percent(&self) -> f64 {
        let cost = self.cost_basis();
        if cost == 0.0 {
            0.0
        } else {
            self.gain_or_loss / cost * 100.0
        }
    }

    /// Fill the quote-derived fields from the live price.
    ///
    /// Values the backend already supplied are kept.
    pub fn refresh_derived(&mut self) {
        if self.price == 0.0 {
            return;
        }
        let qty = self.quantity as f64;
        if self.market_value == 0.0 {
            self.market_value = self.price * qty;
        }
        if self.gain_or_loss == 0.0 {
            self.gain_or_loss = (self.price - self.purchase_price) * qty;
        }
        if self.price_change == 0.0 {
            self.price_change = self.price - self.purchase_price;
        }
    }

    /// Identifier used to select a single purchase. Two purchases of the
    /// same symbol differ by date, price or quantity.
    pub fn position_id(&self) -> String {
        let date = self
            .purchase_date
            .map(|d| d.timestamp_millis().to_string())
            .unwrap_or_else(|| "null".to_string());
        format!(
            "{}-{}-{}-{}",
            self.symbol, date, self.purchase_price, self.quantity
        )
    }
}

/// A named collection of purchases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSet {
    #[serde(rename = "purchasedstocksName")]
    pub name: String,
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub tickers: Vec<PositionTicker>,
}

/// Account details held by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Whether price-alert notifications are on for the user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationSetting {
    pub notifications: bool,
}

/// Backend acknowledgement of a delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Backend acknowledgement of a partial update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Arrow shown next to the sorted column header.
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

/// Which extreme-price columns a watchlist table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Full,
    High,
    Low,
}

/// Order two optional numbers with missing values last, whatever the
/// direction.
pub fn compare_optional(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let cmp = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            apply_direction(cmp, direction)
        }
    }
}

/// Flip an ascending comparison for descending order.
pub fn apply_direction(cmp: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => cmp,
        SortDirection::Descending => cmp.reverse(),
    }
}
