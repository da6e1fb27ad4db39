//! Command-line interface.

use crate::models::{SortDirection, ViewMode};
use crate::positions::PositionColumn;
use crate::watchlist::WatchlistColumn;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Watchlists, price alerts and purchased positions against a
/// tickerwatch backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "tickerwatch")]
#[command(version)]
#[command(about = "Stock watchlists, price alerts and positions from the terminal", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "TICKERWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "TICKERWATCH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token of the signed-in user
    #[arg(long, env = "TICKERWATCH_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// User id (looked up from the token when omitted)
    #[arg(short = 'u', long, env = "TICKERWATCH_USER_ID", global = true)]
    pub user_id: Option<String>,

    /// API timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Minimum gap between backend requests (e.g. "1s", "250ms")
    #[arg(long, value_parser = humantime::parse_duration, global = true)]
    pub pace: Option<Duration>,

    /// Watchlist sort column
    #[arg(short = 'o', long, value_enum, global = true)]
    pub sort: Option<SortField>,

    /// Reverse the sort order (descending unless the saved order already is)
    #[arg(short = 'r', long, global = true)]
    pub reverse: bool,

    /// Which extreme-price columns to show
    #[arg(long, value_enum, global = true)]
    pub view: Option<ViewArg>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage watchlists and their alert prices
    #[command(subcommand)]
    Watchlist(WatchlistCommand),

    /// Manage purchased-stock positions
    #[command(subcommand)]
    Positions(PositionsCommand),

    /// Price-alert notifications
    #[command(subcommand)]
    Notifications(NotificationsCommand),

    /// Search for a stock by symbol or company name
    Search {
        /// Query; omit with --stdin
        query: Option<String>,

        /// Read queries line by line from stdin, searching only once typing
        /// pauses
        #[arg(long)]
        stdin: bool,

        /// Quiet period before a query from stdin is sent
        #[arg(long, value_parser = humantime::parse_duration, default_value = "600ms")]
        debounce: Duration,
    },

    /// Show a live quote
    Quote {
        /// Ticker symbol
        symbol: String,
    },

    /// Account commands
    #[command(subcommand)]
    User(UserCommand),

    /// Export a watchlist or position set
    Export {
        /// What to export
        #[arg(value_enum)]
        target: ExportTarget,

        /// Watchlist or position set name; all when omitted
        name: Option<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: ExportFormat,
    },

    /// Print a sample configuration file
    SampleConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum WatchlistCommand {
    /// List watchlist names
    List,
    /// Show a watchlist table (the first watchlist when no name is given)
    Show { name: Option<String> },
    /// Create an empty watchlist
    Create { name: String },
    /// Delete a watchlist
    Delete { name: String },
    /// Add a ticker with an alert price
    Add {
        name: String,
        symbol: String,
        /// Alert price
        #[arg(short = 'a', long)]
        alert: String,
    },
    /// Remove tickers
    Remove {
        name: String,
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Sort tables by a column and remember it; picking the current
    /// column again flips the direction
    Sort {
        #[arg(value_enum)]
        column: SortField,
    },
    /// Change alert prices, given as SYMBOL=PRICE
    SetAlert {
        name: String,
        #[arg(required = true, value_parser = parse_alert_edit)]
        edits: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PositionsCommand {
    /// List position set names
    List,
    /// Show a position set with totals
    Show {
        name: Option<String>,
        /// Sort column
        #[arg(long, value_enum, default_value = "purchase-date")]
        by: PositionSortField,
        /// Oldest or smallest first
        #[arg(long)]
        ascending: bool,
    },
    /// Create an empty position set
    Create { name: String },
    /// Delete a position set
    Delete { name: String },
    /// Record a purchase
    Add {
        name: String,
        symbol: String,
        /// Price paid per share
        #[arg(short = 'p', long)]
        price: String,
        /// Number of shares
        #[arg(short = 'q', long)]
        quantity: String,
        /// Purchase date (YYYY-MM-DD)
        #[arg(short = 'd', long)]
        date: Option<NaiveDate>,
        /// Target sell price
        #[arg(short = 't', long)]
        target: Option<String>,
    },
    /// Delete purchases by position id (see `positions show`)
    Remove {
        name: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum NotificationsCommand {
    /// Show alerts grouped into exact, near and urgent
    Show {
        /// Print the buckets as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep refreshing alerts until interrupted
    Watch {
        /// Refresh interval (e.g. "60s", "5m")
        #[arg(short = 'i', long, value_parser = parse_interval)]
        interval: Option<Duration>,
    },
    /// Today's exact matches that have not been dismissed yet
    Popup,
    /// Hide an alert from `show` and the popup for the rest of the day
    Dismiss { symbol: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Show the signed-in user
    Info,
    /// Create the user record on the backend if it does not exist
    Ensure,
    /// Show or change the notification setting
    Notifications {
        #[arg(value_enum)]
        state: Option<Toggle>,
    },
}

/// Watchlist sort columns.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Symbol,
    Exchange,
    AlertPrice,
    Price,
    VsAlert,
    PreviousClose,
    ChangePercent,
    DayHigh,
    VsDayHigh,
    YearHigh,
    VsYearHigh,
    DayLow,
    VsDayLow,
    YearLow,
    VsYearLow,
}

impl From<SortField> for WatchlistColumn {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Symbol => WatchlistColumn::Symbol,
            SortField::Exchange => WatchlistColumn::Exchange,
            SortField::AlertPrice => WatchlistColumn::AlertPrice,
            SortField::Price => WatchlistColumn::Price,
            SortField::VsAlert => WatchlistColumn::CurrentVsAlert,
            SortField::PreviousClose => WatchlistColumn::PreviousClose,
            SortField::ChangePercent => WatchlistColumn::ChangePercent,
            SortField::DayHigh => WatchlistColumn::DayHigh,
            SortField::VsDayHigh => WatchlistColumn::NearHighVsCurrent,
            SortField::YearHigh => WatchlistColumn::YearHigh,
            SortField::VsYearHigh => WatchlistColumn::YearHighVsCurrent,
            SortField::DayLow => WatchlistColumn::DayLow,
            SortField::VsDayLow => WatchlistColumn::NearLowVsCurrent,
            SortField::YearLow => WatchlistColumn::YearLow,
            SortField::VsYearLow => WatchlistColumn::YearLowVsCurrent,
        }
    }
}

impl SortField {
    /// Parse a column name from the config file.
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name.trim(), true).ok()
    }

    /// The name written to the config file.
    pub fn name(&self) -> String {
        self.to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }
}

/// Position sort columns.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PositionSortField {
    PurchaseDate,
    Symbol,
    Quantity,
    PurchasePrice,
    Price,
    PriceChange,
    GainOrLoss,
    MarketValue,
}

impl From<PositionSortField> for PositionColumn {
    fn from(field: PositionSortField) -> Self {
        match field {
            PositionSortField::PurchaseDate => PositionColumn::PurchaseDate,
            PositionSortField::Symbol => PositionColumn::Symbol,
            PositionSortField::Quantity => PositionColumn::Quantity,
            PositionSortField::PurchasePrice => PositionColumn::PurchasePrice,
            PositionSortField::Price => PositionColumn::Price,
            PositionSortField::PriceChange => PositionColumn::PriceChange,
            PositionSortField::GainOrLoss => PositionColumn::GainOrLoss,
            PositionSortField::MarketValue => PositionColumn::MarketValue,
        }
    }
}

/// Watchlist view modes.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ViewArg {
    /// Both high and low metrics
    Full,
    /// Day and year highs
    High,
    /// Day and year lows
    Low,
}

impl From<ViewArg> for ViewMode {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Full => ViewMode::Full,
            ViewArg::High => ViewMode::High,
            ViewArg::Low => ViewMode::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportTarget {
    Watchlist,
    Positions,
}

/// Export format for data output.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain text format
    Text,
    /// Comma-separated values (CSV)
    Csv,
    /// JavaScript Object Notation (JSON)
    Json,
}

/// Parse a polling interval; zero would mean polling in a busy loop.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

/// Parse `SYMBOL=PRICE`. The price is validated later with the rest of
/// the batch.
fn parse_alert_edit(raw: &str) -> Result<(String, String), String> {
    let (symbol, price) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=PRICE, got \"{}\"", raw))?;
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(format!("missing symbol in \"{}\"", raw));
    }
    Ok((symbol.to_uppercase(), price.trim().to_string()))
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Watchlist sort direction, starting from `base` (the saved order of
    /// the column being sorted, or ascending).
    pub fn sort_direction(&self, base: SortDirection) -> SortDirection {
        if self.reverse { base.toggle() } else { base }
    }
}
