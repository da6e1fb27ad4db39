//! The user's watchlists, cached in memory between backend round trips.

use crate::api::BackendClient;
use crate::error::BookError;
use crate::models::{
    MinimalWatchlistTicker, SortDirection, ViewMode, Watchlist, WatchlistTicker, apply_direction,
    compare_optional,
};
use crate::validate;
use tracing::{info, warn};

/// A sortable watchlist table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchlistColumn {
    #[default]
    Symbol,
    Exchange,
    AlertPrice,
    Price,
    CurrentVsAlert,
    PreviousClose,
    ChangePercent,
    DayHigh,
    NearHighVsCurrent,
    YearHigh,
    YearHighVsCurrent,
    DayLow,
    NearLowVsCurrent,
    YearLow,
    YearLowVsCurrent,
}

const CORE_COLUMNS: [WatchlistColumn; 7] = [
    WatchlistColumn::Symbol,
    WatchlistColumn::Exchange,
    WatchlistColumn::AlertPrice,
    WatchlistColumn::Price,
    WatchlistColumn::CurrentVsAlert,
    WatchlistColumn::PreviousClose,
    WatchlistColumn::ChangePercent,
];

const HIGH_COLUMNS: [WatchlistColumn; 4] = [
    WatchlistColumn::DayHigh,
    WatchlistColumn::NearHighVsCurrent,
    WatchlistColumn::YearHigh,
    WatchlistColumn::YearHighVsCurrent,
];

const LOW_COLUMNS: [WatchlistColumn; 4] = [
    WatchlistColumn::DayLow,
    WatchlistColumn::NearLowVsCurrent,
    WatchlistColumn::YearLow,
    WatchlistColumn::YearLowVsCurrent,
];

impl WatchlistColumn {
    /// Column header.
    pub fn header(&self) -> &'static str {
        match self {
            WatchlistColumn::Symbol => "SYMBOL",
            WatchlistColumn::Exchange => "EXCH",
            WatchlistColumn::AlertPrice => "ALERT",
            WatchlistColumn::Price => "PRICE",
            WatchlistColumn::CurrentVsAlert => "VS ALERT",
            WatchlistColumn::PreviousClose => "PREV CLOSE",
            WatchlistColumn::ChangePercent => "CHG%",
            WatchlistColumn::DayHigh => "DAY HIGH",
            WatchlistColumn::NearHighVsCurrent => "VS DAY HI",
            WatchlistColumn::YearHigh => "YEAR HIGH",
            WatchlistColumn::YearHighVsCurrent => "VS YR HI",
            WatchlistColumn::DayLow => "DAY LOW",
            WatchlistColumn::NearLowVsCurrent => "VS DAY LO",
            WatchlistColumn::YearLow => "YEAR LOW",
            WatchlistColumn::YearLowVsCurrent => "VS YR LO",
        }
    }

    /// Whether the column holds a percentage.
    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            WatchlistColumn::CurrentVsAlert
                | WatchlistColumn::ChangePercent
                | WatchlistColumn::NearHighVsCurrent
                | WatchlistColumn::YearHighVsCurrent
                | WatchlistColumn::NearLowVsCurrent
                | WatchlistColumn::YearLowVsCurrent
        )
    }

    /// Numeric value of the column for a row; `None` for text columns and
    /// missing data.
    pub fn value(&self, t: &WatchlistTicker) -> Option<f64> {
        match self {
            WatchlistColumn::Symbol | WatchlistColumn::Exchange => None,
            WatchlistColumn::AlertPrice => t.alert_price,
            WatchlistColumn::Price => t.price,
            WatchlistColumn::CurrentVsAlert => t.current_vs_alert_price_percentage,
            WatchlistColumn::PreviousClose => t.previous_close,
            WatchlistColumn::ChangePercent => t.changes_percentage,
            WatchlistColumn::DayHigh => t.day_high,
            WatchlistColumn::NearHighVsCurrent => t.near_high_vs_current_percentage,
            WatchlistColumn::YearHigh => t.year_high,
            WatchlistColumn::YearHighVsCurrent => t.year_high_vs_current_percentage,
            WatchlistColumn::DayLow => t.day_low,
            WatchlistColumn::NearLowVsCurrent => t.near_low_vs_current_percentage,
            WatchlistColumn::YearLow => t.year_low,
            WatchlistColumn::YearLowVsCurrent => t.year_low_vs_current_percentage,
        }
    }
}

/// Columns shown for a view mode: the core set plus high and/or low
/// metrics.
pub fn columns_for_view(mode: ViewMode) -> Vec<WatchlistColumn> {
    let mut columns = CORE_COLUMNS.to_vec();
    match mode {
        ViewMode::Full => {
            columns.extend(HIGH_COLUMNS);
            columns.extend(LOW_COLUMNS);
        }
        ViewMode::High => columns.extend(HIGH_COLUMNS),
        ViewMode::Low => columns.extend(LOW_COLUMNS),
    }
    columns
}

/// Column and direction a table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableSort {
    pub column: WatchlistColumn,
    pub direction: SortDirection,
}

impl TableSort {
    /// Clicking a header: the sorted column flips from ascending to
    /// descending, anything else starts ascending.
    pub fn request(&mut self, column: WatchlistColumn) {
        self.direction = if self.column == column {
            self.direction.toggle()
        } else {
            SortDirection::Ascending
        };
        self.column = column;
    }
}

/// Sort rows in place.
pub fn sort_tickers(tickers: &mut [WatchlistTicker], sort: TableSort) {
    let direction = sort.direction;
    tickers.sort_by(|a, b| match sort.column {
        WatchlistColumn::Symbol => apply_direction(a.symbol.cmp(&b.symbol), direction),
        WatchlistColumn::Exchange => apply_direction(a.exchange.cmp(&b.exchange), direction),
        column => compare_optional(column.value(a), column.value(b), direction),
    });
}

/// Watchlists in backend order, with one of them selected.
#[derive(Debug, Clone, Default)]
pub struct WatchlistBook {
    lists: Vec<Watchlist>,
    selected: Option<String>,
}

impl WatchlistBook {
    /// Build from the backend's list; the first watchlist is selected.
    pub fn from_watchlists(lists: Vec<Watchlist>) -> Self {
        let selected = lists.first().map(|wl| wl.name.clone());
        Self { lists, selected }
    }

    /// Fetch every watchlist of the user.
    pub async fn load(client: &BackendClient, user_id: &str) -> Result<Self, BookError> {
        let lists = client.watchlists_for_user(user_id).await?;
        info!(count = lists.len(), "loaded watchlists");
        Ok(Self::from_watchlists(lists))
    }

    pub fn watchlists(&self) -> &[Watchlist] {
        &self.lists
    }

    pub fn get(&self, name: &str) -> Option<&Watchlist> {
        self.lists.iter().find(|wl| wl.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Watchlist> {
        self.lists.iter_mut().find(|wl| wl.name == name)
    }

    pub fn selected(&self) -> Option<&Watchlist> {
        self.selected.as_deref().and_then(|name| self.get(name))
    }

    /// Select a watchlist by name. Returns false if there is none.
    pub fn select(&mut self, name: &str) -> bool {
        if self.get(name).is_some() {
            self.selected = Some(name.to_string());
            true
        } else {
            false
        }
    }

    /// Trim and validate a new watchlist name against the existing ones.
    pub fn check_new_name(&self, name: &str) -> Result<String, BookError> {
        let trimmed = name.trim();
        if self.get(trimmed).is_some() {
            return Err(BookError::DuplicateWatchlist);
        }
        Ok(validate::collection_name("Watchlist", trimmed)?)
    }

    /// Add an empty watchlist locally and select it.
    pub fn insert_empty(&mut self, name: &str, user_id: &str) {
        self.lists.push(Watchlist {
            name: name.to_string(),
            user_id: user_id.to_string(),
            tickers: Vec::new(),
        });
        self.selected = Some(name.to_string());
    }

    /// Drop a watchlist locally; the first remaining one becomes selected.
    pub fn remove(&mut self, name: &str) -> Option<Watchlist> {
        let idx = self.lists.iter().position(|wl| wl.name == name)?;
        let removed = self.lists.remove(idx);
        self.selected = self.lists.first().map(|wl| wl.name.clone());
        Some(removed)
    }

    /// Drop tickers locally. Returns the symbols actually removed.
    pub fn remove_symbols(&mut self, name: &str, symbols: &[String]) -> Vec<String> {
        let Some(wl) = self.get_mut(name) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        wl.tickers.retain(|t| {
            if symbols.iter().any(|s| s.eq_ignore_ascii_case(&t.symbol)) {
                removed.push(t.symbol.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Swap in a freshly fetched copy of a watchlist.
    pub fn replace(&mut self, watchlist: Watchlist) {
        match self.get_mut(&watchlist.name) {
            Some(existing) => *existing = watchlist,
            None => self.lists.push(watchlist),
        }
    }

    /// Validate every edited alert price before anything is sent.
    /// `edits` pairs a symbol with the price as typed.
    pub fn prepare_alert_edits(
        &self,
        name: &str,
        edits: &[(String, String)],
    ) -> Result<Vec<MinimalWatchlistTicker>, BookError> {
        let wl = self
            .get(name)
            .ok_or_else(|| BookError::UnknownWatchlist(name.to_string()))?;

        let mut tickers = Vec::with_capacity(edits.len());
        let mut first_error = None;
        for (symbol, typed) in edits {
            let existing = wl
                .tickers
                .iter()
                .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
                .ok_or_else(|| BookError::UnknownSymbol(symbol.clone()))?;
            match validate::price("Alert price", typed) {
                Ok(price) => tickers.push(MinimalWatchlistTicker {
                    alert_price: Some(price),
                    ..existing.minimal()
                }),
                Err(source) => {
                    warn!(%symbol, %source, "invalid alert price");
                    first_error.get_or_insert(BookError::InvalidAlert {
                        symbol: symbol.clone(),
                        source,
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(tickers),
        }
    }

    /// Create a watchlist on the backend, then locally.
    pub async fn create(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
    ) -> Result<String, BookError> {
        let name = self.check_new_name(name)?;
        let id = client
            .create_watchlist(
                user_id,
                &Watchlist {
                    name: name.clone(),
                    user_id: user_id.to_string(),
                    tickers: Vec::new(),
                },
            )
            .await?;
        if id.is_empty() {
            return Err(BookError::EmptyCreateResult);
        }

        self.insert_empty(&name, user_id);
        info!(watchlist = %name, %id, "created watchlist");
        Ok(id)
    }

    /// Remove a watchlist locally first; a failed backend delete is only
    /// logged.
    pub async fn delete(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
    ) -> Result<(), BookError> {
        self.remove(name)
            .ok_or_else(|| BookError::UnknownWatchlist(name.to_string()))?;

        match client.delete_watchlist(user_id, name).await {
            Ok(result) if result.acknowledged => {
                info!(watchlist = %name, deleted = result.deleted_count, "deleted watchlist")
            }
            Ok(_) => warn!(watchlist = %name, "backend did not acknowledge delete"),
            Err(e) => warn!(watchlist = %name, error = %e, "backend delete failed"),
        }
        Ok(())
    }

    /// Add a ticker with an alert price, then refresh the watchlist from
    /// the backend.
    pub async fn add_ticker(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
        symbol: &str,
        alert_price: &str,
    ) -> Result<(), BookError> {
        if self.get(name).is_none() {
            return Err(BookError::UnknownWatchlist(name.to_string()));
        }
        let alert_price = validate::price("Alert price", alert_price)?;
        let symbol = symbol.trim().to_uppercase();

        if client.quote(&symbol).await.is_err() {
            return Err(BookError::UnknownSymbol(symbol));
        }

        let ticker = MinimalWatchlistTicker {
            symbol: symbol.clone(),
            alert_price: Some(alert_price),
        };
        client.add_to_watchlist(user_id, name, &ticker).await?;

        let fresh = client.watchlist(user_id, name).await?;
        self.replace(fresh);
        info!(watchlist = %name, %symbol, alert_price, "added ticker");
        Ok(())
    }

    /// Remove tickers locally first; a failed backend patch is only logged.
    pub async fn remove_tickers(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
        symbols: &[String],
    ) -> Result<Vec<String>, BookError> {
        if self.get(name).is_none() {
            return Err(BookError::UnknownWatchlist(name.to_string()));
        }
        let removed = self.remove_symbols(name, symbols);
        if removed.is_empty() {
            return Ok(removed);
        }

        // Send the symbols as stored; the backend matches them exactly.
        match client.remove_from_watchlist(user_id, name, &removed).await {
            Ok(result) if result.modified_count == 0 => {
                warn!(watchlist = %name, symbols = ?removed, "backend removed no tickers")
            }
            Ok(_) => info!(watchlist = %name, symbols = ?removed, "removed tickers"),
            Err(e) => warn!(watchlist = %name, error = %e, "backend ticker removal failed"),
        }
        Ok(removed)
    }

    /// Update alert prices for several tickers at once.
    pub async fn edit_alerts(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
        edits: &[(String, String)],
    ) -> Result<(), BookError> {
        let tickers = self.prepare_alert_edits(name, edits)?;
        client.edit_alert_prices(user_id, name, &tickers).await?;

        let fresh = client.watchlist(user_id, name).await?;
        self.replace(fresh);
        info!(watchlist = %name, count = tickers.len(), "updated alert prices");
        Ok(())
    }
}
