//! Purchased-stock position sets.

use crate::api::BackendClient;
use crate::error::BookError;
use crate::models::{
    PositionSet, PositionTicker, SortDirection, apply_direction, compare_optional,
};
use crate::validate;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::{debug, info};

/// A sortable positions table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionColumn {
    PurchaseDate,
    #[default]
    Symbol,
    Quantity,
    PurchasePrice,
    Price,
    PriceChange,
    GainOrLoss,
    MarketValue,
}

impl PositionColumn {
    pub fn header(&self) -> &'static str {
        match self {
            PositionColumn::PurchaseDate => "DATE",
            PositionColumn::Symbol => "SYMBOL",
            PositionColumn::Quantity => "QTY",
            PositionColumn::PurchasePrice => "PAID",
            PositionColumn::Price => "PRICE",
            PositionColumn::PriceChange => "CHANGE",
            PositionColumn::GainOrLoss => "GAIN/LOSS",
            PositionColumn::MarketValue => "MKT VALUE",
        }
    }
}

/// Sort positions in place. Missing purchase dates go last.
pub fn sort_positions(
    positions: &mut [PositionTicker],
    column: PositionColumn,
    direction: SortDirection,
) {
    positions.sort_by(|a, b| match column {
        PositionColumn::PurchaseDate => compare_dates(a.purchase_date, b.purchase_date, direction),
        PositionColumn::Symbol => apply_direction(a.symbol.cmp(&b.symbol), direction),
        PositionColumn::Quantity => apply_direction(a.quantity.cmp(&b.quantity), direction),
        PositionColumn::PurchasePrice => {
            compare_optional(Some(a.purchase_price), Some(b.purchase_price), direction)
        }
        PositionColumn::Price => compare_optional(Some(a.price), Some(b.price), direction),
        PositionColumn::PriceChange => {
            compare_optional(Some(a.price_change), Some(b.price_change), direction)
        }
        PositionColumn::GainOrLoss => {
            compare_optional(Some(a.gain_or_loss), Some(b.gain_or_loss), direction)
        }
        PositionColumn::MarketValue => {
            compare_optional(Some(a.market_value), Some(b.market_value), direction)
        }
    });
}

fn compare_dates(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => apply_direction(x.cmp(&y), direction),
    }
}

/// Cost, value and gain/loss summed over a set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionTotals {
    pub cost_basis: f64,
    pub market_value: f64,
    pub gain_or_loss: f64,
}

impl PositionTotals {
    pub fn of(positions: &[PositionTicker]) -> Self {
        positions.iter().fold(Self::default(), |acc, p| Self {
            cost_basis: acc.cost_basis + p.cost_basis(),
            market_value: acc.market_value + p.market_value,
            gain_or_loss: acc.gain_or_loss + p.gain_or_loss,
        })
    }

    pub fn gain_or_loss_percent(&self) -> f64 {
        if self.cost_basis == 0.0 {
            0.0
        } else {
            self.gain_or_loss / self.cost_basis * 100.0
        }
    }
}

/// Input for a new purchase, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct NewPosition {
    pub symbol: String,
    pub purchase_price: String,
    pub quantity: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub target_sell_price: Option<String>,
}

impl NewPosition {
    /// Validate every field and build the ticker to store.
    pub fn validate(&self) -> Result<PositionTicker, BookError> {
        let purchase_price = validate::price("Purchase price", &self.purchase_price)?;
        let quantity = validate::quantity(&self.quantity)?;
        let purchase_date = validate::purchase_date(self.purchase_date)?;
        let target_sell_price = self
            .target_sell_price
            .as_deref()
            .map(|p| validate::price("Target sell price", p))
            .transpose()?;

        Ok(PositionTicker {
            symbol: self.symbol.trim().to_uppercase(),
            purchase_price,
            quantity,
            purchase_date: Some(purchase_date),
            target_sell_price,
            ..Default::default()
        })
    }
}

/// Position sets in backend order, with one selected.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    sets: Vec<PositionSet>,
    selected: Option<String>,
}

impl PositionBook {
    pub fn from_sets(mut sets: Vec<PositionSet>) -> Self {
        for set in &mut sets {
            set.tickers.iter_mut().for_each(PositionTicker::refresh_derived);
        }
        let selected = sets.first().map(|s| s.name.clone());
        Self { sets, selected }
    }

    pub async fn load(client: &BackendClient, user_id: &str) -> Result<Self, BookError> {
        let sets = client.position_sets_for_user(user_id).await?;
        info!(count = sets.len(), "loaded position sets");
        Ok(Self::from_sets(sets))
    }

    pub fn sets(&self) -> &[PositionSet] {
        &self.sets
    }

    pub fn get(&self, name: &str) -> Option<&PositionSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut PositionSet> {
        self.sets.iter_mut().find(|s| s.name == name)
    }

    pub fn selected(&self) -> Option<&PositionSet> {
        self.selected.as_deref().and_then(|name| self.get(name))
    }

    pub fn select(&mut self, name: &str) -> bool {
        if self.get(name).is_some() {
            self.selected = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn check_new_name(&self, name: &str) -> Result<String, BookError> {
        let trimmed = name.trim();
        if self.get(trimmed).is_some() {
            return Err(BookError::DuplicatePositionSet);
        }
        Ok(validate::collection_name("Position", trimmed)?)
    }

    /// The set's tickers with `position` appended, or an error if the
    /// symbol is already held in that set.
    pub fn with_added(
        &self,
        name: &str,
        position: PositionTicker,
    ) -> Result<Vec<PositionTicker>, BookError> {
        let set = self
            .get(name)
            .ok_or_else(|| BookError::UnknownPositionSet(name.to_string()))?;
        if set
            .tickers
            .iter()
            .any(|t| t.symbol.eq_ignore_ascii_case(&position.symbol))
        {
            return Err(BookError::DuplicatePosition {
                symbol: position.symbol,
                set: name.to_string(),
            });
        }
        let mut tickers = set.tickers.clone();
        tickers.push(position);
        Ok(tickers)
    }

    /// Unique symbols behind a selection of position ids, in selection
    /// order.
    pub fn symbols_for_ids(&self, name: &str, ids: &[String]) -> Vec<String> {
        let Some(set) = self.get(name) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = Vec::new();
        for id in ids {
            if let Some(p) = set.tickers.iter().find(|t| &t.position_id() == id) {
                if !symbols.contains(&p.symbol) {
                    symbols.push(p.symbol.clone());
                }
            }
        }
        symbols
    }

    /// Drop the selected purchases from every set.
    pub fn remove_ids(&mut self, ids: &[String]) {
        for set in &mut self.sets {
            set.tickers.retain(|t| !ids.contains(&t.position_id()));
        }
    }

    pub async fn create(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
    ) -> Result<String, BookError> {
        let name = self.check_new_name(name)?;
        let set = PositionSet {
            name: name.clone(),
            user_id: user_id.to_string(),
            tickers: Vec::new(),
        };
        let id = client.create_position_set(&set).await?;
        if id.is_empty() {
            return Err(BookError::EmptyCreateResult);
        }

        self.sets.push(set);
        self.selected = Some(name.clone());
        info!(set = %name, %id, "created position set");
        Ok(id)
    }

    pub async fn delete(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
    ) -> Result<(), BookError> {
        let idx = self
            .sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| BookError::UnknownPositionSet(name.to_string()))?;
        client.delete_position_set(user_id, name).await?;
        self.sets.remove(idx);
        self.selected = self.sets.first().map(|s| s.name.clone());
        Ok(())
    }

    /// Record a purchase. The whole ticker list is sent back to the
    /// backend, and the set as the backend now holds it replaces the local
    /// copy.
    pub async fn add(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
        new_position: &NewPosition,
    ) -> Result<PositionTicker, BookError> {
        let mut position = new_position.validate()?;

        let quote = client
            .quote(&position.symbol)
            .await
            .map_err(|_| BookError::UnknownSymbol(position.symbol.clone()))?;
        if let Some(price) = quote.price {
            position.price = price;
            position.refresh_derived();
        }

        let tickers = self.with_added(name, position.clone())?;
        let fresh = match client.replace_positions(user_id, name, &tickers).await? {
            Some(set) => set,
            None => client.position_set(user_id, name).await?,
        };

        if let Some(set) = self.get_mut(name) {
            set.tickers = fresh.tickers;
            set.tickers.iter_mut().for_each(PositionTicker::refresh_derived);
        }
        info!(set = %name, symbol = %position.symbol, "added position");
        Ok(position)
    }

    /// Delete purchases by id. The backend removes by symbol; unless it
    /// reports both a match and a modification, nothing changes locally.
    pub async fn remove(
        &mut self,
        client: &BackendClient,
        user_id: &str,
        name: &str,
        ids: &[String],
    ) -> Result<(), BookError> {
        if self.get(name).is_none() {
            return Err(BookError::UnknownPositionSet(name.to_string()));
        }
        let symbols = self.symbols_for_ids(name, ids);
        debug!(?symbols, "removing positions");

        let result = client.remove_positions(user_id, name, &symbols).await?;
        if result.matched_count == 0 || result.modified_count == 0 {
            return Err(BookError::DeleteFailed);
        }

        self.remove_ids(ids);
        Ok(())
    }
}
