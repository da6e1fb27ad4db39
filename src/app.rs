//! Application state and command handlers.

use crate::api::BackendClient;
use crate::cli::{
    Args, Command, ExportFormat, ExportTarget, NotificationsCommand, PositionSortField, PositionsCommand,
    SortField, Toggle, UserCommand, WatchlistCommand,
};
use crate::config::{self, Config};
use crate::error::BookError;
use crate::export;
use crate::limiter::RequestPacer;
use crate::models::{SortDirection, ViewMode};
use crate::notifications::{self, DailyDismissals, Poller};
use crate::positions::{NewPosition, PositionBook, PositionColumn, sort_positions};
use crate::render;
use crate::search::{self, Debouncer};
use crate::watchlist::{TableSort, WatchlistBook};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Application state for one invocation.
pub struct App {
    /// Backend client, shared with debounced search tasks
    client: Arc<BackendClient>,
    /// Loaded configuration
    config: Config,
    /// Where the configuration is saved
    config_path: Option<PathBuf>,
    /// User id, resolved from the token on first use when not configured
    user_id: Option<String>,
    /// Watchlist table sort
    sort: TableSort,
    /// Watchlist view mode
    view: ViewMode,
}

impl App {
    /// Create a new application from CLI args and config. Flags win over
    /// the config file.
    pub fn new(args: &Args, config: Config) -> Result<Self> {
        let base_url = args
            .api_url
            .clone()
            .unwrap_or_else(|| config.api.base_url.clone());
        let token = args.token.clone().or_else(|| config.api.token.clone());
        let timeout = Duration::from_secs(args.timeout.unwrap_or(config.api.timeout));
        let pace = args.pace.unwrap_or_else(|| config.limiter.min_spacing());

        let client = BackendClient::new(&base_url, token, timeout, RequestPacer::new(pace))?;
        debug!(%base_url, pace = %humantime::format_duration(pace), "backend client ready");

        let saved = SortField::from_name(&config.display.sort_by).unwrap_or_else(|| {
            warn!(sort_by = %config.display.sort_by, "unknown sort column in config");
            SortField::default()
        });
        let field = args.sort.unwrap_or(saved);
        // The saved direction belongs to the saved column only.
        let base = if field == saved && config.display.sort_descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let column = field.into();
        let direction = args.sort_direction(base);
        let view = args.view.map(Into::into).unwrap_or(config.display.view_mode);

        Ok(Self {
            client: Arc::new(client),
            user_id: args.user_id.clone().or_else(|| config.api.user_id.clone()),
            config,
            config_path: args.config.clone().or_else(Config::default_config_path),
            sort: TableSort { column, direction },
            view,
        })
    }

    /// The signed-in user's id.
    async fn user_id(&mut self) -> Result<String> {
        if let Some(id) = &self.user_id {
            return Ok(id.clone());
        }
        let user = self.client.user_details().await?;
        if user.uid.is_empty() {
            bail!("Backend returned no user id for this token");
        }
        info!(uid = %user.uid, "resolved user id");
        self.user_id = Some(user.uid.clone());
        Ok(user.uid)
    }

    /// Run one command.
    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Watchlist(cmd) => self.watchlist(cmd).await,
            Command::Positions(cmd) => self.positions(cmd).await,
            Command::Notifications(cmd) => self.notifications(cmd).await,
            Command::Search {
                query,
                stdin,
                debounce,
            } => {
                if stdin {
                    self.search_stdin(debounce).await
                } else {
                    let query = query.ok_or_else(|| anyhow!("Provide a query or use --stdin"))?;
                    self.search_once(&query).await
                }
            }
            Command::Quote { symbol } => {
                let quote = self.client.quote(symbol.trim()).await?;
                print!("{}", render::quote(&quote));
                Ok(())
            }
            Command::User(cmd) => self.user(cmd).await,
            Command::Export {
                target,
                name,
                format,
            } => self.export(target, name.as_deref(), format).await,
            Command::SampleConfig => {
                print!("{}", config::sample_config());
                Ok(())
            }
        }
    }

    async fn watchlist(&mut self, cmd: WatchlistCommand) -> Result<()> {
        // Sorting is local; it needs neither a user nor the backend.
        if let WatchlistCommand::Sort { column } = cmd {
            return self.remember_sort(column);
        }

        let user_id = self.user_id().await?;
        let mut book = WatchlistBook::load(&self.client, &user_id).await?;

        match cmd {
            WatchlistCommand::List => {
                if book.watchlists().is_empty() {
                    println!("No watchlists yet.");
                }
                for wl in book.watchlists() {
                    println!("{:<30} {:>4} tickers", wl.name, wl.tickers.len());
                }
            }
            WatchlistCommand::Show { name } => {
                if let Some(name) = &name {
                    if !book.select(name) {
                        return Err(BookError::UnknownWatchlist(name.clone()).into());
                    }
                }
                let wl = book
                    .selected()
                    .ok_or_else(|| anyhow!("No watchlists yet. Create one with `tickerwatch watchlist create`."))?;
                print!("{}", render::watchlist_table(wl, self.view, self.sort));
            }
            WatchlistCommand::Create { name } => {
                book.create(&self.client, &user_id, &name).await?;
                println!("Created watchlist \"{}\"", name.trim());
            }
            WatchlistCommand::Delete { name } => {
                book.delete(&self.client, &user_id, &name).await?;
                println!("Deleted watchlist \"{}\"", name);
            }
            WatchlistCommand::Add {
                name,
                symbol,
                alert,
            } => {
                book.add_ticker(&self.client, &user_id, &name, &symbol, &alert)
                    .await?;
                self.print_watchlist(&book, &name);
            }
            WatchlistCommand::Remove { name, symbols } => {
                let removed = book
                    .remove_tickers(&self.client, &user_id, &name, &symbols)
                    .await?;
                if removed.is_empty() {
                    println!("No matching tickers in \"{}\"", name);
                } else {
                    println!("Removed {} from \"{}\"", removed.join(", "), name);
                }
            }
            WatchlistCommand::Sort { .. } => unreachable!("sort returns before loading"),
            WatchlistCommand::SetAlert { name, edits } => {
                book.edit_alerts(&self.client, &user_id, &name, &edits).await?;
                self.print_watchlist(&book, &name);
            }
        }
        Ok(())
    }

    /// Apply a sort request and save it as the default.
    fn remember_sort(&mut self, field: SortField) -> Result<()> {
        let path = self
            .config_path
            .clone()
            .ok_or_else(|| anyhow!("Could not determine the config directory"))?;

        self.sort.request(field.into());
        self.config.display.sort_by = field.name();
        self.config.display.sort_descending = self.sort.direction == SortDirection::Descending;
        self.config.save(&path)?;

        println!(
            "Sorting watchlists by {}{}",
            self.sort.column.header(),
            self.sort.direction.arrow()
        );
        Ok(())
    }

    fn print_watchlist(&self, book: &WatchlistBook, name: &str) {
        if let Some(wl) = book.get(name) {
            print!("{}", render::watchlist_table(wl, self.view, self.sort));
        }
    }

    async fn positions(&mut self, cmd: PositionsCommand) -> Result<()> {
        let user_id = self.user_id().await?;
        let mut book = PositionBook::load(&self.client, &user_id).await?;

        match cmd {
            PositionsCommand::List => {
                if book.sets().is_empty() {
                    println!("No position sets yet.");
                }
                for set in book.sets() {
                    println!("{:<30} {:>4} positions", set.name, set.tickers.len());
                }
            }
            PositionsCommand::Show {
                name,
                by,
                ascending,
            } => {
                if let Some(name) = &name {
                    if !book.select(name) {
                        return Err(BookError::UnknownPositionSet(name.clone()).into());
                    }
                }
                let mut set = book
                    .selected()
                    .cloned()
                    .ok_or_else(|| anyhow!("No position sets yet. Create one with `tickerwatch positions create`."))?;
                let column = PositionColumn::from(by);
                let direction = if ascending {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                };
                sort_positions(&mut set.tickers, column, direction);
                print!("{}", render::positions_table(&set, column));
            }
            PositionsCommand::Create { name } => {
                book.create(&self.client, &user_id, &name).await?;
                println!("Created position set \"{}\"", name.trim());
            }
            PositionsCommand::Delete { name } => {
                book.delete(&self.client, &user_id, &name).await?;
                println!("Deleted position set \"{}\"", name);
            }
            PositionsCommand::Add {
                name,
                symbol,
                price,
                quantity,
                date,
                target,
            } => {
                let new_position = NewPosition {
                    symbol,
                    purchase_price: price,
                    quantity,
                    purchase_date: date.map(start_of_day),
                    target_sell_price: target,
                };
                let added = book
                    .add(&self.client, &user_id, &name, &new_position)
                    .await?;
                println!(
                    "Added {} x{} at {} to \"{}\"",
                    added.symbol,
                    added.quantity,
                    render::format_currency(added.purchase_price),
                    name
                );
            }
            PositionsCommand::Remove { name, ids } => {
                book.remove(&self.client, &user_id, &name, &ids).await?;
                println!("Removed {} position(s) from \"{}\"", ids.len(), name);
            }
        }
        Ok(())
    }

    async fn notifications(&mut self, cmd: NotificationsCommand) -> Result<()> {
        let user_id = self.user_id().await?;
        let near = self.config.notifications.near_threshold_percent;

        match cmd {
            NotificationsCommand::Show { json } => {
                let mut buckets = notifications::refresh(&self.client, &user_id, near).await?;
                let store = DailyDismissals::load(&dismissals_path()?)?;
                let left = store.hide_dismissed(&mut buckets, Local::now().date_naive());
                debug!(left, "hid dismissed alerts");
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&buckets)
                            .context("Failed to serialize notifications")?
                    );
                } else {
                    print!("{}", render::notifications(&buckets));
                }
            }
            NotificationsCommand::Watch { interval } => {
                let interval = interval.unwrap_or_else(|| self.config.notifications.poll_interval());
                let poller = Poller::new(interval, near);
                info!(interval = %humantime::format_duration(poller.interval()), "watching notifications");

                let shutdown = async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for ctrl-c");
                        std::future::pending::<()>().await;
                    }
                };
                poller
                    .run(
                        &self.client,
                        &user_id,
                        |buckets| println!("{}", render::notifications(buckets)),
                        shutdown,
                    )
                    .await;
            }
            NotificationsCommand::Popup => {
                let buckets = notifications::refresh(&self.client, &user_id, near).await?;
                let path = dismissals_path()?;
                let mut store = DailyDismissals::load(&path)?;
                let today = Local::now().date_naive();

                let shown = store.popup(&buckets, today, self.config.notifications.popup_limit);
                print!("{}", render::popup(&shown));

                // A shown popup counts as seen for the rest of the day.
                let symbols: Vec<String> = shown.iter().map(|n| n.symbol.clone()).collect();
                for symbol in &symbols {
                    store.dismiss(today, symbol);
                }
                store.prune_before(today);
                store.save(&path)?;
            }
            NotificationsCommand::Dismiss { symbol } => {
                let path = dismissals_path()?;
                let mut store = DailyDismissals::load(&path)?;
                let today = Local::now().date_naive();
                if store.dismiss(today, symbol.trim()) {
                    println!("Dismissed {} for today", symbol.trim().to_uppercase());
                } else {
                    println!("{} was already dismissed today", symbol.trim().to_uppercase());
                }
                store.prune_before(today);
                store.save(&path)?;
            }
        }
        Ok(())
    }

    async fn search_once(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Ok(());
        }
        let results = self.client.search(query.trim()).await?;
        let hits = search::filter_results(&results, query);
        print!("{}", render::search_results(&hits));
        if let Some(best) = search::pick(&results, query) {
            println!("Best match: {}", best.symbol);
        }
        Ok(())
    }

    /// Treat each stdin line as the query typed so far; only a query that
    /// stays unchanged for the debounce period is sent.
    async fn search_stdin(&self, debounce: Duration) -> Result<()> {
        let debouncer = Debouncer::new(debounce);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            let debouncer = debouncer.clone();
            let client = Arc::clone(&self.client);
            pending.push(tokio::spawn(async move {
                if !debouncer.settle().await {
                    return Ok(());
                }
                let query = line.trim();
                if query.is_empty() {
                    return Ok(());
                }
                let results = client.search(query).await?;
                let hits = search::filter_results(&results, query);
                println!("> {}", query);
                print!("{}", render::search_results(&hits));
                Ok::<(), anyhow::Error>(())
            }));
        }

        for task in pending {
            task.await.context("Search task panicked")??;
        }
        Ok(())
    }

    async fn user(&mut self, cmd: UserCommand) -> Result<()> {
        match cmd {
            UserCommand::Info => {
                let user = self.client.user_details().await?;
                println!("User ID: {}", user.uid);
                println!("Name:    {}", user.display_name);
                println!("Email:   {}", user.email);
                if let Some(phone) = user.phone_number.filter(|p| !p.is_empty()) {
                    println!("Phone:   {}", phone);
                }
                if let Some(photo) = user.photo_url.filter(|p| !p.is_empty()) {
                    println!("Photo:   {}", photo);
                }
            }
            UserCommand::Ensure => {
                let user = self.client.ensure_user().await?;
                println!("User {} is registered", user.uid);
            }
            UserCommand::Notifications { state } => {
                if let Some(toggle) = state {
                    self.client
                        .set_notifications(toggle == Toggle::On)
                        .await?;
                }
                let setting = self.client.notification_setting().await?;
                println!(
                    "Notifications are {}",
                    if setting.notifications { "on" } else { "off" }
                );
            }
        }
        Ok(())
    }

    async fn export(
        &mut self,
        target: ExportTarget,
        name: Option<&str>,
        format: ExportFormat,
    ) -> Result<()> {
        let user_id = self.user_id().await?;
        let output = match target {
            ExportTarget::Watchlist => {
                let book = WatchlistBook::load(&self.client, &user_id).await?;
                let lists = match name {
                    Some(name) => vec![
                        book.get(name)
                            .cloned()
                            .ok_or_else(|| BookError::UnknownWatchlist(name.to_string()))?,
                    ],
                    None => book.watchlists().to_vec(),
                };
                export::export_watchlists(&lists, format)?
            }
            ExportTarget::Positions => {
                let book = PositionBook::load(&self.client, &user_id).await?;
                let mut sets = match name {
                    Some(name) => vec![
                        book.get(name)
                            .cloned()
                            .ok_or_else(|| BookError::UnknownPositionSet(name.to_string()))?,
                    ],
                    None => book.sets().to_vec(),
                };
                for set in &mut sets {
                    sort_positions(
                        &mut set.tickers,
                        PositionSortField::PurchaseDate.into(),
                        SortDirection::Descending,
                    );
                }
                export::export_positions(&sets, format)?
            }
        };
        print!("{}", output);
        Ok(())
    }
}

fn start_of_day(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn dismissals_path() -> Result<PathBuf> {
    DailyDismissals::default_path().ok_or_else(|| anyhow!("Could not determine the user data directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchlist::WatchlistColumn;
    use clap::Parser;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.display.sort_by = "price".to_string();
        config.display.view_mode = ViewMode::Low;
        config.api.user_id = Some("from-config".to_string());

        let args = Args::parse_from([
            "tickerwatch",
            "--user-id",
            "from-flag",
            "--view",
            "high",
            "watchlist",
            "list",
        ]);
        let app = App::new(&args, config).unwrap();
        assert_eq!(app.user_id.as_deref(), Some("from-flag"));
        assert_eq!(app.view, ViewMode::High);
        assert_eq!(app.sort.column, WatchlistColumn::Price);
        assert_eq!(app.sort.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_unknown_config_sort_falls_back() {
        let mut config = Config::default();
        config.display.sort_by = "bogus".to_string();
        config.display.sort_descending = true;

        let args = Args::parse_from(["tickerwatch", "watchlist", "list"]);
        let app = App::new(&args, config).unwrap();
        assert_eq!(app.sort.column, WatchlistColumn::Symbol);
        assert_eq!(app.sort.direction, SortDirection::Descending);
    }

    fn saved_price_descending() -> Config {
        let mut config = Config::default();
        config.display.sort_by = "price".to_string();
        config.display.sort_descending = true;
        config
    }

    #[test]
    fn test_saved_direction_applies_to_saved_column() {
        let args = Args::parse_from(["tickerwatch", "watchlist", "list"]);
        let app = App::new(&args, saved_price_descending()).unwrap();
        assert_eq!(app.sort.column, WatchlistColumn::Price);
        assert_eq!(app.sort.direction, SortDirection::Descending);

        let args = Args::parse_from(["tickerwatch", "--sort", "price", "watchlist", "list"]);
        let app = App::new(&args, saved_price_descending()).unwrap();
        assert_eq!(app.sort.direction, SortDirection::Descending);
    }

    #[test]
    fn test_other_column_starts_ascending() {
        let args = Args::parse_from(["tickerwatch", "--sort", "symbol", "watchlist", "list"]);
        let app = App::new(&args, saved_price_descending()).unwrap();
        assert_eq!(app.sort.column, WatchlistColumn::Symbol);
        assert_eq!(app.sort.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_reverse_flips_saved_direction() {
        let args = Args::parse_from(["tickerwatch", "--reverse", "watchlist", "list"]);
        let app = App::new(&args, saved_price_descending()).unwrap();
        assert_eq!(app.sort.direction, SortDirection::Ascending);

        let args = Args::parse_from(["tickerwatch", "-r", "watchlist", "list"]);
        let app = App::new(&args, Config::default()).unwrap();
        assert_eq!(app.sort.direction, SortDirection::Descending);
    }

    #[test]
    fn test_start_of_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(start_of_day(date).to_rfc3339(), "2024-03-05T00:00:00+00:00");
    }
}
