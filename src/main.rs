//! tickerwatch - stock watchlists, price alerts and positions from the
//! terminal.

mod alerts;
mod api;
mod app;
mod cli;
mod config;
mod error;
mod export;
mod limiter;
mod models;
mod notifications;
mod positions;
mod render;
mod search;
mod validate;
mod watchlist;

use anyhow::Result;
use app::App;
use cli::Args;
use config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();
    init_tracing(args.verbose);

    // Load configuration
    let config = if let Some(ref path) = args.config {
        Config::load(path)?
    } else {
        Config::load_or_default()
    };

    let mut app = App::new(&args, config)?;
    app.run(args.command.clone()).await
}

/// Log to stderr so command output stays pipeable. `RUST_LOG` overrides
/// the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tickerwatch=debug"
    } else {
        "tickerwatch=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
