//! Price-alert notifications: refresh, polling and the daily popup.

use crate::alerts::{self, AlertLevel, Notification, NotificationBuckets};
use crate::api::BackendClient;
use crate::error::BookError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// How often alerts are re-evaluated.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Exact matches shown by the daily popup at most.
pub const DEFAULT_POPUP_LIMIT: usize = 3;

/// Fetch the user's watchlists and notification setting and bucket the
/// alerts. With notifications off, or a setting that cannot be fetched,
/// every bucket is empty.
pub async fn refresh(
    client: &BackendClient,
    user_id: &str,
    near_threshold: f64,
) -> Result<NotificationBuckets, BookError> {
    let (watchlists, setting) = futures::join!(
        client.watchlists_for_user(user_id),
        client.notification_setting(),
    );
    let watchlists = watchlists?;

    let enabled = match setting {
        Ok(setting) => setting.notifications,
        Err(e) => {
            warn!(error = %e, "could not fetch notification setting, treating it as off");
            false
        }
    };
    if !enabled {
        debug!("notifications disabled");
        return Ok(NotificationBuckets::default());
    }

    let buckets = alerts::classify(&watchlists, near_threshold);
    info!(
        exact = buckets.exact.len(),
        near = buckets.near.len(),
        urgent = buckets.urgent.len(),
        "refreshed notifications"
    );
    Ok(buckets)
}

/// Re-runs [`refresh`] on a fixed interval.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    near_threshold: f64,
}

impl Poller {
    pub fn new(interval: Duration, near_threshold: f64) -> Self {
        Self {
            interval,
            near_threshold,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until `shutdown` resolves. The first refresh runs immediately;
    /// failed refreshes are logged and the next tick tries again.
    pub async fn run<F, S>(
        &self,
        client: &BackendClient,
        user_id: &str,
        mut on_update: F,
        shutdown: S,
    ) where
        F: FnMut(&NotificationBuckets),
        S: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("stopping notification poller");
                    break;
                }
                _ = ticker.tick() => {
                    match refresh(client, user_id, self.near_threshold).await {
                        Ok(buckets) => on_update(&buckets),
                        Err(e) => error!(error = %e, "notification refresh failed"),
                    }
                }
            }
        }
    }
}

/// Exact-alert symbols dismissed per calendar day, persisted as
/// `{ "<date>": ["SYM", ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyDismissals {
    days: BTreeMap<String, Vec<String>>,
}

impl DailyDismissals {
    /// Default store location in the user data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("tickerwatch").join("dismissed_alerts.json"))
    }

    /// Load the store; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dismissals: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dismissals: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize dismissals")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write dismissals: {}", path.display()))
    }

    fn key(day: NaiveDate) -> String {
        day.format("%Y-%m-%d").to_string()
    }

    pub fn dismissed_on(&self, day: NaiveDate) -> &[String] {
        self.days
            .get(&Self::key(day))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_dismissed(&self, day: NaiveDate, symbol: &str) -> bool {
        self.dismissed_on(day)
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Record a dismissal. Returns false if it was already recorded.
    pub fn dismiss(&mut self, day: NaiveDate, symbol: &str) -> bool {
        if self.is_dismissed(day, symbol) {
            return false;
        }
        self.days
            .entry(Self::key(day))
            .or_default()
            .push(symbol.to_uppercase());
        true
    }

    /// Forget every day before `day`.
    pub fn prune_before(&mut self, day: NaiveDate) {
        let cutoff = Self::key(day);
        self.days.retain(|k, _| *k >= cutoff);
    }

    /// Drop alerts dismissed on `day` from the exact and near buckets.
    /// Returns the exact and near count left.
    pub fn hide_dismissed(&self, buckets: &mut NotificationBuckets, day: NaiveDate) -> usize {
        let mut left = buckets.exact.len() + buckets.near.len();
        for level in [AlertLevel::Exact, AlertLevel::Near] {
            loop {
                let Some(index) = buckets
                    .bucket(level)
                    .iter()
                    .position(|n| self.is_dismissed(day, &n.symbol))
                else {
                    break;
                };
                match buckets.dismiss(level, index) {
                    Some(count) => left = count,
                    None => break,
                }
            }
        }
        left
    }

    /// Exact matches still to show today, at most `limit`.
    pub fn popup<'a>(
        &self,
        buckets: &'a NotificationBuckets,
        day: NaiveDate,
        limit: usize,
    ) -> Vec<&'a Notification> {
        buckets
            .exact
            .iter()
            .filter(|n| !self.is_dismissed(day, &n.symbol))
            .take(limit)
            .collect()
    }
}
