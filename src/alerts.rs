//! Alert classification.
//!
//! Every watchlist ticker with an alert price gets a deviation
//! `(price - alert) / alert * 100` and lands in one of three buckets by
//! the magnitude of that deviation.

use crate::models::Watchlist;
use serde::Serialize;

/// Default bound of the "near" bucket, in percent.
pub const DEFAULT_NEAR_THRESHOLD: f64 = 5.0;

/// Deviations smaller than this count as an exact hit.
const EXACT_EPSILON: f64 = 1e-9;

/// How close a price is to its alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// Price is at the alert price.
    Exact,
    /// Within the near threshold.
    Near,
    /// Further away than the near threshold.
    Urgent,
}

/// Percentage difference between the live price and the alert price.
///
/// `None` without an alert price, or when the alert price is zero.
pub fn alert_deviation(price: f64, alert_price: Option<f64>) -> Option<f64> {
    let alert = alert_price?;
    if alert == 0.0 {
        return None;
    }
    Some((price - alert) / alert * 100.0)
}

/// Bucket a deviation.
pub fn classify_deviation(deviation: f64, near_threshold: f64) -> AlertLevel {
    let magnitude = deviation.abs();
    if magnitude < EXACT_EPSILON {
        AlertLevel::Exact
    } else if magnitude <= near_threshold {
        AlertLevel::Near
    } else {
        AlertLevel::Urgent
    }
}

/// One ticker's alert status within one watchlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub watchlist_name: String,
    pub symbol: String,
    pub name: String,
    pub alert_price: f64,
    pub price: f64,
    pub current_vs_alert_price_percentage: f64,
}

/// Notifications grouped by level, in watchlist then ticker order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationBuckets {
    pub exact: Vec<Notification>,
    pub near: Vec<Notification>,
    pub urgent: Vec<Notification>,
}

impl NotificationBuckets {
    /// Total across all levels.
    pub fn count(&self) -> usize {
        self.exact.len() + self.near.len() + self.urgent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn bucket(&self, level: AlertLevel) -> &[Notification] {
        match level {
            AlertLevel::Exact => &self.exact,
            AlertLevel::Near => &self.near,
            AlertLevel::Urgent => &self.urgent,
        }
    }

    /// Drop the `index`-th notification of a bucket. Returns the count of
    /// exact and near notifications left, which is what the badge shows
    /// after a dismissal.
    pub fn dismiss(&mut self, level: AlertLevel, index: usize) -> Option<usize> {
        let bucket = match level {
            AlertLevel::Exact => &mut self.exact,
            AlertLevel::Near => &mut self.near,
            AlertLevel::Urgent => &mut self.urgent,
        };
        if index >= bucket.len() {
            return None;
        }
        bucket.remove(index);
        Some(self.exact.len() + self.near.len())
    }
}

/// Classify every alerted ticker of every watchlist.
///
/// Tickers without a live price are skipped. The backend's precomputed
/// deviation is used when present, otherwise it is derived here.
pub fn classify(watchlists: &[Watchlist], near_threshold: f64) -> NotificationBuckets {
    let mut buckets = NotificationBuckets::default();

    for wl in watchlists {
        for ticker in &wl.tickers {
            let Some(alert_price) = ticker.alert_price else {
                continue;
            };
            let Some(price) = ticker.price else {
                continue;
            };
            let Some(deviation) = ticker
                .current_vs_alert_price_percentage
                .or_else(|| alert_deviation(price, Some(alert_price)))
            else {
                continue;
            };

            let notification = Notification {
                watchlist_name: wl.name.clone(),
                symbol: ticker.symbol.clone(),
                name: ticker.name.clone(),
                alert_price,
                price,
                current_vs_alert_price_percentage: deviation,
            };

            match classify_deviation(deviation, near_threshold) {
                AlertLevel::Exact => buckets.exact.push(notification),
                AlertLevel::Near => buckets.near.push(notification),
                AlertLevel::Urgent => buckets.urgent.push(notification),
            }
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchlistTicker;

    fn ticker(symbol: &str, price: f64, alert: Option<f64>) -> WatchlistTicker {
        WatchlistTicker {
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
            price: Some(price),
            alert_price: alert,
            ..Default::default()
        }
    }

    fn watchlist(name: &str, tickers: Vec<WatchlistTicker>) -> Watchlist {
        Watchlist {
            name: name.to_string(),
            user_id: "u1".to_string(),
            tickers,
        }
    }

    #[test]
    fn test_alert_deviation() {
        assert_eq!(alert_deviation(110.0, Some(100.0)), Some(10.0));
        assert_eq!(alert_deviation(95.0, Some(100.0)), Some(-5.0));
        assert_eq!(alert_deviation(100.0, None), None);
        assert_eq!(alert_deviation(100.0, Some(0.0)), None);
    }

    #[test]
    fn test_classify_deviation_boundaries() {
        assert_eq!(classify_deviation(0.0, 5.0), AlertLevel::Exact);
        assert_eq!(classify_deviation(5.0, 5.0), AlertLevel::Near);
        assert_eq!(classify_deviation(-5.0, 5.0), AlertLevel::Near);
        assert_eq!(classify_deviation(0.01, 5.0), AlertLevel::Near);
        assert_eq!(classify_deviation(5.01, 5.0), AlertLevel::Urgent);
        assert_eq!(classify_deviation(-40.0, 5.0), AlertLevel::Urgent);
    }

    #[test]
    fn test_classify_buckets_across_watchlists() {
        let lists = vec![
            watchlist(
                "tech",
                vec![
                    ticker("AAPL", 150.0, Some(150.0)),
                    ticker("MSFT", 103.0, Some(100.0)),
                    ticker("NVDA", 50.0, Some(100.0)),
                    ticker("AMD", 80.0, None),
                ],
            ),
            watchlist("energy", vec![ticker("XOM", 96.0, Some(100.0))]),
        ];

        let buckets = classify(&lists, DEFAULT_NEAR_THRESHOLD);
        assert_eq!(buckets.exact.len(), 1);
        assert_eq!(buckets.exact[0].symbol, "AAPL");
        let near: Vec<_> = buckets.near.iter().map(|n| n.symbol.as_str()).collect();
        assert_eq!(near, vec!["MSFT", "XOM"]);
        assert_eq!(buckets.near[1].watchlist_name, "energy");
        assert_eq!(buckets.urgent[0].symbol, "NVDA");
        assert_eq!(buckets.count(), 4);
    }

    #[test]
    fn test_classify_prefers_backend_deviation() {
        let mut t = ticker("AAPL", 150.0, Some(100.0));
        t.current_vs_alert_price_percentage = Some(0.0);
        let buckets = classify(&[watchlist("a", vec![t])], DEFAULT_NEAR_THRESHOLD);
        assert_eq!(buckets.exact.len(), 1);
    }

    #[test]
    fn test_classify_skips_missing_price() {
        let mut t = ticker("AAPL", 0.0, Some(100.0));
        t.price = None;
        let buckets = classify(&[watchlist("a", vec![t])], DEFAULT_NEAR_THRESHOLD);
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_dismiss() {
        let lists = vec![watchlist(
            "tech",
            vec![
                ticker("AAPL", 100.0, Some(100.0)),
                ticker("MSFT", 101.0, Some(100.0)),
                ticker("GOOG", 102.0, Some(100.0)),
            ],
        )];
        let mut buckets = classify(&lists, DEFAULT_NEAR_THRESHOLD);
        assert_eq!(buckets.dismiss(AlertLevel::Near, 0), Some(2));
        assert_eq!(buckets.near[0].symbol, "GOOG");
        assert_eq!(buckets.dismiss(AlertLevel::Near, 5), None);
    }
}
