//! Symbol search helpers: result filtering and input debouncing.

use crate::models::StockQuote;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Quiet period before a typed query is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Narrow search results to what the user typed.
///
/// Exact symbol matches win outright; otherwise anything whose name or
/// symbol contains the input (case-insensitive) is kept.
pub fn filter_results<'a>(results: &'a [StockQuote], input: &str) -> Vec<&'a StockQuote> {
    let needle = input.trim().to_lowercase();

    let exact: Vec<&StockQuote> = results
        .iter()
        .filter(|q| q.symbol.to_lowercase() == needle)
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    results
        .iter()
        .filter(|q| {
            q.name.to_lowercase().contains(&needle) || q.symbol.to_lowercase().contains(&needle)
        })
        .collect()
}

/// The result chosen when the user presses enter: the exact symbol match
/// if any, else the first result.
pub fn pick<'a>(results: &'a [StockQuote], input: &str) -> Option<&'a StockQuote> {
    let needle = input.trim();
    results
        .iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(needle))
        .or_else(|| results.first())
}

/// Lets only the last of a burst of calls through.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait out the quiet period. Returns `false` when a newer call
    /// started in the meantime, in which case the caller should drop its
    /// work.
    pub async fn settle(&self) -> bool {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, name: &str) -> StockQuote {
        StockQuote {
            symbol: symbol.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn results() -> Vec<StockQuote> {
        vec![
            quote("GOOGL", "Alphabet Inc."),
            quote("GOOG", "Alphabet Inc. Class C"),
            quote("AAPL", "Apple Inc."),
        ]
    }

    #[test]
    fn test_filter_exact_symbol_wins() {
        let r = results();
        let hits = filter_results(&r, "goog");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "GOOG");
    }

    #[test]
    fn test_filter_partial_name_or_symbol() {
        let r = results();
        let hits: Vec<_> = filter_results(&r, "alpha").iter().map(|q| q.symbol.clone()).collect();
        assert_eq!(hits, vec!["GOOGL", "GOOG"]);
        let hits = filter_results(&r, "INC");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_pick() {
        let r = results();
        assert_eq!(pick(&r, "aapl").unwrap().symbol, "AAPL");
        assert_eq!(pick(&r, "alph").unwrap().symbol, "GOOGL");
        assert!(pick(&[], "x").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_keeps_last_call() {
        let debouncer = Debouncer::new(Duration::from_millis(600));

        let first = tokio::spawn({
            let d = debouncer.clone();
            async move { d.settle().await }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = tokio::spawn({
            let d = debouncer.clone();
            async move { d.settle().await }
        });

        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_spaced_calls_all_pass() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        assert!(debouncer.settle().await);
        assert!(debouncer.settle().await);
    }
}
