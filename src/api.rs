//! REST client for the watchlist backend.
//!
//! Every call carries the user's bearer token and goes through the
//! [`RequestPacer`], so at most one request is in flight at a time.

use crate::error::ApiError;
use crate::limiter::RequestPacer;
use crate::models::{
    DeleteResult, MinimalWatchlistTicker, NotificationSetting, PatchResult, PositionSet,
    PositionTicker, StockQuote, UserInfo, Watchlist,
};
use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

const API_PREFIX: &str = "/api";

/// Key the backend uses to report errors inside a 200 response.
const ERROR_MESSAGE_KEY: &str = "Error Message";

/// Client for the users, watchlists, purchased-stocks and stocks endpoints.
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    pacer: RequestPacer,
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
        pacer: RequestPacer,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            pacer,
        })
    }

    // Users

    pub async fn user_details(&self) -> Result<UserInfo, ApiError> {
        let text = self.send(Method::GET, "/users/", None::<&()>).await?;
        decode_json(&text)
    }

    /// Register the signed-in user with the backend if it doesn't know them yet.
    pub async fn ensure_user(&self) -> Result<UserInfo, ApiError> {
        let text = self.send(Method::POST, "/users", Some(&json!({}))).await?;
        decode_json_or_default(&text)
    }

    pub async fn notification_setting(&self) -> Result<NotificationSetting, ApiError> {
        let text = self
            .send(Method::GET, "/users/notifications", None::<&()>)
            .await?;
        decode_json(&text)
    }

    pub async fn set_notifications(&self, enabled: bool) -> Result<UserInfo, ApiError> {
        let text = self
            .send(
                Method::PATCH,
                "/users/notifications",
                Some(&json!({ "enabled": enabled })),
            )
            .await?;
        decode_json_or_default(&text)
    }

    // Watchlists

    pub async fn watchlists_for_user(&self, user_id: &str) -> Result<Vec<Watchlist>, ApiError> {
        let path = format!("/watchlists/user/{}", segment(user_id));
        let text = self.send(Method::GET, &path, None::<&()>).await?;
        decode_json_or_default(&text)
    }

    pub async fn watchlist(&self, user_id: &str, name: &str) -> Result<Watchlist, ApiError> {
        let path = with_user(&format!("/watchlists/{}", segment(name)), user_id);
        let text = self.send(Method::GET, &path, None::<&()>).await?;
        decode_json(&text)
    }

    /// Create a watchlist; returns the id the backend assigned.
    pub async fn create_watchlist(
        &self,
        user_id: &str,
        watchlist: &Watchlist,
    ) -> Result<String, ApiError> {
        let path = with_user("/watchlists", user_id);
        let text = self.send(Method::POST, &path, Some(watchlist)).await?;
        Ok(decode_text(&text))
    }

    pub async fn add_to_watchlist(
        &self,
        user_id: &str,
        name: &str,
        ticker: &MinimalWatchlistTicker,
    ) -> Result<String, ApiError> {
        let path = with_user(&format!("/watchlists/watchlist/{}", segment(name)), user_id);
        let text = self.send(Method::PUT, &path, Some(ticker)).await?;
        Ok(decode_text(&text))
    }

    pub async fn edit_alert_prices(
        &self,
        user_id: &str,
        name: &str,
        tickers: &[MinimalWatchlistTicker],
    ) -> Result<String, ApiError> {
        let path = with_user(&format!("/watchlists/{}", segment(name)), user_id);
        let text = self.send(Method::PUT, &path, Some(&tickers)).await?;
        Ok(decode_text(&text))
    }

    pub async fn delete_watchlist(&self, user_id: &str, name: &str) -> Result<DeleteResult, ApiError> {
        let path = with_user(&format!("/watchlists/{}", segment(name)), user_id);
        let text = self.send(Method::DELETE, &path, None::<&()>).await?;
        decode_json_or_default(&text)
    }

    pub async fn remove_from_watchlist(
        &self,
        user_id: &str,
        name: &str,
        symbols: &[String],
    ) -> Result<PatchResult, ApiError> {
        let path = with_user(&format!("/watchlists/tickers/{}", segment(name)), user_id);
        let text = self.send(Method::PATCH, &path, Some(&symbols)).await?;
        decode_json_or_default(&text)
    }

    // Purchased stocks

    pub async fn position_sets_for_user(&self, user_id: &str) -> Result<Vec<PositionSet>, ApiError> {
        let path = with_user(&format!("/purchasedstocks/user/{}", segment(user_id)), user_id);
        let text = self.send(Method::GET, &path, None::<&()>).await?;
        decode_json_or_default(&text)
    }

    pub async fn position_set(&self, user_id: &str, name: &str) -> Result<PositionSet, ApiError> {
        let path = with_user(&format!("/purchasedstocks/{}", segment(name)), user_id);
        let text = self.send(Method::GET, &path, None::<&()>).await?;
        decode_json(&text)
    }

    pub async fn create_position_set(&self, set: &PositionSet) -> Result<String, ApiError> {
        let text = self
            .send(Method::POST, "/purchasedstocks", Some(set))
            .await?;
        Ok(decode_text(&text))
    }

    /// Replace the full ticker list of a position set.
    pub async fn replace_positions(
        &self,
        user_id: &str,
        name: &str,
        tickers: &[PositionTicker],
    ) -> Result<Option<PositionSet>, ApiError> {
        let path = with_user(&format!("/purchasedstocks/{}", segment(name)), user_id);
        let text = self.send(Method::PUT, &path, Some(&tickers)).await?;
        match text.trim() {
            "" | "null" => Ok(None),
            body => decode_json(body).map(Some),
        }
    }

    pub async fn delete_position_set(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<DeleteResult, ApiError> {
        let path = with_user(&format!("/purchasedstocks/{}", segment(name)), user_id);
        let text = self.send(Method::DELETE, &path, None::<&()>).await?;
        decode_json_or_default(&text)
    }

    pub async fn remove_positions(
        &self,
        user_id: &str,
        name: &str,
        symbols: &[String],
    ) -> Result<PatchResult, ApiError> {
        let path = with_user(&format!("/purchasedstocks/tickers/{}", segment(name)), user_id);
        let text = self.send(Method::PATCH, &path, Some(&symbols)).await?;
        decode_json_or_default(&text)
    }

    // Stocks

    pub async fn quote(&self, symbol: &str) -> Result<StockQuote, ApiError> {
        let path = format!("/stocks/{}", segment(symbol));
        let text = self.send(Method::GET, &path, None::<&()>).await?;
        decode_json(&text)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<StockQuote>, ApiError> {
        let path = format!("/stocks/search?query={}", urlencoding::encode(query));
        let text = self.send(Method::GET, &path, None::<&()>).await?;
        decode_json_or_default(&text)
    }

    /// Send one paced request and return the raw body of a successful
    /// response.
    #[instrument(skip(self, body))]
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NotSignedIn)?;
        let url = format!("{}{}{}", self.base_url, API_PREFIX, path);

        let mut request = self.client.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.pacer.run(request.send()).await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, bytes = text.len(), "backend responded");

        check_response(status, text)
    }
}

/// Turn a status and body into the body or the matching error.
fn check_response(status: StatusCode, text: String) -> Result<String, ApiError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ApiError::RateLimited);
    }
    if !status.is_success() {
        return Err(ApiError::Status { status, body: text });
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text) {
        if let Some(message) = map.get(ERROR_MESSAGE_KEY) {
            let message = message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string());
            return Err(ApiError::Backend(message));
        }
    }
    Ok(text)
}

fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode JSON, treating an empty or `null` body as the default value.
fn decode_json_or_default<T: DeserializeOwned + Default>(text: &str) -> Result<T, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(T::default());
    }
    decode_json(trimmed)
}

/// Bodies that are "just a string" may come back JSON-quoted or raw.
fn decode_text(text: &str) -> String {
    serde_json::from_str::<String>(text).unwrap_or_else(|_| text.trim().to_string())
}

fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

fn with_user(path: &str, user_id: &str) -> String {
    format!("{}?userId={}", path, urlencoding::encode(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_user_encodes() {
        assert_eq!(
            with_user("/watchlists/my%20list", "a b"),
            "/watchlists/my%20list?userId=a%20b"
        );
    }

    #[test]
    fn test_segment_encodes_spaces_and_slashes() {
        assert_eq!(segment("my watchlist"), "my%20watchlist");
        assert_eq!(segment("a/b"), "a%2Fb");
    }

    #[test]
    fn test_check_response_error_message_key() {
        let body = r#"{"Error Message": "Limit Reach"}"#.to_string();
        match check_response(StatusCode::OK, body) {
            Err(ApiError::Backend(msg)) => assert_eq!(msg, "Limit Reach"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_check_response_rate_limited() {
        assert!(matches!(
            check_response(StatusCode::TOO_MANY_REQUESTS, String::new()),
            Err(ApiError::RateLimited)
        ));
    }

    #[test]
    fn test_check_response_status() {
        match check_response(StatusCode::NOT_FOUND, "missing".into()) {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "missing");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_check_response_passes_arrays() {
        let body = r#"[{"symbol":"AAPL"}]"#.to_string();
        assert_eq!(check_response(StatusCode::OK, body.clone()).unwrap(), body);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(r#""abc123""#), "abc123");
        assert_eq!(decode_text("abc123\n"), "abc123");
    }

    #[test]
    fn test_decode_json_or_default_empty() {
        let r: PatchResult = decode_json_or_default("").unwrap();
        assert_eq!(r.matched_count, 0);
        let v: Vec<Watchlist> = decode_json_or_default("null").unwrap();
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn test_requests_need_token() {
        let client = BackendClient::new(
            "http://127.0.0.1:9",
            None,
            Duration::from_secs(1),
            RequestPacer::default(),
        )
        .unwrap();
        assert!(matches!(
            client.user_details().await,
            Err(ApiError::NotSignedIn)
        ));
    }
}
