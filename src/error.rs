//! Error types shared across the client.

use thiserror::Error;

/// Errors raised while talking to the backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No bearer token was configured.
    #[error("No user signed in")]
    NotSignedIn,

    /// HTTP 429 from the backend or its upstream quote provider.
    #[error("Too many requests to the stock API. Please try again later.")]
    RateLimited,

    /// Non-success status with whatever body the backend sent.
    #[error("{status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// A 2xx body carrying an `"Error Message"` field.
    #[error("{0}")]
    Backend(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Rejected user input. Messages are shown verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{noun} name can only contain letters, numbers, hyphens, underscores, and spaces. Invalid characters found: {invalid}")]
    InvalidName { noun: &'static str, invalid: String },

    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),

    #[error("{0} cannot be empty")]
    PriceRequired(&'static str),

    #[error("Enter a valid price (e.g., 10.99)")]
    PriceFormat,

    #[error("Price must be greater than 0")]
    PriceNotPositive,

    #[error("Quantity cannot be empty")]
    QuantityRequired,

    #[error("Enter a valid whole number greater than 0")]
    QuantityFormat,

    #[error("Purchase date is required")]
    DateRequired,
}

/// Failures of watchlist and position book operations.
#[derive(Error, Debug)]
pub enum BookError {
    #[error("A watchlist with this name already exists. Please try another name.")]
    DuplicateWatchlist,

    #[error("A position set with this name already exists.")]
    DuplicatePositionSet,

    #[error("Ticker {symbol} already exists in \"{set}\"")]
    DuplicatePosition { symbol: String, set: String },

    #[error("No watchlist named \"{0}\"")]
    UnknownWatchlist(String),

    #[error("No position set named \"{0}\"")]
    UnknownPositionSet(String),

    #[error("Could not find stock with symbol {0} in the database!")]
    UnknownSymbol(String),

    #[error("Backend returned an empty id after creating")]
    EmptyCreateResult,

    #[error("Could not delete positions")]
    DeleteFailed,

    #[error("{symbol}: {source}")]
    InvalidAlert {
        symbol: String,
        source: ValidationError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
