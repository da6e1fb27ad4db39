//! Input validation for names, prices and quantities.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

static NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_\s]+$").expect("name pattern"));

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]{0,2})?$").expect("price pattern"));

static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*$").expect("quantity pattern"));

/// Check a watchlist or position set name and return it trimmed.
///
/// `noun` prefixes the error message ("Watchlist", "Position").
pub fn collection_name(noun: &'static str, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName(noun));
    }
    if NAME_CHARS.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    let mut invalid: Vec<char> = Vec::new();
    for c in trimmed.chars() {
        let mut buf = [0u8; 4];
        if !NAME_CHARS.is_match(c.encode_utf8(&mut buf)) && !invalid.contains(&c) {
            invalid.push(c);
        }
    }
    let invalid = invalid
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    Err(ValidationError::InvalidName { noun, invalid })
}

/// Parse a price with at most two decimals. A trailing `.` is accepted as
/// `.0`. `label` names the field in the empty-input message.
pub fn price(label: &'static str, input: &str) -> Result<f64, ValidationError> {
    let trimmed = input.trim();
    let cleaned = if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    };

    if cleaned.is_empty() {
        return Err(ValidationError::PriceRequired(label));
    }
    if !PRICE.is_match(&cleaned) {
        return Err(ValidationError::PriceFormat);
    }

    let value: f64 = cleaned.parse().map_err(|_| ValidationError::PriceFormat)?;
    if value <= 0.0 {
        return Err(ValidationError::PriceNotPositive);
    }
    Ok(value)
}

/// Parse a whole, positive share count.
pub fn quantity(input: &str) -> Result<u64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::QuantityRequired);
    }
    if !QUANTITY.is_match(trimmed) {
        return Err(ValidationError::QuantityFormat);
    }
    trimmed.parse().map_err(|_| ValidationError::QuantityFormat)
}

/// Require a purchase date.
pub fn purchase_date<T>(date: Option<T>) -> Result<T, ValidationError> {
    date.ok_or(ValidationError::DateRequired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_valid() {
        assert_eq!(collection_name("Watchlist", "  my watchlist ").unwrap(), "my watchlist");
        assert_eq!(collection_name("Watchlist", "tech_2024-a").unwrap(), "tech_2024-a");
    }

    #[test]
    fn test_collection_name_lists_invalid_chars_once() {
        let err = collection_name("Watchlist", "a!b!c@").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidName {
                noun: "Watchlist",
                invalid: "! @".into()
            }
        );
    }

    #[test]
    fn test_collection_name_empty() {
        assert_eq!(
            collection_name("Position", "   "),
            Err(ValidationError::EmptyName("Position"))
        );
    }

    #[test]
    fn test_price() {
        assert_eq!(price("Price", "10.99"), Ok(10.99));
        assert_eq!(price("Price", " 1 "), Ok(1.0));
        assert_eq!(price("Price", "10."), Ok(10.0));
        assert_eq!(price("Price", ""), Err(ValidationError::PriceRequired("Price")));
        assert_eq!(price("Price", "10.999"), Err(ValidationError::PriceFormat));
        assert_eq!(price("Price", "-3"), Err(ValidationError::PriceFormat));
        assert_eq!(price("Price", "abc"), Err(ValidationError::PriceFormat));
        assert_eq!(price("Price", "0.00"), Err(ValidationError::PriceNotPositive));
    }

    #[test]
    fn test_quantity() {
        assert_eq!(quantity("12"), Ok(12));
        assert_eq!(quantity(""), Err(ValidationError::QuantityRequired));
        assert_eq!(quantity("0"), Err(ValidationError::QuantityFormat));
        assert_eq!(quantity("01"), Err(ValidationError::QuantityFormat));
        assert_eq!(quantity("1.5"), Err(ValidationError::QuantityFormat));
    }

    #[test]
    fn test_purchase_date_required() {
        assert_eq!(purchase_date::<u32>(None), Err(ValidationError::DateRequired));
        assert_eq!(purchase_date(Some(3)), Ok(3));
    }
}
