//! Exact decimal <-> base unit conversion (18 decimals, no floating point).

use core::fmt::Display;

use odra::casper_types::{U256, U512};

use super::error::InputError;

/// Decimals of the native currency on both networks and of loan tokens.
pub const ETHER_DECIMALS: usize = 18;

/// Parses a human amount such as `"1.5"` into native base units.
/// Rejects zero, negative, malformed and over-precise input.
pub fn parse_ether(amount: &str) -> Result<U512, InputError> {
    let digits = to_base_digits(amount, ETHER_DECIMALS)?;
    let value =
        U512::from_dec_str(&digits).map_err(|_| InputError::Amount(amount.to_string()))?;
    if value.is_zero() {
        return Err(InputError::Amount(amount.to_string()));
    }
    Ok(value)
}

/// Token flavour of [`parse_ether`].
pub fn parse_token_amount(amount: &str) -> Result<U256, InputError> {
    let digits = to_base_digits(amount, ETHER_DECIMALS)?;
    let value =
        U256::from_dec_str(&digits).map_err(|_| InputError::Amount(amount.to_string()))?;
    if value.is_zero() {
        return Err(InputError::Amount(amount.to_string()));
    }
    Ok(value)
}

/// Formats base units with 18 decimals, trimming trailing zeros but always
/// keeping one fractional digit: `1e18` → `"1.0"`, `15e17` → `"1.5"`.
pub fn format_ether<T: Display>(value: T) -> String {
    format_units(&value.to_string(), ETHER_DECIMALS)
}

fn format_units(raw: &str, decimals: usize) -> String {
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
    } else {
        raw.to_string()
    };
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

fn to_base_digits(amount: &str, decimals: usize) -> Result<String, InputError> {
    let invalid = || InputError::Amount(amount.to_string());
    let trimmed = amount.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals {
        return Err(invalid());
    }

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.push_str(&"0".repeat(decimals - frac.len()));

    let digits = digits.trim_start_matches('0');
    Ok(if digits.is_empty() {
        "0".to_string()
    } else {
        digits.to_string()
    })
}
