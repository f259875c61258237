//! The PIN value object.
//!
//! A [`Pin`] can only be obtained through [`Pin::parse`], so every `Pin` that
//! reaches the registry is already known to be 4–10 ASCII digits.  Invalid
//! input never gets far enough to touch stored state.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted PIN length in characters.
pub const MIN_PIN_LEN: usize = 4;

/// Maximum accepted PIN length in characters.
pub const MAX_PIN_LEN: usize = 10;

/// Reasons a submitted PIN string is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PinError {
    /// The PIN is shorter than [`MIN_PIN_LEN`] or longer than [`MAX_PIN_LEN`].
    #[error("PIN must be {MIN_PIN_LEN}-{MAX_PIN_LEN} digits (got {len} characters)")]
    InvalidLength { len: usize },

    /// The PIN contains something other than ASCII digits.
    #[error("PIN must contain digits only")]
    NonNumeric,

    /// The PIN was missing, or was sent as something other than a string
    /// (a JSON number would silently drop leading zeros).
    #[error("PIN must be sent as a string of digits")]
    NotText,
}

/// PINs up to this length are masked completely in logs.
const FULLY_MASKED_LEN: usize = 6;

/// Trailing digits revealed by [`Pin::masked`] for longer PINs.
const VISIBLE_SUFFIX: usize = 2;

/// A validated numeric PIN, the natural key of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    /// Validates `raw` and wraps it as a [`Pin`].
    ///
    /// Length is counted in characters, so a multi-byte non-digit is reported
    /// with its character count rather than its byte length.
    ///
    /// # Errors
    ///
    /// - [`PinError::InvalidLength`] when the length is outside 4–10.
    /// - [`PinError::NonNumeric`] when any character is not `0`–`9`.
    pub fn parse(raw: &str) -> Result<Self, PinError> {
        let len = raw.chars().count();
        if !(MIN_PIN_LEN..=MAX_PIN_LEN).contains(&len) {
            return Err(PinError::InvalidLength { len });
        }
        if !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(PinError::NonNumeric);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Returns the PIN digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a log-safe rendering.  PINs of six digits or fewer are fully
    /// starred (`"****"`); longer ones reveal only their last two digits
    /// (`"*****67"`).
    pub fn masked(&self) -> String {
        let len = self.0.len();
        if len <= FULLY_MASKED_LEN {
            return "*".repeat(len);
        }
        let visible = &self.0[len - VISIBLE_SUFFIX..];
        format!("{}{visible}", "*".repeat(len - VISIBLE_SUFFIX))
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pin {
    type Error = PinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_boundary_lengths() {
        assert!(Pin::parse("1234").is_ok());
        assert!(Pin::parse("1234567890").is_ok());
    }

    #[test]
    fn test_parse_rejects_too_short() {
        assert_eq!(Pin::parse("12"), Err(PinError::InvalidLength { len: 2 }));
        assert_eq!(Pin::parse(""), Err(PinError::InvalidLength { len: 0 }));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        assert_eq!(
            Pin::parse("12345678901"),
            Err(PinError::InvalidLength { len: 11 })
        );
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(Pin::parse("abcd"), Err(PinError::NonNumeric));
        assert_eq!(Pin::parse("12a4"), Err(PinError::NonNumeric));
    }

    #[test]
    fn test_parse_rejects_signs_and_whitespace() {
        assert_eq!(Pin::parse("-1234"), Err(PinError::NonNumeric));
        assert_eq!(Pin::parse("12 34"), Err(PinError::NonNumeric));
        assert_eq!(Pin::parse("1234\n"), Err(PinError::NonNumeric));
    }

    #[test]
    fn test_parse_rejects_non_ascii_digits() {
        // Arabic-Indic digits are numeric in Unicode but not accepted here.
        assert_eq!(Pin::parse("١٢٣٤"), Err(PinError::NonNumeric));
    }

    #[test]
    fn test_masked_hides_short_pins_completely() {
        assert_eq!(Pin::parse("4242").unwrap().masked(), "****");
        assert_eq!(Pin::parse("123456").unwrap().masked(), "******");
    }

    #[test]
    fn test_masked_reveals_last_two_digits_of_long_pins() {
        assert_eq!(Pin::parse("1234567").unwrap().masked(), "*****67");
        assert_eq!(Pin::parse("9876543210").unwrap().masked(), "********10");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Pin, _> = serde_json::from_str("\"0000\"");
        assert!(ok.is_ok());

        let bad: Result<Pin, _> = serde_json::from_str("\"12\"");
        assert!(bad.is_err());
    }
}
