//! Human-facing order numbers such as `W-00001`.
//!
//! The number is independent of the database primary key. It is backed by a
//! single counter row; this module only covers formatting and parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Digits after the prefix. Longer sequences are printed unpadded.
pub const SEQUENCE_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("order number prefix must be 1-10 ASCII letters or digits")]
    InvalidPrefix,

    #[error("malformed order number: {0}")]
    Malformed(String),

    #[error("order number counter is corrupt: {0:?}")]
    CorruptCounter(String),
}

/// A formatted order number: `PREFIX-` plus a zero-padded sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Format `sequence` under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberError::InvalidPrefix`] if the prefix is empty, too
    /// long, or contains anything but ASCII alphanumerics.
    pub fn format(prefix: &str, sequence: u64) -> Result<Self, OrderNumberError> {
        validate_prefix(prefix)?;
        Ok(Self(format!(
            "{prefix}-{sequence:0width$}",
            width = SEQUENCE_WIDTH
        )))
    }

    /// Split an order number into its prefix and sequence.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberError::Malformed`] if there is no `-` separator or
    /// the sequence is not numeric.
    pub fn parse(s: &str) -> Result<(String, u64), OrderNumberError> {
        let (prefix, digits) = s
            .rsplit_once('-')
            .ok_or_else(|| OrderNumberError::Malformed(s.to_string()))?;
        validate_prefix(prefix).map_err(|_| OrderNumberError::Malformed(s.to_string()))?;
        let sequence = digits
            .parse::<u64>()
            .map_err(|_| OrderNumberError::Malformed(s.to_string()))?;
        Ok((prefix.to_string(), sequence))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interpret the stored counter value. A missing row counts as zero.
///
/// # Errors
///
/// Returns [`OrderNumberError::CorruptCounter`] if the stored value is not a
/// non-negative integer.
pub fn parse_counter(stored: Option<&str>) -> Result<u64, OrderNumberError> {
    match stored.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| OrderNumberError::CorruptCounter(value.to_string())),
    }
}

fn validate_prefix(prefix: &str) -> Result<(), OrderNumberError> {
    if prefix.is_empty() || prefix.len() > 10 || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(OrderNumberError::InvalidPrefix);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_from_zero() {
        let mut counter = parse_counter(None).unwrap();
        let mut issued = Vec::new();
        for _ in 0..3 {
            counter += 1;
            issued.push(OrderNumber::format("W", counter).unwrap().into_inner());
        }
        assert_eq!(issued, ["W-00001", "W-00002", "W-00003"]);
    }

    #[test]
    fn test_wide_sequences_are_not_truncated() {
        assert_eq!(
            OrderNumber::format("W", 123_456).unwrap().as_str(),
            "W-123456"
        );
    }

    #[test]
    fn test_invalid_prefix() {
        assert_eq!(
            OrderNumber::format("", 1),
            Err(OrderNumberError::InvalidPrefix)
        );
        assert_eq!(
            OrderNumber::format("W-X", 1),
            Err(OrderNumberError::InvalidPrefix)
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            OrderNumber::parse("W-00042").unwrap(),
            ("W".to_string(), 42)
        );
        assert!(OrderNumber::parse("W00042").is_err());
        assert!(OrderNumber::parse("W-00x42").is_err());
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter(Some(" 17 ")).unwrap(), 17);
        assert_eq!(parse_counter(Some("")).unwrap(), 0);
        assert!(matches!(
            parse_counter(Some("abc")),
            Err(OrderNumberError::CorruptCounter(_))
        ));
    }
}
