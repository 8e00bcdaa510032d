//! Human-readable order numbers.
//!
//! Format: `ORD-<YYYYMMDD>-<NNNN>`, e.g. `ORD-20261014-0427`.
//!
//! Numbers are generated by the storefront rather than allocated by the
//! database, so there is a 1-in-10,000 chance per day that two orders draw the
//! same suffix. The `orders.order_number` unique constraint turns that into an
//! insert failure which the customer retries; a number is never regenerated
//! and re-inserted inside the same checkout attempt.

use core::fmt;

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

const PREFIX: &str = "ORD-";
const SUFFIX_SPACE: u16 = 10_000;

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// The input does not match `ORD-<8 digits>-<4 digits>`.
    #[error("order number must look like ORD-YYYYMMDD-NNNN")]
    Malformed,
    /// The date segment is not a calendar date.
    #[error("order number has an invalid date")]
    InvalidDate,
}

/// An order number such as `ORD-20261014-0427`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Draw a new order number for `date`.
    pub fn generate<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> Self {
        let suffix = rng.random_range(0..SUFFIX_SPACE);
        Self(format!("{PREFIX}{}-{suffix:04}", date.format("%Y%m%d")))
    }

    /// Parse an order number received from a client or the database.
    ///
    /// # Errors
    ///
    /// Returns `OrderNumberError::Malformed` if the shape is wrong and
    /// `OrderNumberError::InvalidDate` if the date segment is impossible.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let rest = s.strip_prefix(PREFIX).ok_or(OrderNumberError::Malformed)?;
        let (date, suffix) = rest.split_once('-').ok_or(OrderNumberError::Malformed)?;

        let all_digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !all_digits(date, 8) || !all_digits(suffix, 4) {
            return Err(OrderNumberError::Malformed);
        }

        NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| OrderNumberError::InvalidDate)?;

        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The calendar date embedded in the number.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        let date = self.0.get(PREFIX.len()..PREFIX.len() + 8)?;
        NaiveDate::parse_from_str(date, "%Y%m%d").ok()
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn is_well_formed(s: &str) -> bool {
        let bytes = s.as_bytes();
        s.len() == 17
            && s.starts_with("ORD-")
            && bytes.get(12) == Some(&b'-')
            && s.get(4..12).is_some_and(|d| d.bytes().all(|b| b.is_ascii_digit()))
            && s.get(13..).is_some_and(|d| d.bytes().all(|b| b.is_ascii_digit()))
    }

    #[test]
    fn test_generate_format() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let number = OrderNumber::generate(date, &mut rng);
            assert!(is_well_formed(number.as_str()), "{number}");
            assert!(number.as_str().starts_with("ORD-20261014-"));
            assert_eq!(number.date(), Some(date));
        }
    }

    #[test]
    fn test_generated_numbers_parse() {
        let date = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        let number = OrderNumber::generate(date, &mut rand::rng());
        assert_eq!(OrderNumber::parse(number.as_str()).unwrap(), number);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            OrderNumber::parse("ORD-2026101-0427"),
            Err(OrderNumberError::Malformed)
        );
        assert_eq!(
            OrderNumber::parse("ord-20261014-0427"),
            Err(OrderNumberError::Malformed)
        );
        assert_eq!(
            OrderNumber::parse("ORD-20261014-427a"),
            Err(OrderNumberError::Malformed)
        );
        assert_eq!(
            OrderNumber::parse("ORD-20261399-0427"),
            Err(OrderNumberError::InvalidDate)
        );
    }
}
