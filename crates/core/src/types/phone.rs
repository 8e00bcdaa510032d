//! Customer phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits and separators.
    #[error("phone number can only contain digits, spaces, dashes, dots and parentheses")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    DigitCount {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number the kitchen can call about an order.
///
/// Formatting characters are accepted on input and stripped; the stored value
/// is the digits only, with a leading `+` kept when the customer typed one.
///
/// ```
/// use saffron_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("(212) 555-0142").unwrap();
/// assert_eq!(phone.as_str(), "2125550142");
///
/// assert!(PhoneNumber::parse("555-0142").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Fewest digits accepted (US number without country code).
    pub const MIN_DIGITS: usize = 10;
    /// Most digits accepted (E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a phone number from user input.
    ///
    /// # Errors
    ///
    /// Returns `PhoneError` if the input is empty, contains letters or other
    /// symbols, or has a digit count outside 10-15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (plus, rest) = s
            .strip_prefix('+')
            .map_or((false, s), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len() + 1);
        if plus {
            digits.push('+');
        }
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let count = digits.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::DigitCount {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the normalized phone number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_formatting() {
        assert_eq!(
            PhoneNumber::parse("212.555.0142").unwrap().as_str(),
            "2125550142"
        );
        assert_eq!(
            PhoneNumber::parse("+1 (212) 555-0142").unwrap().as_str(),
            "+12125550142"
        );
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(
            PhoneNumber::parse("212-CALL-NOW"),
            Err(PhoneError::InvalidCharacter)
        );
        assert_eq!(
            PhoneNumber::parse("++12125550142"),
            Err(PhoneError::InvalidCharacter)
        );
    }

    #[test]
    fn test_parse_digit_bounds() {
        assert_eq!(PhoneNumber::parse(""), Err(PhoneError::Empty));
        assert!(matches!(
            PhoneNumber::parse("555-0142"),
            Err(PhoneError::DigitCount { .. })
        ));
        assert!(matches!(
            PhoneNumber::parse("1234567890123456"),
            Err(PhoneError::DigitCount { .. })
        ));
        assert!(PhoneNumber::parse("123456789012345").is_ok());
    }
}
