//! Contact details collected from ticket buyers and volunteers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

/// An email address with a basic structural check.
///
/// ```
/// use convention_core::Email;
///
/// assert!(Email::parse("visitor@tracon.fi").is_ok());
/// assert!(Email::parse("visitor.tracon.fi").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an email address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first structural problem.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let mut parts = s.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::AtSymbol);
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    #[error("phone number must have between {min} and {max} digits")]
    DigitCount { min: usize, max: usize },
}

/// A phone number as typed by the customer, loosely validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MIN_DIGITS: usize = 5;
    const MAX_DIGITS: usize = 20;

    /// Parse a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] for stray characters or an implausible digit count.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        let body = s.strip_prefix('+').unwrap_or(s);

        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        {
            return Err(PhoneError::InvalidCharacter);
        }

        let digits = body.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(PhoneError::DigitCount {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(s.to_owned()))
    }

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

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    #[error("postal code must be between {min} and {max} characters")]
    Length { min: usize, max: usize },
    #[error("postal code may only contain letters and digits")]
    InvalidCharacter,
}

/// A postal code. Upper-cased on parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 10;

    /// Parse a postal code.
    ///
    /// # Errors
    ///
    /// Returns a [`PostalCodeError`] for a bad length or non-alphanumeric input.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let s = s.trim();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&s.len()) {
            return Err(PostalCodeError::Length {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PostalCodeError::InvalidCharacter);
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_trims_whitespace() {
        let email = Email::parse("  matti@example.com ").unwrap();
        assert_eq!(email.as_str(), "matti@example.com");
    }

    #[test]
    fn test_email_rejects_structural_problems() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@tracon.fi"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("matti@"), Err(EmailError::EmptyDomain));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_phone_accepts_common_formats() {
        assert!(PhoneNumber::parse("+358 40 123 4567").is_ok());
        assert!(PhoneNumber::parse("040-1234567").is_ok());
    }

    #[test]
    fn test_phone_rejects_letters_and_short_numbers() {
        assert_eq!(
            PhoneNumber::parse("call me"),
            Err(PhoneError::InvalidCharacter)
        );
        assert!(matches!(
            PhoneNumber::parse("123"),
            Err(PhoneError::DigitCount { .. })
        ));
    }

    #[test]
    fn test_postal_code_is_uppercased() {
        assert_eq!(PostalCode::parse("sw1a1aa").unwrap().as_str(), "SW1A1AA");
        assert_eq!(PostalCode::parse("33100").unwrap().as_str(), "33100");
    }

    #[test]
    fn test_postal_code_rejects_bad_input() {
        assert!(matches!(
            PostalCode::parse("1"),
            Err(PostalCodeError::Length { .. })
        ));
        assert_eq!(
            PostalCode::parse("33 100"),
            Err(PostalCodeError::InvalidCharacter)
        );
    }
}
