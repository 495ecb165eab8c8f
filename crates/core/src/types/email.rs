//! Validated email address.
//!
//! Used for login, registration and the checkout contact field. The rules
//! are structural only: one `@`, non-empty local part, and a domain with an
//! inner dot. Deliverability is the API's concern.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an email address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain is empty or has no inner dot (`karim@localhost`).
    #[error("email domain is invalid")]
    InvalidDomain,
    /// Whitespace or a second `@`.
    #[error("email contains invalid characters")]
    InvalidCharacters,
}

/// An email address that passed [`Email::parse`].
///
/// ```
/// use gb_green_guide_core::Email;
///
/// assert!(Email::parse("karim@example.com").is_ok());
/// assert!(Email::parse("karim@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 length limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate `s` as an email address. The input is not trimmed.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) || s.matches('@').count() > 1 {
            return Err(EmailError::InvalidCharacters);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }

        let labels_ok = domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
            && !domain.ends_with('.');
        if !labels_ok {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
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

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for ok in [
            "karim@example.com",
            "karim.baig+orders@mail.example.pk",
            "a@b.co",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok} should parse");
        }
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("", EmailError::Empty),
            ("karim", EmailError::MissingAtSymbol),
            ("@example.com", EmailError::EmptyLocalPart),
            ("karim@", EmailError::InvalidDomain),
            ("karim@localhost", EmailError::InvalidDomain),
            ("karim@.com", EmailError::InvalidDomain),
            ("karim@example.", EmailError::InvalidDomain),
            ("kar im@example.com", EmailError::InvalidCharacters),
            ("k@rim@example.com", EmailError::InvalidCharacters),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input).unwrap_err(), expected, "input {input:?}");
        }

        let long = format!("{}@example.com", "k".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_serde_is_a_plain_string() {
        let email: Email = "karim@example.com".parse().unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"karim@example.com\"");
        assert_eq!(email.to_string(), email.as_str());
    }
}
