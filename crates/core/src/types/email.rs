//! Customer email addresses.
//!
//! Validation is structural only: one `@` with something on each side. The
//! stored form is trimmed and lowercased so lookups by email are exact.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email address is required")]
    Empty,
    #[error("email address is longer than {0} characters")]
    TooLong(usize),
    #[error("email address needs exactly one '@'")]
    AtSign,
    #[error("email address is missing the part before '@'")]
    NoMailbox,
    #[error("email address is missing a domain")]
    NoDomain,
    #[error("email address cannot contain spaces")]
    Whitespace,
}

/// A normalized email address.
///
/// ```
/// use whimsical_frog_core::Email;
///
/// let email = Email::parse(" Kermit@Pond.Example ").unwrap();
/// assert_eq!(email.as_str(), "kermit@pond.example");
/// assert!(Email::parse("kermit.pond.example").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// SMTP path limit.
    pub const MAX_LENGTH: usize = 254;

    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        match s.len() {
            0 => return Err(EmailError::Empty),
            n if n > Self::MAX_LENGTH => return Err(EmailError::TooLong(Self::MAX_LENGTH)),
            _ => {}
        }
        if s.contains(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (mailbox, domain) = s.split_once('@').ok_or(EmailError::AtSign)?;
        if domain.contains('@') {
            return Err(EmailError::AtSign);
        }
        if mailbox.is_empty() {
            return Err(EmailError::NoMailbox);
        }
        if domain.is_empty() {
            return Err(EmailError::NoDomain);
        }

        Ok(Self(s.to_lowercase()))
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

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
    use sqlx::{Decode, Encode, Postgres, Type};

    use super::Email;

    impl Type<Postgres> for Email {
        fn type_info() -> PgTypeInfo {
            <String as Type<Postgres>>::type_info()
        }

        fn compatible(ty: &PgTypeInfo) -> bool {
            <String as Type<Postgres>>::compatible(ty)
        }
    }

    impl<'r> Decode<'r, Postgres> for Email {
        fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
            // Stored values went through `parse`; older rows may differ in case.
            let raw = <&'r str as Decode<'r, Postgres>>::decode(value)?;
            Ok(Self(raw.to_lowercase()))
        }
    }

    impl Encode<'_, Postgres> for Email {
        fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
            <&str as Encode<'_, Postgres>>::encode(self.0.as_str(), buf)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        for ok in [
            "kermit@pond.example",
            "miss.piggy+orders@muppets.example.co.uk",
            "a@b",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_normalizes() {
        let email: Email = "  Fozzie@Bear.EXAMPLE ".parse().unwrap();
        assert_eq!(email.to_string(), "fozzie@bear.example");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("pond.example"), Err(EmailError::AtSign));
        assert_eq!(Email::parse("a@b@pond.example"), Err(EmailError::AtSign));
        assert_eq!(Email::parse("@pond.example"), Err(EmailError::NoMailbox));
        assert_eq!(Email::parse("kermit@"), Err(EmailError::NoDomain));
        assert_eq!(Email::parse("ker mit@pond.example"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_length_limit() {
        let at_limit = format!("{}@pond.example", "k".repeat(Email::MAX_LENGTH - 13));
        assert_eq!(at_limit.len(), Email::MAX_LENGTH);
        assert!(Email::parse(&at_limit).is_ok());

        let over = format!("k{at_limit}");
        assert_eq!(Email::parse(&over), Err(EmailError::TooLong(Email::MAX_LENGTH)));
    }

    #[test]
    fn test_serde_is_transparent() {
        let email = Email::parse("gonzo@whatever.example").unwrap();
        assert_eq!(
            serde_json::to_string(&email).unwrap(),
            "\"gonzo@whatever.example\""
        );
    }
}
