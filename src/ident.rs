use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TrinoDriftError};

const MAX_IDENT_LEN: usize = 128;

/// A catalog, schema or table name that is safe to splice into SQL text.
///
/// Only `[A-Za-z_][A-Za-z0-9_]*` up to 128 characters is accepted, so the
/// value can appear both as a bare identifier and inside a single-quoted
/// literal without escaping.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ident(String);

impl Ident {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if is_safe_identifier(&value) {
            Ok(Self(value))
        } else {
            Err(TrinoDriftError::InvalidIdentifier(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_safe_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    value.len() <= MAX_IDENT_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ident {
    type Error = TrinoDriftError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Ident {
    type Error = TrinoDriftError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Ident> for String {
    fn from(value: Ident) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use crate::{Ident, TrinoDriftError};

    #[test]
    fn accepts_plain_names() {
        for name in ["mysql_prod", "_staging", "Orders2", "a"] {
            assert!(Ident::new(name).is_ok(), "{name} must be accepted");
        }
    }

    #[test]
    fn rejects_injection_and_odd_charsets() {
        for name in [
            "",
            "1abc",
            "prod; DROP TABLE users",
            "test_db' OR '1'='1",
            "a.b",
            "naïve",
            "with-dash",
        ] {
            let err = Ident::new(name).expect_err("must reject");
            assert!(matches!(err, TrinoDriftError::InvalidIdentifier(_)));
        }
    }

    #[test]
    fn rejects_overlong_names() {
        assert!(Ident::new("x".repeat(128)).is_ok());
        assert!(Ident::new("x".repeat(129)).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<Ident, _> = serde_json::from_str("\"orders\"");
        assert!(ok.is_ok());
        let bad: Result<Ident, _> = serde_json::from_str("\"or'ders\"");
        assert!(bad.is_err());
    }
}
