//! Opaque record identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 32-hex-character record identifier.
///
/// Tokens are the only linkage mechanism in the relational output:
/// records reference each other exclusively by token, and the empty
/// string is the conventional "no link" sentinel in `prev`/`next`
/// fields. Serializes as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Freshly minted unique token.
    pub fn mint() -> Self {
        Token(Uuid::new_v4().simple().to_string())
    }

    /// The "no link" sentinel.
    pub fn none() -> Self {
        Token(String::new())
    }

    /// Wraps an externally supplied identifier, e.g. a configured
    /// category token.
    pub fn from_value(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Token {
    fn default() -> Self {
        Token::none()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== Tests =====
