//! Secret values that must never reach logs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wrapper for API keys and OAuth tokens
///
/// `Debug` and `Display` always print `[REDACTED]`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Partially redacted form for debugging, e.g. `sk-...cdef`
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let chars: Vec<char> = self.value.chars().collect();
        let len = chars.len();
        if len <= 8 {
            return "[REDACTED]".to_string();
        }
        let tail: String = chars[len - 4..].iter().collect();
        match self.value.split_once('-') {
            Some((prefix, _)) if prefix.len() <= 6 && prefix.is_ascii() => {
                format!("{}-...{}", prefix, tail)
            }
            _ => format!("{}...{}", chars[..2].iter().collect::<String>(), tail),
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redaction() {
        let secret = SecretString::new("sk-1234567890abcdef");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(secret.partial_redact(), "sk-...cdef");
    }

    #[test]
    fn test_anthropic_key_prefix() {
        let secret = SecretString::new("sk-ant-api03-abcdefgh");
        assert_eq!(secret.partial_redact(), "sk-...efgh");
    }

    #[test]
    fn test_short_and_plain_secrets() {
        assert_eq!(SecretString::new("abc").partial_redact(), "[REDACTED]");
        assert_eq!(SecretString::new("").partial_redact(), "[EMPTY]");
        assert_eq!(SecretString::new("gsk_0123456789").partial_redact(), "gs...6789");
    }

    #[test]
    fn test_serializes_transparently() {
        let secret = SecretString::new("my-secret-value");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"my-secret-value\"");
        assert_eq!(secret.expose_secret(), "my-secret-value");
    }
}
