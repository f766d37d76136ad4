use serde::{Deserialize, Serialize};

/// An address that passed signup validation.
///
/// Validation is deliberately loose: non-empty, contains an `@` and a `.`.
/// Stricter RFC 5322 parsing rejects addresses the remote service accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(value: &str) -> Result<Self, InvalidEmail> {
        let value = value.trim();
        if value.is_empty() || !value.contains('@') || !value.contains('.') {
            return Err(InvalidEmail(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier the remote service keys members by: the MD5 hex digest
    /// of the lowercased address. Stable across case and whitespace variants
    /// of the same address.
    pub fn member_id(&self) -> String {
        format!("{:x}", md5::compute(self.0.to_lowercase()))
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid email address {0:?}")]
pub struct InvalidEmail(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    pub email: String,
    /// Signup group requested by the subscriber, if any.
    pub group: Option<String>,
    /// RFC 3339 timestamp of the signup.
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriberUpdate {
    pub group: Option<String>,
}
