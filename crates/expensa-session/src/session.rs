//! The authenticated identity.

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of the signed-in user as reported by the backend.
///
/// Only non-sensitive attributes are kept; credentials live in HttpOnly
/// cookies owned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque user identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Account email.
    pub email: String,

    /// Display name, if the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Session {
    /// Create a session with no display name.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name to show in prompts and status lines.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Deserialize an id sent either as a JSON string or a number.
///
/// For use with `#[serde(deserialize_with = "...")]`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
