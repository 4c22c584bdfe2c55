//! Primitive types and newtypes for type-safe API interactions.
//!
//! This module provides strongly-typed wrappers around string identifiers
//! to prevent mixing up different types of IDs at compile time, plus the
//! [`Mailbox`] selector that determines which mailbox a request targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A strongly-typed mail message ID.
///
/// # Example
///
/// ```
/// use graphmail_rs::MessageId;
///
/// let id = MessageId::new("AAMkADgx...");
/// println!("Message: {}", id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new message ID from a string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the message ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A strongly-typed mail folder ID.
///
/// Well-known folder names (`inbox`, `sentitems`, `deleteditems`) are valid
/// folder IDs as far as the remote API is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    /// Create a new folder ID.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the folder ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FolderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for FolderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FolderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The mailbox a request targets.
///
/// The signed-in user's own mailbox is addressed through the `me` path
/// segment; any other mailbox the token can access is addressed through
/// `users/{id}`.
///
/// # Example
///
/// ```
/// use graphmail_rs::Mailbox;
///
/// assert_eq!(Mailbox::Me.segment(), "me");
/// assert_eq!(
///     Mailbox::user("ada@example.com").segment(),
///     "users/ada@example.com"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mailbox {
    /// The mailbox of the signed-in user.
    #[default]
    Me,
    /// Another user's mailbox, addressed by user ID or principal name.
    User(String),
}

impl Mailbox {
    /// Address a specific user's mailbox.
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// The leading URL path segment for this mailbox.
    pub fn segment(&self) -> String {
        match self {
            Mailbox::Me => "me".to_string(),
            Mailbox::User(id) => format!("users/{}", id),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id() {
        let id = MessageId::new("AAMkAD");
        assert_eq!(id.as_str(), "AAMkAD");
        assert_eq!(id.to_string(), "AAMkAD");
    }

    #[test]
    fn test_folder_id_from_str() {
        let id: FolderId = "inbox".into();
        assert_eq!(id.as_str(), "inbox");
    }

    #[test]
    fn test_mailbox_segments() {
        assert_eq!(Mailbox::Me.segment(), "me");
        assert_eq!(Mailbox::user("abc-123").segment(), "users/abc-123");
        assert_eq!(Mailbox::default(), Mailbox::Me);
    }
}
