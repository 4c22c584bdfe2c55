//! Wire models for mailbox objects.
//!
//! These are explicit, schema-validated decodings of the JSON shapes the
//! mail API returns. Records missing their required `id` fail to decode with
//! a structured error instead of panicking, which is what lets the scanner
//! skip malformed records while keeping the rest of a page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    /// Display name, when the server provides one.
    #[serde(default)]
    pub name: Option<String>,
    /// The address itself.
    #[serde(default)]
    pub address: String,
}

/// A message participant as the wire represents it: an `emailAddress` object
/// wrapped in a recipient envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// The wrapped address.
    pub email_address: EmailAddress,
}

impl Recipient {
    /// The bare address string.
    pub fn address(&self) -> &str {
        &self.email_address.address
    }

    /// The display name, when present.
    pub fn name(&self) -> Option<&str> {
        self.email_address.name.as_deref()
    }
}

/// Message body content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    /// Body content, either plain text or HTML markup.
    #[serde(default)]
    pub content: String,
    /// Content type reported by the server (`text` or `html`).
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "text".to_string()
}

/// Message importance marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Low importance.
    Low,
    /// Normal importance.
    #[default]
    Normal,
    /// High importance.
    High,
}

/// A mail message.
///
/// Field selection on the request determines which optional fields are
/// populated; everything except `id` tolerates absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID. Required; a record without one fails to decode.
    pub id: String,
    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,
    /// The account the message was actually sent from.
    #[serde(default)]
    pub sender: Option<Recipient>,
    /// The mailbox owner shown on the From line.
    #[serde(default)]
    pub from: Option<Recipient>,
    /// To recipients.
    #[serde(default)]
    pub to_recipients: Vec<Recipient>,
    /// Cc recipients.
    #[serde(default)]
    pub cc_recipients: Vec<Recipient>,
    /// Bcc recipients.
    #[serde(default)]
    pub bcc_recipients: Vec<Recipient>,
    /// When the message arrived in the mailbox.
    #[serde(default)]
    pub received_date_time: Option<DateTime<Utc>>,
    /// When the message was sent.
    #[serde(default)]
    pub sent_date_time: Option<DateTime<Utc>>,
    /// Whether the message carries attachments.
    #[serde(default)]
    pub has_attachments: bool,
    /// Importance marker.
    #[serde(default)]
    pub importance: Importance,
    /// Whether the message has been read.
    #[serde(default)]
    pub is_read: bool,
    /// Short plain-text preview of the body.
    #[serde(default)]
    pub body_preview: Option<String>,
    /// Full body, when selected.
    #[serde(default)]
    pub body: Option<MessageBody>,
    /// Categories assigned to the message.
    #[serde(default)]
    pub categories: Vec<String>,
    /// ID of the containing folder.
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    /// Conversation thread ID.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// RFC 2822 message ID.
    #[serde(default)]
    pub internet_message_id: Option<String>,
    /// Link to open the message in the web client.
    #[serde(default)]
    pub web_link: Option<String>,
}

impl Message {
    /// Decode a message from a raw API record.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::Json)
    }
}

/// A mail folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique folder ID. Required; a record without one fails to decode.
    pub id: String,
    /// Display name shown in mail clients.
    #[serde(default)]
    pub display_name: String,
    /// ID of the parent folder, absent for root folders.
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    /// Number of immediate child folders.
    #[serde(default)]
    pub child_folder_count: u32,
    /// Number of unread items in the folder.
    #[serde(default)]
    pub unread_item_count: u32,
    /// Total number of items in the folder.
    #[serde(default)]
    pub total_item_count: u32,
    /// Whether the folder is hidden from the folder list.
    #[serde(default)]
    pub is_hidden: bool,
}

impl Folder {
    /// Decode a folder from a raw API record.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::Json)
    }
}

/// Attachment metadata, without the content bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique attachment ID.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: Option<String>,
    /// MIME content type.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Whether the attachment is rendered inline in the body.
    #[serde(default)]
    pub is_inline: bool,
}
