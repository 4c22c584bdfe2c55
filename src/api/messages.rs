//! Individual message operations.

use std::sync::Arc;

use serde_json::Value;

use crate::client::{ClientInner, RequestOptions};
use crate::models::{Attachment, Mailbox, Message, MessageBody, MessageId};
use crate::{Error, Result};

/// Default fields selected when fetching a full message.
pub const DEFAULT_SELECT_FIELDS: &[&str] = &[
    "id",
    "subject",
    "from",
    "sender",
    "toRecipients",
    "ccRecipients",
    "bccRecipients",
    "receivedDateTime",
    "sentDateTime",
    "hasAttachments",
    "importance",
    "isRead",
    "bodyPreview",
    "body",
    "categories",
    "parentFolderId",
    "conversationId",
    "internetMessageId",
    "webLink",
];

const ATTACHMENT_SELECT_FIELDS: &str = "id,name,contentType,size,isInline";

/// Service for fetching individual messages.
///
/// # Example
///
/// ```no_run
/// use graphmail_rs::{Mailbox, MessageId};
///
/// # async fn example(client: graphmail_rs::GraphClient) -> graphmail_rs::Result<()> {
/// let id = MessageId::new("AAMkAD...");
/// let message = client.messages().get(&Mailbox::Me, &id, None).await?;
/// println!("{:?}", message.subject);
/// # Ok(())
/// # }
/// ```
pub struct MessagesService {
    inner: Arc<ClientInner>,
}

impl MessagesService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Fetch a single message with full details.
    ///
    /// `select` overrides [`DEFAULT_SELECT_FIELDS`].
    pub async fn get(
        &self,
        mailbox: &Mailbox,
        message_id: &MessageId,
        select: Option<&[&str]>,
    ) -> Result<Message> {
        let fields = select.unwrap_or(DEFAULT_SELECT_FIELDS).join(",");
        self.inner
            .get_with_query(
                &self.message_path(mailbox, message_id),
                vec![("$select".to_string(), fields)],
            )
            .await
    }

    /// Fetch only the body of a message. `Ok(None)` when the message has no
    /// body content.
    pub async fn body(
        &self,
        mailbox: &Mailbox,
        message_id: &MessageId,
    ) -> Result<Option<MessageBody>> {
        let body = self
            .inner
            .request(
                reqwest::Method::GET,
                &self.message_path(mailbox, message_id),
                RequestOptions::with_params(vec![("$select".to_string(), "body".to_string())]),
            )
            .await?;

        match body.and_then(|value| value.get("body").cloned()) {
            Some(value) if value.is_object() => {
                Ok(Some(serde_json::from_value(value).map_err(Error::Json)?))
            }
            _ => Ok(None),
        }
    }

    /// Fetch attachment metadata for a message, without content bytes.
    pub async fn attachments(
        &self,
        mailbox: &Mailbox,
        message_id: &MessageId,
    ) -> Result<Vec<Attachment>> {
        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            value: Vec<Attachment>,
        }

        let path = format!("{}/attachments", self.message_path(mailbox, message_id));
        let response: Response = self
            .inner
            .get_with_query(
                &path,
                vec![(
                    "$select".to_string(),
                    ATTACHMENT_SELECT_FIELDS.to_string(),
                )],
            )
            .await?;
        Ok(response.value)
    }

    /// Fetch multiple messages by ID, best-effort.
    ///
    /// Messages that fail to fetch are skipped with a warning; the rest are
    /// returned in request order.
    pub async fn get_many(
        &self,
        mailbox: &Mailbox,
        message_ids: &[MessageId],
        select: Option<&[&str]>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(message_ids.len());
        for message_id in message_ids {
            match self.get(mailbox, message_id, select).await {
                Ok(message) => messages.push(message),
                Err(err) => {
                    tracing::warn!(%message_id, error = %err, "skipping message that failed to fetch");
                }
            }
        }
        messages
    }

    /// Fetch the raw message record, for fields outside the typed model.
    pub async fn raw(&self, mailbox: &Mailbox, message_id: &MessageId) -> Result<Value> {
        match self
            .inner
            .request(
                reqwest::Method::GET,
                &self.message_path(mailbox, message_id),
                RequestOptions::default(),
            )
            .await?
        {
            Some(value) => Ok(value),
            None => Err(Error::InvalidInput("empty message response".into())),
        }
    }

    /// Check whether a message exists. A 404 answers `false`; other
    /// failures propagate.
    pub async fn exists(&self, mailbox: &Mailbox, message_id: &MessageId) -> Result<bool> {
        let result = self
            .inner
            .request(
                reqwest::Method::GET,
                &self.message_path(mailbox, message_id),
                RequestOptions::with_params(vec![("$select".to_string(), "id".to_string())]),
            )
            .await;

        match result {
            Ok(Some(value)) => Ok(value.get("id").is_some()),
            Ok(None) => Ok(false),
            Err(Error::Api { status: 404, .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn message_path(&self, mailbox: &Mailbox, message_id: &MessageId) -> String {
        format!("{}/messages/{}", mailbox.segment(), message_id)
    }
}
