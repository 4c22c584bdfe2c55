//! Data models for mailbox objects and request addressing.

mod mail;
mod primitives;

pub use mail::{Attachment, EmailAddress, Folder, Importance, Message, MessageBody, Recipient};
pub use primitives::{FolderId, Mailbox, MessageId};
