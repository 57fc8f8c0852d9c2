//! Remote mail-service seam

use super::api::{
    AttachmentBody, Delegate, GmailMessage, GmailThread, ListDelegatesResponse,
    ListLabelsResponse, ListMessagesResponse,
};
use crate::error::Result;
use crate::models::{MessageId, ThreadId};

/// Representation requested from `messages.get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Parsed payload with headers and bodies
    Full,
    /// Headers and labels only
    Metadata,
    /// IDs and labels only
    Minimal,
    /// Whole message as base64url in `raw`
    Raw,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Metadata => "metadata",
            Self::Minimal => "minimal",
            Self::Raw => "raw",
        }
    }
}

/// Remote calls used by [`crate::Mailbox`]
///
/// `user_id` is the mailbox address (or `me`). Implementations are shared
/// across dispatch workers, hence `Send + Sync`.
pub trait MailService: Send + Sync {
    /// One page of messages matching `query`
    fn list_messages(
        &self,
        user_id: &str,
        query: &str,
        page_token: Option<&str>,
        include_spam_trash: bool,
    ) -> Result<ListMessagesResponse>;

    /// A single message in the requested format
    fn get_message(
        &self,
        user_id: &str,
        id: &MessageId,
        format: MessageFormat,
    ) -> Result<GmailMessage>;

    /// A thread with all of its messages (full format)
    fn get_thread(&self, user_id: &str, id: &ThreadId) -> Result<GmailThread>;

    /// Attachment bytes (base64url) of one message part
    fn get_attachment(
        &self,
        user_id: &str,
        message_id: &MessageId,
        attachment_id: &str,
    ) -> Result<AttachmentBody>;

    /// Send an already-encoded message (URL-safe base64, no padding)
    fn send_message(&self, user_id: &str, raw: &str) -> Result<GmailMessage>;

    fn list_delegates(&self, user_id: &str) -> Result<ListDelegatesResponse>;

    fn create_delegate(&self, user_id: &str, delegate_email: &str) -> Result<Delegate>;

    fn delete_delegate(&self, user_id: &str, delegate_email: &str) -> Result<()>;

    fn list_labels(&self, user_id: &str) -> Result<ListLabelsResponse>;
}
