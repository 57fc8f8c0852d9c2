//! Sending mail

use log::info;

use super::Mailbox;
use crate::compose::{Draft, build_mime_message, encode_raw, random_boundary};
use crate::error::Result;
use crate::gmail::MailService;
use crate::models::{MessageId, ThreadId};

/// The message Gmail created for a sent draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub label_ids: Vec<String>,
}

impl<S: MailService> Mailbox<S> {
    /// Send `draft` from this mailbox
    ///
    /// Sends are not retried; a failure leaves it to the caller to decide
    /// whether resending is safe.
    pub fn send_email(&self, draft: &Draft) -> Result<SentMessage> {
        let message = build_mime_message(draft, &self.user_email, &random_boundary());
        let raw = encode_raw(message.as_bytes());

        let sent = self.service.send_message(&self.user_email, &raw)?;
        info!(
            "{}: sent {:?} to {} recipients with {} attachments (id {})",
            self.user_email,
            draft.subject,
            draft.to.len() + draft.cc.len() + draft.bcc.len(),
            draft.attachments.len(),
            sent.id
        );

        Ok(SentMessage {
            id: MessageId::new(sent.id),
            thread_id: ThreadId::new(sent.thread_id),
            label_ids: sent.label_ids.unwrap_or_default(),
        })
    }
}
