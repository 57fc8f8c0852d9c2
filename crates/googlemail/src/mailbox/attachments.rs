//! Attachment retrieval

use log::{debug, warn};

use super::Mailbox;
use crate::error::Result;
use crate::gmail::api::{GmailMessage, MessageBody, MessagePart};
use crate::gmail::{MailService, decode_base64url};
use crate::models::{Attachment, MessageId, ThreadId};

/// A named part still to be materialized
struct AttachmentPart<'a> {
    filename: &'a str,
    mime_type: Option<&'a str>,
    body: Option<&'a MessageBody>,
}

impl<S: MailService> Mailbox<S> {
    /// Attachments of every message in a thread
    pub fn get_thread_attachments(&self, thread_id: &ThreadId) -> Result<Vec<Attachment>> {
        let thread = self.service.get_thread(&self.user_email, thread_id)?;
        let mut attachments = Vec::new();

        for message in thread.messages.iter().flatten() {
            attachments.extend(self.message_attachments(message)?);
        }

        debug!(
            "{}: thread {} has {} attachments",
            self.user_email,
            thread_id,
            attachments.len()
        );
        Ok(attachments)
    }

    /// Attachments of the thread holding the message with this RFC 822 `Message-ID`
    pub fn get_message_attachments(&self, rfc822_msg_id: &str) -> Result<Vec<Attachment>> {
        let message = self.find_message(rfc822_msg_id)?;
        self.get_thread_attachments(&ThreadId::new(message.thread_id))
    }

    /// Attachments of one full-format message
    pub(crate) fn message_attachments(&self, message: &GmailMessage) -> Result<Vec<Attachment>> {
        let Some(payload) = &message.payload else {
            return Ok(Vec::new());
        };

        let mut parts = Vec::new();
        if let Some(filename) = payload.filename.as_deref().filter(|f| !f.is_empty()) {
            parts.push(AttachmentPart {
                filename,
                mime_type: payload.mime_type.as_deref(),
                body: payload.body.as_ref(),
            });
        }
        collect_parts(payload.parts.as_deref().unwrap_or_default(), &mut parts);

        let message_id = MessageId::new(message.id.as_str());
        let mut attachments = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(attachment) = self.materialize(&message_id, part)? {
                attachments.push(attachment);
            }
        }
        Ok(attachments)
    }

    fn materialize(
        &self,
        message_id: &MessageId,
        part: AttachmentPart<'_>,
    ) -> Result<Option<Attachment>> {
        let body = part.body;
        let data = match (
            body.and_then(|b| b.data.as_deref()),
            body.and_then(|b| b.attachment_id.as_deref()),
        ) {
            (Some(inline), _) => decode_base64url(inline)?,
            (None, Some(attachment_id)) => {
                let fetched =
                    self.service
                        .get_attachment(&self.user_email, message_id, attachment_id)?;
                decode_base64url(&fetched.data)?
            }
            (None, None) => {
                warn!(
                    "{}: attachment {} of {} has no data, skipping",
                    self.user_email, part.filename, message_id
                );
                return Ok(None);
            }
        };

        let mut attachment = Attachment::new(part.filename, data);
        attachment.content_type = part.mime_type.map(str::to_string);
        Ok(Some(attachment))
    }
}

/// Depth-first walk collecting every part with a filename
fn collect_parts<'a>(parts: &'a [MessagePart], out: &mut Vec<AttachmentPart<'a>>) {
    for part in parts {
        if let Some(filename) = part.filename.as_deref().filter(|f| !f.is_empty()) {
            out.push(AttachmentPart {
                filename,
                mime_type: part.mime_type.as_deref(),
                body: part.body.as_ref(),
            });
        }
        if let Some(nested) = &part.parts {
            collect_parts(nested, out);
        }
    }
}
