//! Message export

use log::info;
use std::collections::BTreeMap;

use super::Mailbox;
use crate::error::{GmailError, Result};
use crate::gmail::{MailService, MessageFormat, decode_base64url, extract_body, header_map};
use crate::models::{EmailAddress, ExportedMessage, MessageBody, MessageId, ThreadId};

impl<S: MailService> Mailbox<S> {
    /// Export the message with this RFC 822 `Message-ID`
    ///
    /// Collects the raw RFC 822 bytes, the parsed headers and bodies, and
    /// the attachments of every message in its thread.
    pub fn export_message(&self, rfc822_msg_id: &str) -> Result<ExportedMessage> {
        let found = self.find_message(rfc822_msg_id)?;
        let id = MessageId::new(found.id);

        let full = self
            .service
            .get_message(&self.user_email, &id, MessageFormat::Full)?;
        let raw = self
            .service
            .get_message(&self.user_email, &id, MessageFormat::Raw)?
            .raw
            .ok_or_else(|| GmailError::NotFound(format!("raw content of message {}", id)))?;
        let data = decode_base64url(&raw)?;

        let (headers, body) = match &full.payload {
            Some(payload) => (header_map(payload), extract_body(payload)?),
            None => (BTreeMap::new(), MessageBody::default()),
        };
        let thread_id = ThreadId::new(full.thread_id.as_str());
        let attachments = self.get_thread_attachments(&thread_id)?;

        let header = |name: &str| lookup(&headers, name);
        let date = header("Date").map(str::to_string);
        let from = header("From").map(EmailAddress::parse);
        let reply_to = header("Reply-To").map(EmailAddress::parse);
        let subject = header("Subject").unwrap_or_default().to_string();
        let to = header("To").map(EmailAddress::parse_list).unwrap_or_default();
        let cc = header("Cc").map(EmailAddress::parse_list).unwrap_or_default();
        let bcc = header("Bcc").map(EmailAddress::parse_list).unwrap_or_default();

        let exported = ExportedMessage {
            id,
            thread_id,
            label_ids: full.label_ids.unwrap_or_default(),
            data,
            headers,
            date,
            from,
            reply_to,
            subject,
            to,
            cc,
            bcc,
            body,
            attachments,
        };

        info!(
            "{}: exported message {} ({} bytes, {} attachments)",
            self.user_email,
            exported.id,
            exported.data.len(),
            exported.attachments.len()
        );
        Ok(exported)
    }
}

/// Case-insensitive header lookup
fn lookup<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
