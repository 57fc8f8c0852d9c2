//! Draft builder

use crate::error::Result;
use crate::gmail::MailService;
use crate::mailbox::{Mailbox, SentMessage};
use crate::models::Attachment;

/// An email ready to be sent from a mailbox
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Display name placed in front of the sender address
    pub send_as: String,
    pub subject: String,
    /// HTML body
    pub body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl Draft {
    pub fn new(
        to: Vec<String>,
        cc: Vec<String>,
        bcc: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            to,
            cc,
            bcc,
            ..Default::default()
        }
    }

    pub fn send_as(mut self, name: impl Into<String>) -> Self {
        self.send_as = name.into();
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Send this draft from `mailbox`
    pub fn send<S: MailService>(&self, mailbox: &Mailbox<S>) -> Result<SentMessage> {
        mailbox.send_email(self)
    }
}
