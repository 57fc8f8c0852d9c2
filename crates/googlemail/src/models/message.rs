//! Message models

use super::{Attachment, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
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

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        // Try to parse "Name <email>" format
        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        // Otherwise, treat the whole string as an email
        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Parse a comma-separated header value; blank entries are dropped
    ///
    /// Commas inside a quoted display name or an angle-bracketed address
    /// do not separate entries.
    pub fn parse_list(s: &str) -> Vec<Self> {
        let mut entries = Vec::new();
        let mut start = 0;
        let mut in_quotes = false;
        let mut in_angle = false;
        let mut escaped = false;

        for (i, c) in s.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' if in_quotes => escaped = true,
                '"' if !in_angle => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                ',' if !in_quotes && !in_angle => {
                    entries.push(&s[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        entries.push(&s[start..]);

        entries
            .into_iter()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Decoded text bodies of a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub plain: Option<String>,
    pub html: Option<String>,
}

/// Message metadata returned by a bulk header fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub label_ids: Vec<String>,
    pub snippet: String,
    /// When Gmail received the message, if reported
    pub received_at: Option<DateTime<Utc>>,
    pub headers: BTreeMap<String, String>,
}

impl MessageSummary {
    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or_default()
    }

    pub fn from(&self) -> Option<EmailAddress> {
        self.header("From").map(EmailAddress::parse)
    }
}

/// A message exported with its raw bytes, parsed fields and attachments
#[derive(Debug, Clone)]
pub struct ExportedMessage {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub label_ids: Vec<String>,
    /// The complete RFC 822 message
    pub data: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub date: Option<String>,
    pub from: Option<EmailAddress>,
    pub reply_to: Option<EmailAddress>,
    pub subject: String,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub body: MessageBody,
    /// Attachments of every message in the thread
    pub attachments: Vec<Attachment>,
}
