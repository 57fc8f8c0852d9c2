//! Label model representing a Gmail label

use serde::{Deserialize, Serialize};

use crate::gmail::api::GmailLabel;

/// Unique identifier for a label (Gmail label ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // System label IDs usable in `label:` queries
    pub const INBOX: &'static str = "INBOX";
    pub const SENT: &'static str = "SENT";
    pub const DRAFTS: &'static str = "DRAFT";
    pub const TRASH: &'static str = "TRASH";
    pub const SPAM: &'static str = "SPAM";
    pub const UNREAD: &'static str = "UNREAD";
}

impl From<String> for LabelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LabelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A mailbox label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    /// Label ID (e.g., "INBOX", "SENT", "Label_123")
    pub id: LabelId,
    /// Display name
    pub name: String,
    /// Whether this is a system label
    pub is_system: bool,
    /// Number of messages with this label
    pub message_count: u32,
    /// Number of unread messages
    pub unread_count: u32,
}

impl From<GmailLabel> for Label {
    fn from(label: GmailLabel) -> Self {
        Self {
            id: LabelId(label.id),
            name: label.name,
            is_system: label.label_type.as_deref() == Some("system"),
            message_count: label.messages_total.unwrap_or(0),
            unread_count: label.messages_unread.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api_label() {
        let json = r#"{
            "id": "Label_42",
            "name": "Invoices",
            "type": "user",
            "messagesTotal": 12,
            "messagesUnread": 3
        }"#;
        let api: GmailLabel = serde_json::from_str(json).unwrap();
        let label = Label::from(api);

        assert_eq!(label.id.as_str(), "Label_42");
        assert_eq!(label.name, "Invoices");
        assert!(!label.is_system);
        assert_eq!(label.message_count, 12);
        assert_eq!(label.unread_count, 3);
    }

    #[test]
    fn test_system_label() {
        let api: GmailLabel =
            serde_json::from_str(r#"{"id": "INBOX", "name": "INBOX", "type": "system"}"#).unwrap();
        let label = Label::from(api);
        assert!(label.is_system);
        assert_eq!(label.id.as_str(), LabelId::INBOX);
        assert_eq!(label.message_count, 0);
    }
}
