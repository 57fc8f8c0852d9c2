//! Gmail API integration
//!
//! This module provides:
//! - The [`MailService`] trait, the remote calls the mailbox operations consume
//! - [`GmailClient`], its HTTPS implementation
//! - Wire types for Gmail API requests and responses
//! - Payload helpers (header lookup, body extraction, base64url decoding)

mod client;
mod normalize;
mod service;

#[cfg(test)]
pub(crate) mod fake;

pub use client::GmailClient;
pub(crate) use client::build_agent;
pub use normalize::{decode_base64url, extract_body, header_map, summarize};
pub use service::{MailService, MessageFormat};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: String,
    }

    /// Message resource from Gmail API
    ///
    /// Which fields are present depends on the requested format; a sent
    /// message only carries `id`, `thread_id` and `label_ids`.
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        pub history_id: Option<String>,
        pub internal_date: Option<String>,
        pub size_estimate: Option<u64>,
        pub payload: Option<MessagePayload>,
        /// Whole RFC 822 message, base64url encoded (`format=raw` only)
        pub raw: Option<String>,
    }

    /// Message payload containing headers and body
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Part body; inline data or a reference to a separately fetched attachment
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub size: Option<u64>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// Message part (for multipart messages)
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Thread resource with its messages
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailThread {
        pub id: String,
        pub history_id: Option<String>,
        pub messages: Option<Vec<GmailMessage>>,
    }

    /// Attachment body returned by `messages.attachments.get`
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttachmentBody {
        pub size: Option<u64>,
        pub data: String,
    }

    /// Request body for `messages.send`
    #[derive(Debug, Serialize)]
    pub struct SendMessageRequest<'a> {
        pub raw: &'a str,
    }

    /// Mailbox delegate
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Delegate {
        pub delegate_email: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub verification_status: Option<String>,
    }

    /// Response from listing delegates
    #[derive(Debug, Default, Deserialize)]
    pub struct ListDelegatesResponse {
        pub delegates: Option<Vec<Delegate>>,
    }

    /// Label resource
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailLabel {
        pub id: String,
        pub name: String,
        /// "system" or "user"
        #[serde(rename = "type")]
        pub label_type: Option<String>,
        pub messages_total: Option<u32>,
        pub messages_unread: Option<u32>,
        pub threads_total: Option<u32>,
        pub threads_unread: Option<u32>,
    }

    /// Response from listing labels
    #[derive(Debug, Default, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<GmailLabel>>,
    }

    /// Error envelope returned with non-2xx statuses
    #[derive(Debug, Deserialize)]
    pub struct ApiErrorEnvelope {
        pub error: ApiErrorBody,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiErrorBody {
        pub code: Option<u16>,
        #[serde(default)]
        pub message: String,
        pub status: Option<String>,
        pub errors: Option<Vec<ApiErrorItem>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiErrorItem {
        pub reason: Option<String>,
        pub message: Option<String>,
    }
}
