//! Gmail payload helpers
//!
//! Header lookup, body extraction and base64url decoding for message
//! resources returned by the Gmail API.

use base64::prelude::*;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::error::{GmailError, Result};
use crate::models::{MessageBody, MessageId, MessageSummary, ThreadId};

/// Normalize a metadata-format Gmail message to a [`MessageSummary`]
pub fn summarize(gmail_msg: GmailMessage) -> MessageSummary {
    let headers = gmail_msg
        .payload
        .as_ref()
        .map(header_map)
        .unwrap_or_default();

    // Internal date is milliseconds since epoch, as a string
    let received_at = gmail_msg
        .internal_date
        .as_deref()
        .and_then(|d| d.parse::<i64>().ok())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single());

    MessageSummary {
        id: MessageId::new(gmail_msg.id),
        thread_id: ThreadId::new(gmail_msg.thread_id),
        label_ids: gmail_msg.label_ids.unwrap_or_default(),
        snippet: decode_html_entities(&gmail_msg.snippet),
        received_at,
        headers,
    }
}

/// Collect payload headers into a name → value map
///
/// A repeated header keeps its last value.
pub fn header_map(payload: &MessagePayload) -> BTreeMap<String, String> {
    payload
        .headers
        .iter()
        .flatten()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect()
}

/// Extract a header value by name (case-insensitive)
pub(crate) fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Extract the plain text and HTML bodies of a message
///
/// Looks at the payload itself first, then searches the part tree depth
/// first. Malformed body data is an error rather than a missing body.
pub fn extract_body(payload: &MessagePayload) -> Result<MessageBody> {
    Ok(MessageBody {
        plain: find_body(payload, "text/plain")?,
        html: find_body(payload, "text/html")?,
    })
}

fn find_body(payload: &MessagePayload, mime_prefix: &str) -> Result<Option<String>> {
    // Simple, single-part message
    if payload
        .mime_type
        .as_ref()
        .is_some_and(|m| m.starts_with(mime_prefix))
        && let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
    {
        return decode_text(data).map(Some);
    }

    match payload.parts.as_deref().and_then(|parts| find_in_parts(parts, mime_prefix)) {
        Some(data) => decode_text(data).map(Some),
        None => Ok(None),
    }
}

/// Recursively search message parts for inline body data of a MIME type
///
/// Parts with a filename are attachments and are skipped.
fn find_in_parts<'a>(parts: &'a [MessagePart], mime_prefix: &str) -> Option<&'a str> {
    for part in parts {
        let is_attachment = part.filename.as_deref().is_some_and(|f| !f.is_empty());

        if !is_attachment
            && part
                .mime_type
                .as_ref()
                .is_some_and(|m| m.starts_with(mime_prefix))
            && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
        {
            return Some(data);
        }

        if let Some(nested) = &part.parts
            && let Some(data) = find_in_parts(nested, mime_prefix)
        {
            return Some(data);
        }
    }

    None
}

fn decode_text(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode base64-encoded data from the Gmail API
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    let mut first_error = None;
    for decoder in decoders {
        match decoder.decode(data) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(GmailError::Decode {
        context: "base64url payload",
        source: first_error.unwrap_or(base64::DecodeError::InvalidPadding),
    })
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
