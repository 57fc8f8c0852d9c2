//! MIME assembly for outgoing mail
//!
//! Output uses CRLF line endings throughout. Binary content is base64
//! encoded and wrapped at 76 columns.

use base64::prelude::*;
use rand::Rng;
use rand::distributions::Alphanumeric;

use super::Draft;
use crate::models::Attachment;

/// Maximum encoded line length for base64 bodies
const LINE_WIDTH: usize = 76;

/// Raw bytes per RFC 2047 encoded word (encodes to 60 characters)
const ENCODED_WORD_BYTES: usize = 45;

const BOUNDARY_LEN: usize = 32;

/// Magic bytes for the content types recognised when none is given
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
];

/// Render `draft` as a `multipart/mixed` message sent by `sender_email`
pub fn build_mime_message(draft: &Draft, sender_email: &str, boundary: &str) -> String {
    let mut out = String::new();

    push_header(
        &mut out,
        "Content-Type",
        &format!("multipart/mixed; boundary=\"{}\"", boundary),
    );
    push_header(&mut out, "MIME-Version", "1.0");
    push_header(&mut out, "To", &single_line(&draft.to.join(", ")));
    if !draft.cc.is_empty() {
        push_header(&mut out, "Cc", &single_line(&draft.cc.join(", ")));
    }
    if !draft.bcc.is_empty() {
        push_header(&mut out, "Bcc", &single_line(&draft.bcc.join(", ")));
    }
    push_header(&mut out, "From", &format_sender(&draft.send_as, sender_email));
    push_header(&mut out, "Subject", &encode_header_value(&single_line(&draft.subject)));
    out.push_str("\r\n");

    // HTML body part
    push_delimiter(&mut out, boundary);
    push_header(&mut out, "Content-Type", "text/html; charset=\"UTF-8\"");
    if draft.body.is_ascii() {
        push_header(&mut out, "Content-Transfer-Encoding", "7bit");
        out.push_str("\r\n");
        out.push_str(&normalize_line_endings(&draft.body));
        out.push_str("\r\n");
    } else {
        push_header(&mut out, "Content-Transfer-Encoding", "base64");
        out.push_str("\r\n");
        push_wrapped_base64(&mut out, draft.body.as_bytes());
    }

    for attachment in &draft.attachments {
        push_delimiter(&mut out, boundary);
        push_attachment(&mut out, attachment);
    }

    out.push_str("--");
    out.push_str(boundary);
    out.push_str("--\r\n");
    out
}

/// A fresh multipart boundary of 32 random alphanumeric characters
pub fn random_boundary() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect()
}

/// Encode a message for `messages.send` (URL-safe alphabet, no padding)
pub fn encode_raw(message: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(message)
}

/// Guess a content type from leading bytes
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    if let Some((_, content_type)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *content_type;
    }

    match std::str::from_utf8(data) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !matches!(c, '\t' | '\r' | '\n')) => {
            "text/plain; charset=utf-8"
        }
        _ => "application/octet-stream",
    }
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

fn push_delimiter(out: &mut String, boundary: &str) {
    out.push_str("--");
    out.push_str(boundary);
    out.push_str("\r\n");
}

fn push_attachment(out: &mut String, attachment: &Attachment) {
    let name = quote(&attachment.name);
    let content_type = attachment
        .content_type
        .as_deref()
        .unwrap_or_else(|| sniff_content_type(&attachment.data));

    push_header(out, "Content-Type", &format!("{}; name=\"{}\"", content_type, name));
    push_header(out, "Content-Transfer-Encoding", "base64");
    push_header(
        out,
        "Content-Disposition",
        &format!("attachment; filename=\"{}\"", name),
    );
    out.push_str("\r\n");
    push_wrapped_base64(out, &attachment.data);
}

fn push_wrapped_base64(out: &mut String, data: &[u8]) {
    let encoded = BASE64_STANDARD.encode(data);
    // Base64 output is ASCII, so byte offsets are char boundaries.
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        out.push_str(line);
        out.push_str("\r\n");
        rest = tail;
    }
}

fn format_sender(send_as: &str, sender_email: &str) -> String {
    let name = single_line(send_as);
    let name = name.trim();
    if name.is_empty() {
        format!("<{}>", single_line(sender_email))
    } else {
        format!("{} <{}>", encode_header_value(name), single_line(sender_email))
    }
}

/// Escape a value for use inside a quoted header parameter
fn quote(value: &str) -> String {
    single_line(value).replace('\\', "\\\\").replace('"', "\\\"")
}

/// Header text with CR and LF replaced by spaces, so a value cannot start a new header
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Header text as-is when ASCII, else RFC 2047 B-encoded words
fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join("\r\n ")
}

fn encoded_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", BASE64_STANDARD.encode(text))
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}
