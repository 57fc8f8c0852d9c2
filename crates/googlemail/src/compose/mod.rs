//! Outgoing message composition
//!
//! A [`Draft`] collects recipients, subject, an HTML body and attachments;
//! [`build_mime_message`] renders it as a `multipart/mixed` RFC 822 message
//! and [`encode_raw`] produces the form `messages.send` accepts.

mod draft;
mod mime;

pub use draft::Draft;
pub use mime::{build_mime_message, encode_raw, random_boundary, sniff_content_type};
