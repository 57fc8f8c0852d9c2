//! Gmail client library
//!
//! This crate provides mailbox operations on top of the Gmail REST API:
//! - Authentication (OAuth user tokens, service-account impersonation)
//! - A bounded-concurrency batch dispatcher for fan-out requests
//! - Delegate management and bulk header retrieval built on it
//! - Search, export, labels and attachment retrieval
//! - MIME composition and sending
//!
//! Everything is synchronous; concurrency comes from the dispatcher's
//! worker pool.

pub mod auth;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gmail;
pub mod mailbox;
pub mod models;

pub use auth::{Authenticator, OAuthTokenAuth, ServiceAccountAuth, StaticToken};
pub use compose::Draft;
pub use crate::config::{ClientSecret, OAuthToken, ServiceAccountKey, Settings};
pub use dispatch::{BatchDispatcher, DispatchReport};
pub use error::{GmailError, Result};
pub use gmail::{GmailClient, MailService, MessageFormat};
pub use mailbox::{HeaderFetch, Mailbox, SentMessage};
pub use models::{
    Attachment, DelegateMap, DelegateUpdate, EmailAddress, ExportedMessage, Label, LabelId,
    MessageBody, MessageId, MessageSummary, ThreadId, VerificationStatus,
};
