//! Domain models for mailbox entities

mod attachment;
mod delegate;
mod label;
mod message;
mod thread;

pub use attachment::Attachment;
pub use delegate::{DelegateMap, DelegateUpdate, VerificationStatus};
pub use label::{Label, LabelId};
pub use message::{EmailAddress, ExportedMessage, MessageBody, MessageId, MessageSummary};
pub use thread::ThreadId;
