//! Mailbox delegate models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::GmailError;

/// Delegate address → verification status
pub type DelegateMap = BTreeMap<String, VerificationStatus>;

/// Verification state of a delegate as reported by Gmail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationStatus {
    Accepted,
    Pending,
    Rejected,
    Expired,
    #[serde(other)]
    Unspecified,
}

impl VerificationStatus {
    /// Parse the API's status string; unknown or missing values map to `Unspecified`
    pub fn parse(status: Option<&str>) -> Self {
        match status {
            Some("accepted") => Self::Accepted,
            Some("pending") => Self::Pending,
            Some("rejected") => Self::Rejected,
            Some("expired") => Self::Expired,
            _ => Self::Unspecified,
        }
    }
}

/// Result of adding or removing a set of delegates
#[derive(Debug)]
pub struct DelegateUpdate {
    /// Delegates as re-read after the batch finished
    pub delegates: DelegateMap,
    /// Addresses a remote call was made for
    pub dispatched: Vec<String>,
    /// Addresses whose remote call failed
    pub failed: Vec<(String, GmailError)>,
}

impl DelegateUpdate {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
