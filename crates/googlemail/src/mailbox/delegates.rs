//! Delegate management
//!
//! Adds and removes are idempotent: the request is filtered against a
//! fresh snapshot of the delegate set, so only addresses that actually need
//! a change are sent, and the authoritative set is re-read afterwards.

use log::{info, warn};
use std::collections::HashSet;

use super::Mailbox;
use crate::error::{GmailError, Result};
use crate::gmail::MailService;
use crate::models::{DelegateMap, DelegateUpdate, VerificationStatus};

impl<S: MailService> Mailbox<S> {
    /// Current delegates with their verification status
    pub fn get_delegates(&self) -> Result<DelegateMap> {
        let response = self.service.list_delegates(&self.user_email)?;

        Ok(response
            .delegates
            .unwrap_or_default()
            .into_iter()
            .map(|d| {
                let status = VerificationStatus::parse(d.verification_status.as_deref());
                (d.delegate_email, status)
            })
            .collect())
    }

    /// Grant delegate access to every address not already a delegate
    pub fn add_delegates<A: AsRef<str>>(&self, addresses: &[A]) -> Result<DelegateUpdate> {
        let existing = self.get_delegates()?;
        let pending = pending_additions(&existing, addresses);
        for skipped in skipped(addresses, &pending) {
            info!(
                "{}: {} is already a delegate or repeated, skipping",
                self.user_email, skipped
            );
        }

        let report = self.delegate_dispatcher.dispatch(pending, |address| {
            self.service.create_delegate(&self.user_email, address)
        });
        self.finish_update("add", report.partition())
    }

    /// Revoke delegate access from every address that currently has it
    pub fn remove_delegates<A: AsRef<str>>(&self, addresses: &[A]) -> Result<DelegateUpdate> {
        let existing = self.get_delegates()?;
        let pending = pending_removals(&existing, addresses);
        for skipped in skipped(addresses, &pending) {
            info!(
                "{}: {} is not a delegate or repeated, skipping",
                self.user_email, skipped
            );
        }

        let report = self.delegate_dispatcher.dispatch(pending, |address| {
            self.service.delete_delegate(&self.user_email, address)
        });
        self.finish_update("remove", report.partition())
    }

    fn finish_update<V>(
        &self,
        action: &str,
        (succeeded, failed): (Vec<(String, V)>, Vec<(String, GmailError)>),
    ) -> Result<DelegateUpdate> {
        for (address, _) in &succeeded {
            info!("{}: {} delegate {}", self.user_email, action, address);
        }
        for (address, err) in &failed {
            warn!(
                "{}: failed to {} delegate {}: {}",
                self.user_email, action, address, err
            );
        }

        let mut dispatched: Vec<String> =
            succeeded.into_iter().map(|(address, _)| address).collect();
        dispatched.extend(failed.iter().map(|(address, _)| address.clone()));
        dispatched.sort();

        Ok(DelegateUpdate {
            delegates: self.get_delegates()?,
            dispatched,
            failed,
        })
    }
}

/// Requested addresses that are not yet delegates, first occurrence only
fn pending_additions<A: AsRef<str>>(existing: &DelegateMap, addresses: &[A]) -> Vec<String> {
    let delegated: HashSet<String> = existing.keys().map(|k| k.to_lowercase()).collect();
    let mut seen = HashSet::new();

    addresses
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty())
        .filter(|a| {
            let key = a.to_lowercase();
            !delegated.contains(&key) && seen.insert(key)
        })
        .map(str::to_string)
        .collect()
}

/// Existing delegates named in the request, spelled as Gmail reports them
fn pending_removals<A: AsRef<str>>(existing: &DelegateMap, addresses: &[A]) -> Vec<String> {
    let mut seen = HashSet::new();

    addresses
        .iter()
        .filter_map(|a| {
            let wanted = a.as_ref().trim();
            existing.keys().find(|k| k.eq_ignore_ascii_case(wanted))
        })
        .filter(|k| seen.insert(k.to_lowercase()))
        .cloned()
        .collect()
}

/// Requested entries that were filtered out
fn skipped<'a, A: AsRef<str>>(addresses: &'a [A], pending: &[String]) -> Vec<&'a str> {
    let mut remaining: Vec<String> = pending.iter().map(|p| p.to_lowercase()).collect();

    addresses
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty())
        .filter(|a| {
            let key = a.to_lowercase();
            match remaining.iter().position(|p| *p == key) {
                Some(index) => {
                    remaining.swap_remove(index);
                    false
                }
                None => true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::gmail::fake::FakeMailService;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_get_delegates() {
        let mailbox = mailbox(FakeMailService::with_delegates(&[
            ("a@example.com", "accepted"),
            ("b@example.com", "pending"),
        ]));

        let delegates = mailbox.get_delegates().unwrap();
        assert_eq!(delegates.len(), 2);
        assert_eq!(delegates["a@example.com"], VerificationStatus::Accepted);
        assert_eq!(delegates["b@example.com"], VerificationStatus::Pending);
    }

    #[test]
    fn test_get_delegates_empty() {
        let mailbox = mailbox(FakeMailService::default());
        assert!(mailbox.get_delegates().unwrap().is_empty());
    }

    #[test]
    fn test_add_skips_existing_delegates() {
        let mailbox = mailbox(FakeMailService::with_delegates(&[("a@example.com", "accepted")]));

        let update = mailbox
            .add_delegates(&["A@example.com", "b@example.com", "b@example.com"])
            .unwrap();

        assert_eq!(update.dispatched, vec!["b@example.com"]);
        assert!(update.is_complete());
        assert_eq!(mailbox.service().create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(update.delegates.len(), 2);
        assert_eq!(update.delegates["b@example.com"], VerificationStatus::Pending);
    }

    #[test]
    fn test_add_all_existing_makes_no_calls() {
        let mailbox = mailbox(FakeMailService::with_delegates(&[
            ("a@example.com", "accepted"),
            ("b@example.com", "accepted"),
        ]));

        let update = mailbox.add_delegates(&["a@example.com", "b@example.com"]).unwrap();

        assert!(update.dispatched.is_empty());
        assert_eq!(mailbox.service().create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(update.delegates.len(), 2);
    }

    #[test]
    fn test_add_records_partial_failure() {
        let fake = FakeMailService::default();
        fake.fail_on("bad@example.com");
        let mailbox = mailbox_with_ceilings(fake, 2, 1);

        let update = mailbox
            .add_delegates(&["a@example.com", "bad@example.com", "c@example.com"])
            .unwrap();

        assert_eq!(mailbox.service().create_calls.load(Ordering::SeqCst), 3);
        assert_eq!(update.failed.len(), 1);
        assert_eq!(update.failed[0].0, "bad@example.com");
        assert_eq!(update.failed[0].1.status(), Some(500));
        assert!(!update.is_complete());
        assert_eq!(
            update.delegates.keys().collect::<Vec<_>>(),
            vec!["a@example.com", "c@example.com"]
        );
    }

    #[test]
    fn test_remove_only_existing() {
        let mailbox = mailbox(FakeMailService::with_delegates(&[
            ("a@example.com", "accepted"),
            ("b@example.com", "accepted"),
        ]));

        let update = mailbox
            .remove_delegates(&["B@example.com", "zed@example.com"])
            .unwrap();

        assert_eq!(update.dispatched, vec!["b@example.com"]);
        assert_eq!(mailbox.service().delete_calls.load(Ordering::SeqCst), 1);
        assert_eq!(update.delegates.keys().collect::<Vec<_>>(), vec!["a@example.com"]);
    }

    #[test]
    fn test_remove_nothing_delegated() {
        let mailbox = mailbox(FakeMailService::default());
        let update = mailbox.remove_delegates(&["a@example.com"]).unwrap();

        assert!(update.dispatched.is_empty());
        assert_eq!(mailbox.service().delete_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pending_additions_keeps_first_spelling() {
        let existing = DelegateMap::new();
        let requested = ["X@example.com", " x@example.com ", "", "y@example.com"];
        let pending = pending_additions(&existing, &requested);
        assert_eq!(pending, vec!["X@example.com", "y@example.com"]);
    }

    #[test]
    fn test_skipped_entries() {
        let addresses = ["a@example.com", "b@example.com", "b@example.com"];
        let pending = vec!["b@example.com".to_string()];
        assert_eq!(skipped(&addresses, &pending), vec!["a@example.com", "b@example.com"]);
    }
}
