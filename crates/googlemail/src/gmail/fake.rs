//! In-memory [`MailService`] for unit tests
//!
//! Holds delegates, messages, threads, attachments and labels in memory,
//! counts every mutating or per-message call and can be told to fail
//! specific addresses or message IDs.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::MailService;
use super::MessageFormat;
use super::api::{
    AttachmentBody, Delegate, GmailLabel, GmailMessage, GmailThread, ListDelegatesResponse,
    ListLabelsResponse, ListMessagesResponse, MessageRef,
};
use crate::error::{GmailError, Result};
use crate::models::{MessageId, ThreadId};

/// Messages per page returned by `list_messages`
pub(crate) const PAGE_SIZE: usize = 2;

#[derive(Default)]
pub(crate) struct FakeMailService {
    pub delegates: Mutex<BTreeMap<String, String>>,
    /// Query → matching messages
    pub search_results: Mutex<BTreeMap<String, Vec<MessageRef>>>,
    pub messages: Mutex<BTreeMap<String, GmailMessage>>,
    pub threads: Mutex<BTreeMap<String, GmailThread>>,
    /// (message ID, attachment ID) → base64url data
    pub attachments: Mutex<BTreeMap<(String, String), String>>,
    pub labels: Mutex<Vec<GmailLabel>>,
    pub sent: Mutex<Vec<String>>,
    pub failing: Mutex<HashSet<String>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub get_message_calls: AtomicUsize,
    pub attachment_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeMailService {
    pub fn with_delegates(delegates: &[(&str, &str)]) -> Self {
        let fake = Self::default();
        lock(&fake.delegates).extend(
            delegates
                .iter()
                .map(|(email, status)| (email.to_string(), status.to_string())),
        );
        fake
    }

    /// Make calls for this address or message ID fail with a 500
    pub fn fail_on(&self, key: &str) {
        lock(&self.failing).insert(key.to_string());
    }

    pub fn add_search_result(&self, query: &str, refs: Vec<MessageRef>) {
        lock(&self.search_results).insert(query.to_string(), refs);
    }

    pub fn add_message(&self, message: GmailMessage) {
        lock(&self.messages).insert(message.id.clone(), message);
    }

    pub fn add_thread(&self, thread: GmailThread) {
        lock(&self.threads).insert(thread.id.clone(), thread);
    }

    pub fn add_attachment(&self, message_id: &str, attachment_id: &str, data: &str) {
        lock(&self.attachments).insert(
            (message_id.to_string(), attachment_id.to_string()),
            data.to_string(),
        );
    }

    fn check(&self, key: &str) -> Result<()> {
        if lock(&self.failing).contains(key) {
            return Err(GmailError::Api {
                status: 500,
                message: format!("backend error for {}", key),
                details: None,
            });
        }
        Ok(())
    }

    fn not_found(what: &str) -> GmailError {
        GmailError::Api {
            status: 404,
            message: format!("{} not found", what),
            details: None,
        }
    }
}

impl MailService for FakeMailService {
    fn list_messages(
        &self,
        _user_id: &str,
        query: &str,
        page_token: Option<&str>,
        _include_spam_trash: bool,
    ) -> Result<ListMessagesResponse> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let all = lock(&self.search_results)
            .get(query)
            .cloned()
            .unwrap_or_default();

        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + PAGE_SIZE).min(all.len());
        let page = all.get(start..end).map(<[MessageRef]>::to_vec).unwrap_or_default();

        Ok(ListMessagesResponse {
            result_size_estimate: Some(page.len() as u32),
            messages: (!page.is_empty()).then_some(page),
            next_page_token: (end < all.len()).then(|| end.to_string()),
        })
    }

    fn get_message(
        &self,
        _user_id: &str,
        id: &MessageId,
        format: MessageFormat,
    ) -> Result<GmailMessage> {
        self.get_message_calls.fetch_add(1, Ordering::SeqCst);
        self.check(id.as_str())?;

        let mut message = lock(&self.messages)
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(id.as_str()))?;
        if format != MessageFormat::Raw {
            message.raw = None;
        }
        Ok(message)
    }

    fn get_thread(&self, _user_id: &str, id: &ThreadId) -> Result<GmailThread> {
        lock(&self.threads)
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(id.as_str()))
    }

    fn get_attachment(
        &self,
        _user_id: &str,
        message_id: &MessageId,
        attachment_id: &str,
    ) -> Result<AttachmentBody> {
        self.attachment_calls.fetch_add(1, Ordering::SeqCst);
        let key = (message_id.as_str().to_string(), attachment_id.to_string());
        let data = lock(&self.attachments)
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(attachment_id))?;

        Ok(AttachmentBody {
            size: Some(data.len() as u64),
            data,
        })
    }

    fn send_message(&self, _user_id: &str, raw: &str) -> Result<GmailMessage> {
        let mut sent = lock(&self.sent);
        sent.push(raw.to_string());
        Ok(GmailMessage {
            id: format!("sent-{}", sent.len()),
            thread_id: format!("thread-{}", sent.len()),
            label_ids: Some(vec!["SENT".to_string()]),
            ..Default::default()
        })
    }

    fn list_delegates(&self, _user_id: &str) -> Result<ListDelegatesResponse> {
        let delegates: Vec<Delegate> = lock(&self.delegates)
            .iter()
            .map(|(email, status)| Delegate {
                delegate_email: email.clone(),
                verification_status: Some(status.clone()),
            })
            .collect();

        Ok(ListDelegatesResponse {
            delegates: (!delegates.is_empty()).then_some(delegates),
        })
    }

    fn create_delegate(&self, _user_id: &str, delegate_email: &str) -> Result<Delegate> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check(delegate_email)?;

        lock(&self.delegates).insert(delegate_email.to_string(), "pending".to_string());
        Ok(Delegate {
            delegate_email: delegate_email.to_string(),
            verification_status: Some("pending".to_string()),
        })
    }

    fn delete_delegate(&self, _user_id: &str, delegate_email: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check(delegate_email)?;

        lock(&self.delegates)
            .remove(delegate_email)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(delegate_email))
    }

    fn list_labels(&self, _user_id: &str) -> Result<ListLabelsResponse> {
        let labels = lock(&self.labels).clone();
        Ok(ListLabelsResponse {
            labels: (!labels.is_empty()).then_some(labels),
        })
    }
}
