//! Message search and bulk header retrieval

use log::{debug, info, warn};

use super::Mailbox;
use crate::error::{GmailError, Result};
use crate::gmail::api::MessageRef;
use crate::gmail::{MailService, MessageFormat, summarize};
use crate::models::{MessageId, MessageSummary};

/// Headers of a set of messages, with the IDs that could not be read
#[derive(Debug, Default)]
pub struct HeaderFetch {
    /// In no particular order
    pub messages: Vec<MessageSummary>,
    pub failed: Vec<(MessageId, GmailError)>,
}

impl HeaderFetch {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<S: MailService> Mailbox<S> {
    /// All messages matching a Gmail search query, across every result page
    pub fn search(&self, query: &str) -> Result<Vec<MessageRef>> {
        let mut messages = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self.service.list_messages(
                &self.user_email,
                query,
                page_token.as_deref(),
                self.settings.include_spam_trash,
            )?;
            messages.extend(response.messages.unwrap_or_default());

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(
            "{}: query {:?} returned {} messages",
            self.user_email,
            query,
            messages.len()
        );
        Ok(messages)
    }

    /// The message with the given RFC 822 `Message-ID`
    pub fn find_message(&self, rfc822_msg_id: &str) -> Result<MessageRef> {
        let query = format!("rfc822msgid:{}", rfc822_msg_id);
        self.search(&query)?
            .into_iter()
            .next()
            .ok_or_else(|| GmailError::NotFound(format!("message {}", rfc822_msg_id)))
    }

    /// Headers of every listed message, one metadata request per message
    ///
    /// Requests run through the header dispatcher; a failed request is
    /// recorded against its ID and the rest still complete.
    pub fn fetch_headers(&self, ids: Vec<MessageId>) -> HeaderFetch {
        if ids.is_empty() {
            return HeaderFetch::default();
        }

        debug!("{}: fetching headers of {} messages", self.user_email, ids.len());
        let report = self.header_dispatcher.dispatch(ids, |id| {
            self.service
                .get_message(&self.user_email, id, MessageFormat::Metadata)
        });

        let (succeeded, failed) = report.partition();
        for (id, err) in &failed {
            warn!("{}: failed to fetch headers of {}: {}", self.user_email, id, err);
        }

        HeaderFetch {
            messages: succeeded
                .into_iter()
                .map(|(_, message)| summarize(message))
                .collect(),
            failed,
        }
    }

    /// Search, then fetch the headers of every match
    pub fn search_headers(&self, query: &str) -> Result<HeaderFetch> {
        let ids = self
            .search(query)?
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect();
        Ok(self.fetch_headers(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::gmail::api::{GmailMessage, Header, MessagePayload};
    use crate::gmail::fake::{FakeMailService, PAGE_SIZE};
    use std::sync::atomic::Ordering;

    fn message_ref(id: &str) -> MessageRef {
        MessageRef {
            id: id.to_string(),
            thread_id: format!("t-{}", id),
        }
    }

    fn metadata_message(id: &str, subject: &str) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: format!("t-{}", id),
            payload: Some(MessagePayload {
                headers: Some(vec![Header {
                    name: "Subject".to_string(),
                    value: subject.to_string(),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_follows_pages() {
        let fake = FakeMailService::default();
        let refs: Vec<MessageRef> = (0..5).map(|i| message_ref(&format!("m{}", i))).collect();
        fake.add_search_result("from:ann", refs.clone());
        let mailbox = mailbox(fake);

        let found = mailbox.search("from:ann").unwrap();

        assert_eq!(found, refs);
        assert_eq!(
            mailbox.service().list_calls.load(Ordering::SeqCst),
            5usize.div_ceil(PAGE_SIZE)
        );
    }

    #[test]
    fn test_search_no_results() {
        let mailbox = mailbox(FakeMailService::default());
        assert!(mailbox.search("nothing").unwrap().is_empty());
        assert_eq!(mailbox.service().list_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_find_message() {
        let fake = FakeMailService::default();
        fake.add_search_result("rfc822msgid:<abc@mail>", vec![message_ref("m1")]);
        let mailbox = mailbox(fake);

        assert_eq!(mailbox.find_message("<abc@mail>").unwrap().id, "m1");
        assert!(matches!(
            mailbox.find_message("<missing@mail>"),
            Err(GmailError::NotFound(_))
        ));
    }

    #[test]
    fn test_fetch_headers_partial_failure() {
        let fake = FakeMailService::default();
        for (id, subject) in [("m1", "one"), ("m2", "two"), ("m3", "three")] {
            fake.add_message(metadata_message(id, subject));
        }
        fake.fail_on("m2");
        let mailbox = mailbox_with_ceilings(fake, 1, 2);

        let fetch = mailbox.fetch_headers(vec!["m1".into(), "m2".into(), "m3".into()]);

        assert_eq!(mailbox.service().get_message_calls.load(Ordering::SeqCst), 3);
        assert!(!fetch.is_complete());
        assert_eq!(fetch.failed.len(), 1);
        assert_eq!(fetch.failed[0].0.as_str(), "m2");

        let mut subjects: Vec<&str> = fetch.messages.iter().map(|m| m.subject()).collect();
        subjects.sort();
        assert_eq!(subjects, vec!["one", "three"]);
    }

    #[test]
    fn test_search_headers_empty_makes_no_requests() {
        let mailbox = mailbox(FakeMailService::default());

        let fetch = mailbox.search_headers("label:none").unwrap();

        assert!(fetch.messages.is_empty());
        assert!(fetch.is_complete());
        assert_eq!(mailbox.service().get_message_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_search_headers() {
        let fake = FakeMailService::default();
        fake.add_search_result("is:unread", vec![message_ref("m1"), message_ref("m2")]);
        fake.add_message(metadata_message("m1", "first"));
        fake.add_message(metadata_message("m2", "second"));
        let mailbox = mailbox(fake);

        let fetch = mailbox.search_headers("is:unread").unwrap();

        assert_eq!(fetch.messages.len(), 2);
        assert!(fetch.is_complete());
    }
}
