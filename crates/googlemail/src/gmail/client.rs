//! Gmail API HTTP client
//!
//! Implements [`MailService`] over the Gmail REST API.
//! Uses synchronous HTTP (ureq) so calls can run directly on dispatch workers.

use log::debug;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};
use url::form_urlencoded;

use super::api::{
    ApiErrorEnvelope, AttachmentBody, Delegate, GmailMessage, GmailThread, ListDelegatesResponse,
    ListLabelsResponse, ListMessagesResponse, SendMessageRequest,
};
use super::{MailService, MessageFormat};
use crate::auth::Authenticator;
use crate::config::Settings;
use crate::error::{GmailError, Result};
use crate::models::{MessageId, ThreadId};

/// Gmail API client bound to one authenticator
pub struct GmailClient {
    agent: Agent,
    auth: Arc<dyn Authenticator>,
    max_retries: u32,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(auth: Arc<dyn Authenticator>, settings: &Settings) -> Self {
        Self {
            agent: build_agent(settings.request_timeout()),
            auth,
            max_retries: settings.max_retries,
        }
    }

    fn user_url(user_id: &str, path: &str) -> String {
        format!(
            "{}/users/{}/{}",
            Self::BASE_URL,
            urlencoding::encode(user_id),
            path
        )
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.access_token()?))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, context: &'static str) -> Result<T> {
        self.with_retry(context, || {
            let response = self
                .agent
                .get(url)
                .header("Authorization", &self.bearer()?)
                .call()
                .map_err(GmailError::http(context))?;
            read_json(response, context)
        })
    }

    /// Run an idempotent request with exponential backoff retry
    fn with_retry<T>(&self, context: &str, request: impl FnMut() -> Result<T>) -> Result<T> {
        retry(context, self.max_retries, INITIAL_BACKOFF, request)
    }
}

/// First retry delay; doubles after every further failure
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Call `request` up to `max_attempts` times while it fails with a retryable error
fn retry<T>(
    context: &str,
    max_attempts: u32,
    initial_delay: Duration,
    mut request: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match request() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                debug!("{} (attempt {}/{}): {}", context, attempt, max_attempts, e);
                let max_jitter = delay.as_millis().min(100) as u64;
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter));
                std::thread::sleep(delay + jitter);
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

impl MailService for GmailClient {
    fn list_messages(
        &self,
        user_id: &str,
        query: &str,
        page_token: Option<&str>,
        include_spam_trash: bool,
    ) -> Result<ListMessagesResponse> {
        let mut params = form_urlencoded::Serializer::new(String::new());
        params.append_pair("q", query);
        params.append_pair("maxResults", "500");
        params.append_pair("includeSpamTrash", if include_spam_trash { "true" } else { "false" });
        if let Some(token) = page_token {
            params.append_pair("pageToken", token);
        }

        let url = format!("{}?{}", Self::user_url(user_id, "messages"), params.finish());
        self.get_json(&url, "Failed to list messages")
    }

    fn get_message(
        &self,
        user_id: &str,
        id: &MessageId,
        format: MessageFormat,
    ) -> Result<GmailMessage> {
        let url = format!(
            "{}?format={}",
            Self::user_url(user_id, &format!("messages/{}", urlencoding::encode(id.as_str()))),
            format.as_str()
        );
        self.get_json(&url, "Failed to get message")
    }

    fn get_thread(&self, user_id: &str, id: &ThreadId) -> Result<GmailThread> {
        let url = format!(
            "{}?format=full",
            Self::user_url(user_id, &format!("threads/{}", urlencoding::encode(id.as_str())))
        );
        self.get_json(&url, "Failed to get thread")
    }

    fn get_attachment(
        &self,
        user_id: &str,
        message_id: &MessageId,
        attachment_id: &str,
    ) -> Result<AttachmentBody> {
        let url = Self::user_url(
            user_id,
            &format!(
                "messages/{}/attachments/{}",
                urlencoding::encode(message_id.as_str()),
                urlencoding::encode(attachment_id)
            ),
        );
        self.get_json(&url, "Failed to get attachment")
    }

    fn send_message(&self, user_id: &str, raw: &str) -> Result<GmailMessage> {
        const CONTEXT: &str = "Failed to send message";
        let url = Self::user_url(user_id, "messages/send");

        // Not retried: a timed-out send may still have been delivered.
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(&SendMessageRequest { raw })
            .map_err(GmailError::http(CONTEXT))?;
        read_json(response, CONTEXT)
    }

    fn list_delegates(&self, user_id: &str) -> Result<ListDelegatesResponse> {
        let url = Self::user_url(user_id, "settings/delegates");
        self.get_json(&url, "Failed to list delegates")
    }

    fn create_delegate(&self, user_id: &str, delegate_email: &str) -> Result<Delegate> {
        const CONTEXT: &str = "Failed to create delegate";
        let url = Self::user_url(user_id, "settings/delegates");
        let body = Delegate {
            delegate_email: delegate_email.to_string(),
            verification_status: None,
        };

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(&body)
            .map_err(GmailError::http(CONTEXT))?;
        read_json(response, CONTEXT)
    }

    fn delete_delegate(&self, user_id: &str, delegate_email: &str) -> Result<()> {
        const CONTEXT: &str = "Failed to delete delegate";
        let url = Self::user_url(
            user_id,
            &format!("settings/delegates/{}", urlencoding::encode(delegate_email)),
        );

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(GmailError::http(CONTEXT))?;
        check_status(response).map(|_| ())
    }

    fn list_labels(&self, user_id: &str) -> Result<ListLabelsResponse> {
        let url = Self::user_url(user_id, "labels");
        self.get_json(&url, "Failed to list labels")
    }
}

/// Build an agent that reports non-2xx statuses as responses
///
/// The error body carries the service's message, so statuses are checked
/// by [`check_status`] rather than turned into bare status-code errors.
pub(crate) fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Pass successful responses through, convert the rest to [`GmailError::Api`]
pub(crate) fn check_status(mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(api_error(
        status.as_u16(),
        status.canonical_reason().unwrap_or("request failed"),
        &body,
    ))
}

fn read_json<T: DeserializeOwned>(response: Response<Body>, context: &'static str) -> Result<T> {
    let mut response = check_status(response)?;
    response
        .body_mut()
        .read_json()
        .map_err(GmailError::http(context))
}

/// Decode Google's error envelope, falling back to the raw body
fn api_error(status: u16, reason: &str, body: &str) -> GmailError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let details = envelope
                .error
                .errors
                .unwrap_or_default()
                .into_iter()
                .filter_map(|item| match (item.reason, item.message) {
                    (Some(reason), Some(message)) => Some(format!("{}: {}", reason, message)),
                    (Some(text), None) | (None, Some(text)) => Some(text),
                    (None, None) => None,
                })
                .collect::<Vec<_>>()
                .join("; ");

            let message = if envelope.error.message.is_empty() {
                reason.to_string()
            } else {
                envelope.error.message
            };

            GmailError::Api {
                status,
                message,
                details: (!details.is_empty()).then_some(details),
            }
        }
        Err(_) => {
            let trimmed = body.trim();
            GmailError::Api {
                status,
                message: if trimmed.is_empty() {
                    reason.to_string()
                } else {
                    trimmed.to_string()
                },
                details: None,
            }
        }
    }
}
