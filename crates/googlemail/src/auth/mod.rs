//! Access-token providers
//!
//! [`Authenticator`] is the seam between the Gmail client and whatever
//! produces bearer tokens:
//! - [`StaticToken`] for a token issued elsewhere
//! - [`OAuthTokenAuth`] for a client secret plus a stored user token
//! - [`ServiceAccountAuth`] for domain-wide delegation (impersonation)

mod oauth;
mod service_account;

pub use oauth::OAuthTokenAuth;
pub use service_account::ServiceAccountAuth;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use ureq::Agent;

use crate::error::{GmailError, Result};

/// Tokens this close to expiry are treated as expired
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Supplies bearer tokens for Gmail API requests
///
/// Called once per request, possibly from several dispatch workers at
/// once; implementations cache and refresh internally.
pub trait Authenticator: Send + Sync {
    fn access_token(&self) -> Result<String>;
}

/// A bearer token obtained outside this crate
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Authenticator for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Access token with its expiry
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// `None` means the token does not report an expiry
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn from_response(response: &TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token.clone(),
            expires_at: response
                .expires_in
                .map(|secs| now + Duration::seconds(secs as i64)),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self
                .expires_at
                .is_none_or(|at| at > now + Duration::seconds(EXPIRY_BUFFER_SECS))
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Error body from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// POST a form to the token endpoint and read the token response
fn request_token(agent: &Agent, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
    const CONTEXT: &str = "Failed to request access token";

    let mut response = agent
        .post(token_uri)
        .send_form(form.iter().copied())
        .map_err(GmailError::http(CONTEXT))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{} ({})", err.error, description),
                None => err.error,
            },
            Err(_) => format!("token endpoint returned {}", status.as_u16()),
        };
        return Err(GmailError::Credential(reason));
    }

    response
        .body_mut()
        .read_json()
        .map_err(GmailError::http("Failed to parse token response"))
}
