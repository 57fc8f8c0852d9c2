//! OAuth2 user-token authentication
//!
//! Wraps a client secret and a token issued by an earlier consent flow.
//! The access token is refreshed with the refresh token once it gets
//! within five minutes of expiry.

use chrono::Utc;
use log::{debug, info};
use std::sync::{Mutex, PoisonError};
use ureq::Agent;

use super::{Authenticator, CachedToken, request_token};
use crate::config::{ClientSecret, OAuthToken, Settings};
use crate::error::{GmailError, Result};
use crate::gmail::build_agent;

/// Client credentials plus a refreshable user token
pub struct OAuthTokenAuth {
    client: ClientSecret,
    state: Mutex<TokenState>,
    agent: Agent,
}

struct TokenState {
    cached: CachedToken,
    refresh_token: Option<String>,
}

impl OAuthTokenAuth {
    pub fn new(client: ClientSecret, token: OAuthToken, settings: &Settings) -> Self {
        Self {
            client,
            state: Mutex::new(TokenState {
                cached: CachedToken {
                    access_token: token.access_token,
                    expires_at: token.expiry,
                },
                refresh_token: token.refresh_token,
            }),
            agent: build_agent(settings.request_timeout()),
        }
    }

    /// Build from raw client-secret and token JSON
    pub fn from_json(
        client_secret: &[u8],
        token: &[u8],
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let client = ClientSecret::from_json(client_secret)?;
        let token = OAuthToken::from_json(token)?;
        Ok(Self::new(client, token, settings))
    }

    /// Snapshot of the current token, e.g. to persist after a refresh
    pub fn token(&self) -> OAuthToken {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        OAuthToken {
            access_token: state.cached.access_token.clone(),
            token_type: Some("Bearer".to_string()),
            refresh_token: state.refresh_token.clone(),
            expiry: state.cached.expires_at,
        }
    }

    /// Refresh an access token using a refresh token
    fn refresh(&self, state: &mut TokenState) -> Result<()> {
        let refresh_token = state.refresh_token.clone().ok_or_else(|| {
            GmailError::Credential("access token expired and no refresh token is available".into())
        })?;

        debug!("Refreshing OAuth access token for client {}", self.client.client_id);
        let response = request_token(
            &self.agent,
            &self.client.token_uri,
            &[
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ],
        )?;

        state.cached = CachedToken::from_response(&response, Utc::now());
        // Preserve the refresh token if not returned
        if let Some(rotated) = response.refresh_token {
            state.refresh_token = Some(rotated);
        }
        info!("OAuth access token refreshed");
        Ok(())
    }
}

impl Authenticator for OAuthTokenAuth {
    fn access_token(&self) -> Result<String> {
        // Held across the refresh so concurrent callers wait for one refresh.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if !state.cached.is_fresh(Utc::now()) {
            self.refresh(&mut state)?;
        }
        Ok(state.cached.access_token.clone())
    }
}
