//! Service-account impersonation
//!
//! Signs a JWT assertion for the service account with `sub` set to the
//! mailbox being impersonated, then trades it for an access token using
//! the JWT bearer grant. Requires domain-wide delegation for the scopes.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use ureq::Agent;

use super::{Authenticator, CachedToken, request_token};
use crate::config::{ServiceAccountKey, Settings};
use crate::error::{GmailError, Result};
use crate::gmail::build_agent;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google's maximum)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Service account acting on behalf of one mailbox
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    subject: String,
    scopes: Vec<String>,
    cached: Mutex<Option<CachedToken>>,
    agent: Agent,
}

impl ServiceAccountAuth {
    pub fn new(
        key: ServiceAccountKey,
        subject: impl Into<String>,
        scopes: Vec<String>,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        if scopes.is_empty() {
            anyhow::bail!("At least one OAuth scope is required for impersonation");
        }
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Invalid service account private key")?;

        Ok(Self {
            key,
            encoding_key,
            subject: subject.into(),
            scopes,
            cached: Mutex::new(None),
            agent: build_agent(settings.request_timeout()),
        })
    }

    /// Build from raw service account key JSON
    pub fn from_json(
        key: &[u8],
        subject: impl Into<String>,
        scopes: Vec<String>,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let key = ServiceAccountKey::from_json(key)?;
        Self::new(key, subject, scopes, settings)
    }

    /// The impersonated mailbox
    pub fn subject(&self) -> &str {
        &self.subject
    }

    fn assertion(&self, now: i64) -> Result<String> {
        let claims = Claims {
            iss: &self.key.client_email,
            sub: &self.subject,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    fn fetch_token(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.assertion(now.timestamp())?;

        debug!(
            "Requesting impersonated token for {} as {}",
            self.subject, self.key.client_email
        );
        let response = request_token(
            &self.agent,
            &self.key.token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
        )
        .map_err(|e| match e {
            GmailError::Credential(reason) => GmailError::Credential(format!(
                "impersonating {} failed: {}",
                self.subject, reason
            )),
            other => other,
        })?;

        info!("Obtained impersonated access token for {}", self.subject);
        Ok(CachedToken::from_response(&response, now))
    }
}

impl Authenticator for ServiceAccountAuth {
    fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(token) = cached.as_ref()
            && token.is_fresh(Utc::now())
        {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch_token()?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
