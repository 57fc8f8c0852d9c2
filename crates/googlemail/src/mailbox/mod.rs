//! Mailbox operations
//!
//! [`Mailbox`] binds a [`MailService`] to one mailbox address and exposes
//! the operations callers use: searching, exporting, sending, labels,
//! attachments and delegate management. Delegate mutation and bulk header
//! fetches run through a [`BatchDispatcher`] each.

mod attachments;
mod delegates;
mod export;
mod labels;
mod messages;
mod send;

pub use messages::HeaderFetch;
pub use send::SentMessage;

use log::info;
use std::sync::Arc;

use crate::auth::{Authenticator, OAuthTokenAuth, ServiceAccountAuth};
use crate::config::Settings;
use crate::dispatch::BatchDispatcher;
use crate::error::Result;
use crate::gmail::{GmailClient, MailService};

/// One mailbox and the service used to reach it
pub struct Mailbox<S> {
    service: S,
    user_email: String,
    settings: Settings,
    delegate_dispatcher: BatchDispatcher,
    header_dispatcher: BatchDispatcher,
}

impl<S: MailService> Mailbox<S> {
    /// Bind `service` to the mailbox `user_email`
    pub fn new(service: S, user_email: impl Into<String>, settings: Settings) -> Result<Self> {
        let delegate_dispatcher = BatchDispatcher::new(settings.delegate_concurrency)?;
        let header_dispatcher = BatchDispatcher::new(settings.header_fetch_concurrency)?;

        Ok(Self {
            service,
            user_email: user_email.into(),
            settings,
            delegate_dispatcher,
            header_dispatcher,
        })
    }

    /// The mailbox address every call acts on
    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

impl Mailbox<GmailClient> {
    /// Act on `subject` with an existing authenticator
    pub fn with_authenticator(
        auth: Arc<dyn Authenticator>,
        subject: impl Into<String>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let client = GmailClient::new(auth, &settings);
        Ok(Self::new(client, subject, settings)?)
    }

    /// Act on `subject` with a client secret and a stored user token
    pub fn with_oauth(
        subject: impl Into<String>,
        client_secret: &[u8],
        token: &[u8],
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let subject = subject.into();
        let auth = OAuthTokenAuth::from_json(client_secret, token, &settings)?;
        info!("Using OAuth user token for {}", subject);
        Self::with_authenticator(Arc::new(auth), subject, settings)
    }

    /// Act on `subject` through a service account with domain-wide delegation
    pub fn with_impersonation(
        subject: impl Into<String>,
        scopes: Vec<String>,
        service_account_key: &[u8],
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let subject = subject.into();
        let auth =
            ServiceAccountAuth::from_json(service_account_key, subject.clone(), scopes, &settings)?;
        info!("Impersonating {} via service account", subject);
        Self::with_authenticator(Arc::new(auth), subject, settings)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::gmail::fake::FakeMailService;
    use std::num::NonZeroUsize;

    pub fn mailbox(fake: FakeMailService) -> Mailbox<FakeMailService> {
        Mailbox::new(fake, "owner@example.com", Settings::default()).unwrap()
    }

    pub fn mailbox_with_ceilings(
        fake: FakeMailService,
        delegates: usize,
        headers: usize,
    ) -> Mailbox<FakeMailService> {
        let settings = Settings {
            delegate_concurrency: NonZeroUsize::new(delegates).unwrap(),
            header_fetch_concurrency: NonZeroUsize::new(headers).unwrap(),
            ..Settings::default()
        };
        Mailbox::new(fake, "owner@example.com", settings).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::auth::StaticToken;
    use crate::gmail::fake::FakeMailService;

    #[test]
    fn test_new_uses_configured_ceilings() {
        let mailbox = mailbox_with_ceilings(FakeMailService::default(), 4, 2);
        assert_eq!(mailbox.user_email(), "owner@example.com");
        assert_eq!(mailbox.delegate_dispatcher.concurrency().get(), 4);
        assert_eq!(mailbox.header_dispatcher.concurrency().get(), 2);
    }

    #[test]
    fn test_with_authenticator() {
        let mailbox = Mailbox::with_authenticator(
            Arc::new(StaticToken::new("ya29.token")),
            "owner@example.com",
            Settings::default(),
        )
        .unwrap();
        assert_eq!(mailbox.user_email(), "owner@example.com");
        assert_eq!(mailbox.settings().delegate_concurrency.get(), 10);
    }

    #[test]
    fn test_with_oauth_rejects_malformed_secret() {
        let result = Mailbox::with_oauth(
            "owner@example.com",
            b"not json",
            br#"{"access_token": "at"}"#,
            Settings::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_with_impersonation_rejects_bad_key() {
        let result = Mailbox::with_impersonation(
            "owner@example.com",
            vec!["https://mail.google.com/".to_string()],
            br#"{"type": "authorized_user"}"#,
            Settings::default(),
        );
        assert!(result.is_err());
    }
}
