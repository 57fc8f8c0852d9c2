//! Error types for mailbox operations

/// Result alias used by every mailbox operation
pub type Result<T> = std::result::Result<T, GmailError>;

/// Errors returned by the Gmail client
///
/// One variant per failure class: credentials, transport, service-side
/// rejection, payload decoding. Batch operations record these per item
/// instead of returning them.
#[derive(Debug, thiserror::Error)]
pub enum GmailError {
    /// Missing, malformed or rejected credential material
    #[error("credential error: {0}")]
    Credential(String),

    /// The request could not be sent or its response could not be read
    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: ureq::Error,
    },

    /// The service answered with a non-success status
    #[error("Gmail API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        /// Secondary human-readable details, when the service provides them
        details: Option<String>,
    },

    /// A base64 payload from the service could not be decoded
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// A lookup matched nothing
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Service-account assertion could not be signed
    #[error("failed to sign service account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The dispatch worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl GmailError {
    /// Wrap a transport error with a short description of the failed request
    pub(crate) fn http(context: &'static str) -> impl FnOnce(ureq::Error) -> Self {
        move |source| Self::Http { context, source }
    }

    /// Whether repeating the same request could succeed
    ///
    /// Transport failures, rate limiting (429) and server errors (5xx) are
    /// retryable; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { source, .. } => !matches!(source, ureq::Error::Json(_)),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status of a service-side rejection
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Secondary details attached to a service-side rejection
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Api { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}
