use thiserror::Error;

/// Errors surfaced by the tracking-service and metadata collaborators.
/// Network and auth failures all funnel through here so callers can turn
/// them into per-item error strings without caring about the transport.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not authenticated with the tracking service")]
    NotAuthenticated,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn other(message: impl Into<String>) -> Self {
        SourceError::Other(message.into())
    }
}
