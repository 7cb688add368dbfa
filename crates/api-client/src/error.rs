use thiserror::Error;

/// Error taxonomy for API calls.
///
/// The split matters to callers: `Transport` and `Server` are transient
/// (poll loops swallow them and retry next cycle), `Rejected` carries the
/// backend's own message for the user, and `AuthExpired` is fatal for the
/// current view: all local tracking state must be discarded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication expired")]
    AuthExpired,

    #[error("server rejected the request: {message}")]
    Rejected { status: u16, message: String },

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Safe to retry on the next cycle without user involvement.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    /// The backend refused because an active record already exists for the
    /// user. The caller should reconcile instead of surfacing a hard error.
    pub fn is_already_tracking(&self) -> bool {
        match self {
            ApiError::Rejected { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("já existe") || lower.contains("ja existe")
            }
            _ => false,
        }
    }
}
