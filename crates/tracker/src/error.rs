use tempo_api::RecordError;
use tempo_api_client::ApiError;
use thiserror::Error;

/// Errors surfaced to the user from start/stop operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    /// The backend no longer accepts our credentials. All local tracking
    /// state has been discarded and `AuthExpired` was broadcast.
    #[error("authentication expired; tracking state discarded")]
    AuthExpired,

    /// The server already holds an active record for this user. A refresh
    /// was broadcast so reconciliation adopts the server's session.
    #[error("a session is already being tracked; refreshing from server")]
    AlreadyTracking,

    /// The server confirmed the operation but returned a record the client
    /// cannot key (see [`RecordError`]).
    #[error("unusable server record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error(transparent)]
    Api(ApiError),
}
