use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session `{0}` is not running")]
    NotAlive(String),

    #[error("session `{0}` has been closed")]
    Closed(String),

    #[error("engine call timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine rejected request: {0}")]
    Rejected(String),

    #[error("unknown {kind} `{id}`")]
    UnknownObject { kind: &'static str, id: String },

    #[error("engine failure: {0}")]
    Engine(String),
}

impl SessionError {
    pub(crate) fn unknown(kind: &'static str, id: impl ToString) -> Self {
        SessionError::UnknownObject { kind, id: id.to_string() }
    }

    /// `true` when the engine connection itself is gone or unresponsive, as
    /// opposed to a single request being refused.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            SessionError::NotAlive(_) | SessionError::Closed(_) | SessionError::Timeout(_) | SessionError::Engine(_)
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
