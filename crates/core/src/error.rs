//! Error types for the copperclaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error enum; the top-level `Error` aggregates them.
//!
//! `ChatError` display text matters more than usual here: the error
//! classifier keys off it to decide whether a failure is worth retrying on
//! another backend, so variants spell out the tokens real APIs emit
//! ("401", "rate limit", "timeout", ...).

use thiserror::Error;

/// The top-level error type for copperclaw operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Chat backend error: {0}")]
    Chat(#[from] ChatError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A raw failure from a chat backend.
///
/// Cloneable so attempt records can keep a copy while the original is
/// classified and propagated.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Context window too long: {0}")]
    ContextOverflow(String),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

/// Errors from session turn management.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A turn is already in flight for session {session}")]
    TurnInProgress { session: String },

    #[error("Unknown session: {session}")]
    UnknownSession { session: String },
}
