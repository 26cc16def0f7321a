//! Error types for the tanyahr domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type: session creation, streaming,
//! content extraction, and the turn protocol itself.

use thiserror::Error;

/// The top-level error type for all tanyahr operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Session creation ---
    #[error("Session error: {0}")]
    Session(#[from] SessionInitError),

    // --- Streaming ---
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    // --- Content extraction ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Turn protocol ---
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// The backend rejected session creation. Not retried automatically.
#[derive(Debug, Clone, Error)]
pub enum SessionInitError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The backend call failed mid-stream or before yielding any fragment.
/// Fragments already yielded before the failure remain valid.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The content-extraction collaborator failed. Surfaced inline in the
/// ingestion surface, never mixed into the conversation log.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Extractor returned no text")]
    EmptyResult,

    #[error("Network error: {0}")]
    Network(String),
}

/// Violations of the turn protocol, raised before any backend call.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// A turn is already in flight; the submission is rejected, not queued.
    #[error("A reply is still being generated, not ready for a new message")]
    NotReady,

    #[error("Cannot submit an empty message")]
    EmptyMessage,
}
