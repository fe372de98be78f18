//! Error types for ragnarok

use thiserror::Error;

/// Broad failure class, used to pick the hint shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generation service unreachable, rejected credentials, throttled
    Upstream,
    /// Model replied, but not with a usable workout
    Malformed,
    /// Spreadsheet or local table could not be read or written
    Store,
    /// Bad input or configuration on our side
    Local,
}

#[derive(Error, Debug)]
pub enum LabError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation service rejected the credentials: {0}")]
    Auth(String),

    #[error("Rate limited by the generation service")]
    RateLimited,

    #[error("Generation service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid JSON from model: {0}")]
    MalformedResponse(String),

    #[error("Workout failed validation: {0}")]
    Validation(String),

    #[error("Cannot access {target}: {message}")]
    StoreAccess { target: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, LabError>;

impl LabError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StoreAccess {
            target: target.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LabError::Network(_)
            | LabError::Timeout(_)
            | LabError::Auth(_)
            | LabError::RateLimited
            | LabError::Api { .. } => ErrorKind::Upstream,
            LabError::MalformedResponse(_) | LabError::Validation(_) => ErrorKind::Malformed,
            LabError::StoreAccess { .. } | LabError::Database(_) => ErrorKind::Store,
            LabError::Config(_) | LabError::InvalidInput(_) => ErrorKind::Local,
        }
    }

    /// Worth another attempt without user intervention.
    /// Only network trouble, throttling and 5xx qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            LabError::Network(_) | LabError::Timeout(_) | LabError::RateLimited => true,
            LabError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// What the user should try next
    pub fn user_hint(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Upstream => "Check your connection and API key, then try again.",
            ErrorKind::Malformed => "The model returned an unusable workout. Regenerate it.",
            ErrorKind::Store => {
                "Check that the sheet is shared with the service account as Editor and that the worksheet names match."
            }
            ErrorKind::Local => "Check the command arguments and configuration.",
        }
    }
}
