use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("transaction conflict: store changed since version {0}")]
    TxConflict(u64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("audit error: {0}")]
    Audit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

impl ForgeError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ForgeError::NotFound(what.into())
    }

    pub fn denied(what: impl Into<String>) -> Self {
        ForgeError::PermissionDenied(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        ForgeError::Conflict(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        ForgeError::InvalidInput(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }

    /// Message shown at the outer boundary. Not-found carries no detail so
    /// an unreadable entry looks exactly like a missing one.
    pub fn user_message(&self) -> String {
        match self {
            ForgeError::NotFound(_) => "not found".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
