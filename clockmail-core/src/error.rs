//! Error types for clockmail operations.

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Cannot open database at {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Schema migration failed: {reason}")]
    MigrationFailed { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("Cannot parse persisted timestamp {value:?} for {context}: {reason}")]
    TimestampParse {
        context: String,
        value: String,
        reason: String,
    },
}

impl StorageError {
    /// The raw message of the underlying driver error, used by the
    /// transient-contention classifier.
    pub fn driver_message(&self) -> &str {
        match self {
            StorageError::OpenFailed { reason, .. }
            | StorageError::MigrationFailed { reason }
            | StorageError::QueryFailed { reason }
            | StorageError::TransactionFailed { reason } => reason,
            _ => "",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no agent ID: pass --agent or set {env_var}")]
    MissingAgentId { env_var: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Coordination errors surfaced by the session layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("no recipients after expanding {spec:?}")]
    EmptyRecipients { spec: String },
}

/// Master error type for all clockmail errors.
#[derive(Debug, Clone, Error)]
pub enum ClockmailError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),
}

/// Result type alias for clockmail operations.
pub type ClockmailResult<T> = Result<T, ClockmailError>;
