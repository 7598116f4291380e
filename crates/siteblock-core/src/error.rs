//! Core error types for siteblock-core.
//!
//! Errors are grouped by the layer that raises them. Every public operation
//! returns [`CoreError`], which wraps the category errors below.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for siteblock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad user input; no state was changed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Key-value store read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The rule-install facility rejected a rule set.
    ///
    /// Session transitions never return this; they log it and keep going.
    #[error("Rule install error: {0}")]
    RuleInstall(#[from] RuleError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Grading was attempted with no challenge in progress.
    #[error("No active math challenge")]
    NoActiveChallenge,

    /// An operation that needs a running session found none.
    #[error("No active blocking session")]
    NoActiveSession,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Duration must be greater than zero minutes (got {0})")]
    InvalidDuration(i64),

    #[error("No websites to block")]
    EmptySiteList,

    #[error("Answer '{raw}' is not a whole number")]
    InvalidAnswer { raw: String },

    #[error("Note text is empty")]
    EmptyNote,

    #[error("Unknown difficulty '{0}' (expected easy, medium or hard)")]
    UnknownDifficulty(String),

    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored value could not be encoded or decoded
    #[error("Malformed value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// The store is unavailable (used by in-memory stores to simulate outages)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Rule-install facility errors.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Duplicate rule id {0}")]
    DuplicateRuleId(u32),

    #[error("Rule set too large: {requested} rules requested, limit is {limit}")]
    TooManyRules { requested: usize, limit: usize },

    #[error("Rule set rejected: {0}")]
    Rejected(String),

    #[error("Rule storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::Query(err.to_string())
                }
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
