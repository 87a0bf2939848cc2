//! Operation error taxonomy

use thiserror::Error;

use crate::models::EntityKind;

/// Result type for site operations
pub type Result<T> = std::result::Result<T, OpsError>;

/// Failures an operation can report to its caller.
///
/// Every variant renders to the human-readable message returned in the
/// `{success: false, message}` response body.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Credentials rejected or site unknown
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Store used outside of a live session
    #[error("Session error: {0}")]
    Session(String),

    /// Named entity absent
    #[error("{kind} '{name}' not found{}", scope_suffix(.scope))]
    NotFound {
        kind: EntityKind,
        name: String,
        scope: Option<String>,
    },

    /// More than one candidate matched the normalized name
    #[error("Multiple {kind}s named '{name}' found{}. Please provide a project name to narrow down.", scope_suffix(.scope))]
    AmbiguousMatch {
        kind: EntityKind,
        name: String,
        scope: Option<String>,
    },

    /// Create collided with an existing entity; `existing` lists current names
    #[error("{kind} '{name}' already exists. Please choose another name.")]
    AlreadyExists {
        kind: EntityKind,
        name: String,
        existing: Vec<String>,
    },

    /// Asserted current owner is not the actual owner
    #[error("Current owner '{asserted}' does not match the actual owner of {kind} '{name}'.")]
    OwnerMismatch {
        kind: EntityKind,
        name: String,
        asserted: String,
    },

    /// Operation requires a project scope
    #[error("A project name is required to {action} a {kind}.")]
    MissingProject { kind: EntityKind, action: String },

    /// Unsupported rendition or package format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Unsupported content type
    #[error("Invalid content type: {0}")]
    InvalidType(String),

    /// Missing or unusable configuration for an operation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opaque failure reported by the remote store
    #[error("Remote error: {0}")]
    Remote(String),

    /// Network failure talking to the remote store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Package archive could not be read
    #[error("Archive error: {0}")]
    Archive(String),

    /// Local filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn scope_suffix(scope: &Option<String>) -> String {
    match scope {
        Some(project) => format!(" in project '{project}'"),
        None => String::new(),
    }
}
