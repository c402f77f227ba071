use thiserror::Error;

/// Main error type for mdmviz
#[derive(Error, Debug)]
pub enum MdmvizError {
    /// Transport-level HTTP errors (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed metadata document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login rejected or no session id in the login response
    #[error("Login failed: {0}")]
    Authentication(String),

    /// Metadata endpoint returned a non-success status
    #[error("Metadata fetch failed: {0}")]
    MetadataFetch(String),

    /// Visualize requested with nothing selected
    #[error("Select at least one entity to visualize.")]
    NoSelection,

    /// Selected entity is not among the eligible entities
    #[error("Entity '{0}' not found.")]
    EntityNotFound(String),

    /// Environment name not present in configuration
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// HTTP session id unknown or expired
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Operation needs a logged-in session
    #[error("Not logged in")]
    NotAuthenticated,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MdmvizError {
    /// True for failures caused by the remote MDM service rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(self, MdmvizError::Http(_) | MdmvizError::MetadataFetch(_))
    }
}

/// Convenient Result type using MdmvizError
pub type Result<T> = std::result::Result<T, MdmvizError>;
