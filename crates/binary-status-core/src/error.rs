//! Error types for binary support verification
//!
//! Distinguishes fatal lookups (`NotFound`, `Ambiguous`) from failures the
//! polling loop is allowed to retry (`Transient`, `Rejected`,
//! `AggregateFailure`).

use thiserror::Error;

/// Main error type for locator, probe, mutator and reconciler operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A named remote resource (gateway, path resource, integration, function) is absent
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// More than one gateway carries the requested name
    #[error("{count} REST APIs are named {name:?}; refusing to guess")]
    Ambiguous { name: String, count: usize },

    /// Network or API failure on a read or write
    #[error("Transient remote failure: {0}")]
    Transient(String),

    /// The remote side refused the request and retrying it unchanged will not help
    #[error("Remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// All probe calls succeeded but the combined verdict is false
    #[error(
        "Binary support not active for {function}: failing checks [{}]",
        failed_checks.join(", ")
    )]
    AggregateFailure {
        function: String,
        failed_checks: Vec<String>,
    },

    /// Malformed deploy context or tool configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Error::Transient(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Errors that end a function's reconciliation immediately instead of
    /// consuming another polling attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::Ambiguous { .. } | Error::Configuration(_)
        )
    }

    /// Errors a caller may reasonably retry unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::AggregateFailure { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Configuration(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(format!("TOML error: {}", err))
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
