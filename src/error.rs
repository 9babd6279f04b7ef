//! Error types for shc operations

use thiserror::Error;

/// Error type for shc operations
#[derive(Error, Debug)]
pub enum Error {
    /// The backend reported one or more compilation errors.
    ///
    /// Compilation failures are a deterministic function of the input; the
    /// call is never retried. The diagnostic text is the backend's output,
    /// passed through verbatim.
    #[error("Compilation failed: {diagnostics}")]
    Compilation {
        /// Diagnostic text from the backend compiler
        diagnostics: String,
    },

    /// The backend session could not be created or is unusable
    #[error("Backend session error: {0}")]
    Session(String),

    /// A compile request could not be created or configured
    #[error("Compile request error: {0}")]
    Request(String),

    /// A path or symbol contained an interior null byte
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for shc operations
pub type Result<T> = std::result::Result<T, Error>;
