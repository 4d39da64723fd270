//! Errors raised while managing the engine lifecycle.
//!
//! Every variant ends up as the message of a single `error` event; the
//! gateway never retries.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// uv could not be found or the shared virtualenv could not be created
    #[error("Package host unavailable: {0}")]
    HostUnavailable(String),

    /// The batched package install failed
    #[error("Install failed: {0}")]
    Install(String),

    /// Install succeeded but the engine reports a different version
    #[error("Installed {package} {found}, expected {expected}")]
    VersionMismatch {
        package: String,
        expected: String,
        found: String,
    },

    /// A version/metadata query against the runtime failed
    #[error("Version query failed: {0}")]
    Query(String),

    /// The engine's programmatic entry point could not be imported
    #[error("Engine import failed: {0}")]
    Import(String),

    /// The engine raised instead of returning (stdout, stderr, status)
    #[error("Engine invocation failed: {0}")]
    Invocation(String),

    #[error("Engine not initialized; send 'init' first")]
    NotInitialized,

    #[error("Invalid filename '{0}': expected a single relative path segment")]
    InvalidFilename(String),

    #[error("Invalid cache directory '{0}': expected a relative path inside the staging area")]
    InvalidCacheDir(String),

    #[error("Failed to stage {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
