//! Error hierarchy for the registry-backed DNS cache.
//!
//! Errors are grouped by operational concern: registry I/O, payload
//! decoding, resolver-file handling and configuration. Registry I/O errors
//! are transient (the enclosing reload or reconciliation pass is abandoned
//! and retried on the next notification); decode errors are localized to a
//! single entry; startup errors are fatal to `start`.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registry I/O failures (connection, timeout, missing node)
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed per-node configuration payloads
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Upstream resolver list failures (file I/O, change notification)
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Settings validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring the service to stay down
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Node absent at the requested path
    #[error("Registry node not found: {0}")]
    NotFound(String),

    /// Create raced with a concurrent create of the same node
    #[error("Registry node already exists: {0}")]
    NodeExists(String),

    /// Transport-level failures against the coordination service
    #[error("Registry connection failed: {0}")]
    Connection(String),

    /// Watcher subscription failures
    #[error("Child watcher failed: {0}")]
    Watcher(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// One node's payload under `domain` did not parse as a configuration record
    #[error("Malformed payload under {domain}: {source}")]
    Payload {
        domain: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Nameserver file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}
