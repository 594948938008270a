//! Toggle Cache Error Hierarchy
//!
//! Errors are split by where they surface: configuration problems are caught
//! before any I/O, fetch failures come out of a [`Fetcher`](crate::Fetcher)
//! and are either returned from `initialise` or published on the error
//! conduit by the scheduler.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Snapshot retrieval failures (transport, status, decoding, parsing)
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Socket, DNS, TLS or timeout failure talking to a store endpoint
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Store answered with an unexpected HTTP status
    #[error("Endpoint {endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },

    /// Listing body is not a valid directory document
    #[error("Failed to decode listing: {0}")]
    Decode(#[from] serde_json::Error),

    /// The application namespace does not exist in the store
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The application namespace exists but is a plain key
    #[error("Namespace is not a directory: {0}")]
    NotADirectory(String),

    /// A toggle value other than the literals `true` or `false`
    #[error("Toggle {name} has invalid value {value:?}, expected \"true\" or \"false\"")]
    InvalidToggleValue { name: String, value: String },

    /// No endpoint configured to fetch from
    #[error("Endpoint list is empty")]
    EmptyEndpointList,

    /// Malformed endpoint address
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
