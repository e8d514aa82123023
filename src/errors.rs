//! Error hierarchy for the Consul recipes.
//!
//! Failures are categorized by how the recipes react to them: transport and
//! protocol errors are retried with backoff, decode errors are surfaced to the
//! caller's failure callback without stopping a watch, and session state errors
//! are returned synchronously.

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network-level failure reaching the Consul agent. Never fatal, always
    /// retried with backoff.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The agent answered, but not the way the protocol promises. Retried the
    /// same way as transport failures, logged distinctly.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A payload did not match the expected shape.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Session lifecycle violations.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Construction-time configuration failures. These fail fast at build
    /// time, never at first use.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP client failure (connect, timeout, broken connection)
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// Malformed agent address or endpoint path
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A 2xx blocking-query response without a usable `X-Consul-Index` header.
    /// The body cannot be trusted in that case.
    #[error("No X-Consul-Index header in response for {endpoint} endpoint")]
    MissingIndexHeader { endpoint: String },

    /// Non-2xx HTTP response
    #[error("Unexpected HTTP status [{status}]. Body: [{body}]")]
    UnexpectedStatus { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    /// A property the Consul API used to return is gone. This may indicate
    /// incompatible changes in the Consul API.
    #[error("{property} property is missing in JSON response")]
    MissingProperty { property: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `current_id()` was called before the first successful session creation
    #[error("Session not yet obtained")]
    Uninitialized,
}
