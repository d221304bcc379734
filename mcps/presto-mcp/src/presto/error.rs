//! Error types for the Presto client protocol
//!
//! These are driver-level failures. The executor wraps them into
//! connection or query errors depending on the phase they occur in.

use thiserror::Error;

/// Errors raised by a Presto driver
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (DNS, TCP, TLS handshake, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The coordinator answered with an unexpected HTTP status
    #[error("Presto returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The query failed on the server
    #[error("{error_name} ({error_type}): {message}")]
    Server {
        /// Presto error name, e.g. `SYNTAX_ERROR`
        error_name: String,
        /// Presto error type, e.g. `USER_ERROR`
        error_type: String,
        /// Human-readable failure message
        message: String,
    },

    /// Reading the certificate bundle failed
    #[error("failed to read certificate bundle {path}: {source}")]
    CertificateRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The certificate bundle holds no usable certificate
    #[error("invalid certificate bundle {path}: {reason}")]
    InvalidCertificate { path: String, reason: String },

    /// The server response violates the client protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A cursor or connection was used after being closed
    #[error("{0} is closed")]
    Closed(&'static str),
}

/// Result type alias for driver operations
pub type ClientResult<T> = Result<T, ClientError>;
