//! Request-level and transport-level error types.

use serde::Serialize;
use thiserror::Error;

/// Request-level probe error.
///
/// Only these abort a request. Per-endpoint failures never surface here; they are
/// folded into the per-endpoint outcome instead.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ProbeError {
    /// Malformed input, rejected before any network I/O.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The target's nameservers or addresses could not be found.
    #[error("Resolution error: {0}")]
    ResolutionError(String),

    /// A request-level network failure (e.g. the target is unreachable).
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Probe Result type alias.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Failure of a single DNS exchange, decided from the response code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("Domain not found (NXDOMAIN)")]
    DomainNotFound,

    #[error("No records of the requested type (NODATA)")]
    NoData,

    #[error("Query timed out")]
    Timeout,

    #[error("Server failure (SERVFAIL)")]
    ServerFailure,

    #[error("Query refused (REFUSED)")]
    QueryRefused,

    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DnsError {
    /// `NXDOMAIN` and `NODATA` both mean "nothing is published here".
    pub fn is_negative_answer(&self) -> bool {
        matches!(self, Self::DomainNotFound | Self::NoData)
    }
}

impl From<std::io::Error> for DnsError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout
        } else {
            Self::Io(e.to_string())
        }
    }
}

/// Failure of a single TLS connection attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlsProbeError {
    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Connection refused")]
    ConnectionRefused,

    #[error("Connection timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("TLS handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("TLS configuration error: {0}")]
    Configuration(String),
}

/// Typed failure of one runner operation.
///
/// The runner turns these into the matching [`ProbeOutcome`](crate::ProbeOutcome)
/// variant instead of propagating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Refused,
    Timeout,
    Network(String),
    /// The endpoint answered, but with a response that declines the query rather than
    /// answering it (e.g. a blacklist zone refusing public resolvers).
    Ambiguous(String),
}

impl From<DnsError> for ProbeFailure {
    fn from(e: DnsError) -> Self {
        match e {
            DnsError::QueryRefused => Self::Refused,
            DnsError::Timeout => Self::Timeout,
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<TlsProbeError> for ProbeFailure {
    fn from(e: TlsProbeError) -> Self {
        match e {
            TlsProbeError::ConnectionRefused => Self::Refused,
            TlsProbeError::Timeout => Self::Timeout,
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<ProbeError> for ProbeFailure {
    fn from(e: ProbeError) -> Self {
        Self::Network(e.to_string())
    }
}
