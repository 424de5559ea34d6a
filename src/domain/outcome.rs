use reqwest::StatusCode;
use std::io;
use thiserror::Error;

/// Failure below HTTP semantics. Always recovered by reconnecting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFault {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportFault {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportFault::Timeout;
        }
        if err.is_connect() {
            return TransportFault::Connect(err.to_string());
        }
        if err.is_body() || err.is_decode() {
            return TransportFault::Body(err.to_string());
        }
        match io_error_kind(err) {
            Some(
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof,
            ) => TransportFault::ConnectionClosed(err.to_string()),
            Some(io::ErrorKind::TimedOut) => TransportFault::Timeout,
            _ => TransportFault::Request(err.to_string()),
        }
    }

    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            TransportFault::Connect(_) => "connect",
            TransportFault::Timeout => "timeout",
            TransportFault::ConnectionClosed(_) => "closed",
            TransportFault::Body(_) => "body",
            TransportFault::Request(_) => "request",
        }
    }
}

fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = e.source();
    }
    None
}

/// Result of a single request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Status in [200, 300)
    Success(StatusCode),
    /// The server answered, but not with a 2xx
    HttpFailure(StatusCode),
    TransportFault(TransportFault),
}

impl Outcome {
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            Outcome::Success(status)
        } else {
            Outcome::HttpFailure(status)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Outcome::TransportFault(_))
    }
}

impl From<TransportFault> for Outcome {
    fn from(fault: TransportFault) -> Self {
        Outcome::TransportFault(fault)
    }
}
