// src/error.rs
//! Error types for cert-sentry
//!
//! Connection-level failures are recovered per host and carried as data in
//! [`crate::types::HostResult`]; only dispatcher misuse is a hard error.

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain verified certificate chains from one host
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid address {host:?}: {reason}")]
    InvalidAddress { host: String, reason: String },

    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    #[error("i/o timeout after {0:?}")]
    Timeout(Duration),

    #[error("dial tcp: {0}")]
    Connect(#[source] std::io::Error),

    #[error("tls handshake: {0}")]
    Handshake(#[source] std::io::Error),

    #[error("server presented no certificates")]
    NoCertificates,

    #[error("certificate parse error: {0}")]
    Parse(String),
}

/// Errors raised when a scan pipeline cannot be built
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScanError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}
