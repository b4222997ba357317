// src/output/mod.rs
//! Output handling for scan results
//!
//! Every handler receives whole [`HostResult`]s; [`report_lines`] turns one
//! into the lines a user sees.

use crate::types::{Finding, HostResult};
use async_trait::async_trait;
use std::sync::Arc;

pub mod human;

/// Trait for output handlers that process scan results
#[async_trait]
pub trait OutputHandler: Send + Sync {
    /// Emit the outcome of scanning one host
    async fn emit_result(&self, result: &HostResult) -> anyhow::Result<()>;

    /// Flush any buffered output
    async fn flush(&self) -> anyhow::Result<()>;
}

/// What a report line is about; handlers use it for highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    ConnectionError,
    ExpiringShortly,
    ExpiringSoon,
    SunsetAlgorithm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub kind: LineKind,
    pub text: String,
}

/// Lines for one host: its connection error, or one line per finding
pub fn report_lines(result: &HostResult) -> Vec<ReportLine> {
    let host = &result.host;

    let certs = match &result.outcome {
        Err(e) => {
            return vec![ReportLine {
                kind: LineKind::ConnectionError,
                text: format!("{}: {}", host, e),
            }];
        }
        Ok(certs) => certs,
    };

    let mut lines = Vec::new();
    for cert in certs {
        for finding in &cert.findings {
            let (kind, text) = match finding {
                Finding::ExpiringShortly { hours } => (
                    LineKind::ExpiringShortly,
                    format!(
                        "{}: ** '{}' (S/N {}) expires in {} hours! **",
                        host, cert.common_name, cert.serial, hours
                    ),
                ),
                Finding::ExpiringSoon { days } => (
                    LineKind::ExpiringSoon,
                    format!(
                        "{}: '{}' (S/N {}) expires in roughly {} days.",
                        host, cert.common_name, cert.serial, days
                    ),
                ),
                Finding::SunsetAlgorithm { algorithm } => (
                    LineKind::SunsetAlgorithm,
                    format!(
                        "{}: '{}' (S/N {}) expires after the sunset date for its signature algorithm '{}'.",
                        host, cert.common_name, cert.serial, algorithm
                    ),
                ),
            };
            lines.push(ReportLine { kind, text });
        }
    }
    lines
}

/// Manager that dispatches output to multiple handlers
pub struct OutputManager {
    handlers: Vec<Arc<dyn OutputHandler>>,
}

impl OutputManager {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        self.handlers.push(handler);
    }

    /// Emit a result to all handlers
    ///
    /// Errors from individual handlers are logged; an error is returned only
    /// when the sole handler fails.
    pub async fn emit(&self, result: &HostResult) -> anyhow::Result<()> {
        let mut last_error = None;

        for handler in &self.handlers {
            if let Err(e) = handler.emit_result(result).await {
                tracing::warn!("Output handler error: {}", e);
                last_error = Some(e);
            }
        }

        if let Some(err) = last_error {
            if self.handlers.len() == 1 {
                return Err(err);
            }
        }

        Ok(())
    }

    pub async fn flush(&self) -> anyhow::Result<()> {
        for handler in &self.handlers {
            handler.flush().await?;
        }
        Ok(())
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new()
    }
}
