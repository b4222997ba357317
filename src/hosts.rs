// src/hosts.rs
//! Host list input

use anyhow::Context;
use std::path::Path;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::scanner::cancelled;

/// Lazy, one-shot sequence of hosts from a line-oriented list
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct HostSource {
    text: String,
    pos: usize,
}

impl HostSource {
    /// Wrap a host list that is already in memory
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: 0,
        }
    }

    /// Build a source from individual host arguments
    pub fn from_hosts<S: AsRef<str>>(hosts: &[S]) -> Self {
        let text = hosts
            .iter()
            .map(|h| h.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_text(text)
    }

    /// Queue extra hosts after the ones already in this source
    pub fn with_hosts<S: AsRef<str>>(mut self, hosts: &[S]) -> Self {
        for host in hosts {
            self.text.push('\n');
            self.text.push_str(host.as_ref());
        }
        self
    }

    /// Hosts still to come, without consuming them
    pub fn remaining(&self) -> usize {
        self.clone().count()
    }

    /// Read a host list file; an unreadable file is an error, not an empty list
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read host list {}", path.display()))?;
        Ok(Self::from_text(text))
    }

    /// Push hosts into the intake until exhausted, the intake closes, or the
    /// scan is cancelled
    pub async fn feed(self, intake: mpsc::Sender<String>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut queued = 0usize;

        for host in self {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown_rx) => {
                    debug!("Host producer cancelled after {} hosts", queued);
                    return;
                }
                sent = intake.send(host) => {
                    if sent.is_err() {
                        debug!("Intake closed, host producer stopping");
                        return;
                    }
                    queued += 1;
                }
            }
        }

        debug!("Host list exhausted after {} hosts", queued);
    }
}

impl Iterator for HostSource {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let (line, consumed) = match rest.find('\n') {
                Some(end) => (&rest[..end], end + 1),
                None => (rest, rest.len()),
            };
            self.pos += consumed;

            let host = line.trim();
            if host.is_empty() || host.starts_with('#') {
                continue;
            }
            return Some(host.to_string());
        }
        None
    }
}
