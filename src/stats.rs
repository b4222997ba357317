// src/stats.rs
//! Scan statistics for cert-sentry

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::types::HostResult;

/// Thread-safe statistics collector
#[derive(Clone)]
pub struct StatsCollector {
    hosts_scanned: Arc<AtomicU64>,
    connection_errors: Arc<AtomicU64>,
    certificates_checked: Arc<AtomicU64>,
    findings: Arc<AtomicU64>,
    start_time: Instant,
}

/// Snapshot of statistics at a point in time
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub hosts_scanned: u64,
    pub connection_errors: u64,
    pub certificates_checked: u64,
    pub findings: u64,
    pub hosts_per_minute: f64,
    pub elapsed_secs: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            hosts_scanned: Arc::new(AtomicU64::new(0)),
            connection_errors: Arc::new(AtomicU64::new(0)),
            certificates_checked: Arc::new(AtomicU64::new(0)),
            findings: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Count one finished host and everything found on it
    pub fn record(&self, result: &HostResult) {
        self.hosts_scanned.fetch_add(1, Ordering::Relaxed);

        if result.error().is_some() {
            self.connection_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.certificates_checked
            .fetch_add(result.certs().len() as u64, Ordering::Relaxed);
        self.findings
            .fetch_add(result.finding_count() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.start_time.elapsed();
        let hosts = self.hosts_scanned.load(Ordering::Relaxed);

        let rate = if elapsed.as_secs() > 0 {
            (hosts as f64 / elapsed.as_secs() as f64) * 60.0
        } else {
            0.0
        };

        StatsSnapshot {
            hosts_scanned: hosts,
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            certificates_checked: self.certificates_checked.load(Ordering::Relaxed),
            findings: self.findings.load(Ordering::Relaxed),
            hosts_per_minute: rate,
            elapsed_secs: elapsed.as_secs(),
        }
    }

    /// One-line progress summary
    pub fn format_stats(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "{} hosts | {} errors | {} certs | {} findings | {}",
            snapshot.hosts_scanned,
            snapshot.connection_errors,
            snapshot.certificates_checked,
            snapshot.findings,
            Self::format_elapsed(snapshot.elapsed_secs)
        )
    }

    pub fn format_elapsed(secs: u64) -> String {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
