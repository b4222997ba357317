// src/progress.rs
//! Scan progress on stderr
//!
//! With a known host count the bar shows position, rate and ETA; otherwise a
//! spinner counts finished hosts. The message carries the running totals.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} hosts ({per_sec}, eta {eta}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} hosts {msg}";

pub struct ScanProgress {
    bar: Option<ProgressBar>,
}

impl ScanProgress {
    /// `total_hosts` switches from a spinner to a bounded bar
    pub fn new(enabled: bool, total_hosts: Option<u64>) -> Self {
        if !enabled {
            return Self { bar: None };
        }

        let (bar, template) = match total_hosts {
            Some(total) => (ProgressBar::new(total), BAR_TEMPLATE),
            None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar: Some(bar) }
    }

    /// Count one finished host and show the latest totals
    pub fn host_done(&self, summary: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(summary.into());
        }
    }

    /// Run `f` with the bar hidden so it can write to the terminal
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    pub fn position(&self) -> u64 {
        self.bar.as_ref().map_or(0, |bar| bar.position())
    }

    pub fn total(&self) -> Option<u64> {
        self.bar.as_ref().and_then(|bar| bar.length())
    }
}

impl Drop for ScanProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
    }
}
