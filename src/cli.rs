// src/cli.rs
use clap::Parser;

use crate::config::ScanConfig;

/// cert-sentry: TLS certificate hygiene checker
///
/// Connects to every host in a list, verifies its certificate chains and
/// reports certificates that expire soon or rely on a sunset signature
/// algorithm.
#[derive(Parser, Debug, Clone)]
#[command(name = "cert-sentry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// File containing hosts to check, one host:port per line
    #[arg(short = 'f', long = "hosts-file")]
    pub hosts_file: Option<String>,

    /// Host to check (host:port); may be repeated
    #[arg(long = "host")]
    pub hosts: Vec<String>,

    /// Path to TOML config file
    #[arg(long = "config")]
    pub config: Option<String>,

    // ===== Scan Settings =====
    /// Dial connect timeout in seconds
    #[arg(short = 't', long = "timeout", allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Warn if a certificate expires within this many years
    #[arg(short = 'y', long = "years", allow_negative_numbers = true)]
    pub years: Option<i64>,

    /// Warn if a certificate expires within this many months
    #[arg(short = 'm', long = "months", allow_negative_numbers = true)]
    pub months: Option<i64>,

    /// Warn if a certificate expires within this many days
    #[arg(short = 'd', long = "days", allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Verify that non-root certificates use a good signature algorithm
    #[arg(short = 's', long = "check-sig-alg", value_name = "BOOL")]
    pub check_sig_alg: Option<bool>,

    /// Maximum number of hosts to check at once
    #[arg(short = 'c', long = "concurrency", allow_negative_numbers = true)]
    pub concurrency: Option<i64>,

    // ===== Output =====
    /// Write findings to a file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Print a summary when the scan finishes
    #[arg(long = "stats")]
    pub stats: bool,

    /// Disable progress indicator
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.hosts_file.is_none() && self.hosts.is_empty() {
            anyhow::bail!("No hosts to check. Use --hosts-file <FILE> or --host <HOST:PORT>");
        }

        if self.concurrency == Some(0) {
            anyhow::bail!("--concurrency must not be 0");
        }

        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        Ok(())
    }

    /// Override config file values with any flags given on the command line
    pub fn apply_overrides(&self, scan: &mut ScanConfig) {
        if let Some(timeout) = self.timeout {
            scan.connect_timeout_secs = timeout;
        }
        if let Some(years) = self.years {
            scan.warn_years = years;
        }
        if let Some(months) = self.months {
            scan.warn_months = months;
        }
        if let Some(days) = self.days {
            scan.warn_days = days;
        }
        if let Some(check) = self.check_sig_alg {
            scan.check_signature_algorithm = check;
        }
        if let Some(concurrency) = self.concurrency {
            scan.concurrency = concurrency;
        }
    }

    /// Spinner is drawn on stderr, so only when stderr is a terminal
    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.quiet && is_terminal::is_terminal(std::io::stderr())
    }

    /// Log level from verbose/quiet flags, if either is set
    pub fn log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}
