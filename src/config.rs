// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::policy::WarnWindow;
use crate::scanner::DEFAULT_CONCURRENCY;

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: i64,
    #[serde(default)]
    pub warn_years: i64,
    #[serde(default)]
    pub warn_months: i64,
    #[serde(default = "default_warn_days")]
    pub warn_days: i64,
    #[serde(default = "default_check_signature_algorithm")]
    pub check_signature_algorithm: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: i64,
}

fn default_connect_timeout() -> i64 { 3 }
fn default_warn_days() -> i64 { 30 }
fn default_check_signature_algorithm() -> bool { true }
fn default_concurrency() -> i64 { DEFAULT_CONCURRENCY as i64 }

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            warn_years: 0,
            warn_months: 0,
            warn_days: default_warn_days(),
            check_signature_algorithm: default_check_signature_algorithm(),
            concurrency: default_concurrency(),
        }
    }
}

/// Scan settings after normalisation, ready for the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub connect_timeout: Duration,
    pub window: WarnWindow,
    pub check_signature_algorithm: bool,
    pub concurrency: usize,
}

impl ScanConfig {
    /// Apply the normalisation rules
    ///
    /// Negative warning values become 0 and an all-zero window becomes 30
    /// days. Negative concurrency falls back to the default; zero is
    /// rejected because no worker would ever run.
    pub fn normalized(&self) -> anyhow::Result<ScanSettings> {
        let clamp = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);

        let mut window = WarnWindow::new(
            clamp(self.warn_years),
            clamp(self.warn_months),
            clamp(self.warn_days),
        );
        if window.years == 0 && window.months == 0 && window.days == 0 {
            window.days = 30;
        }

        let concurrency = match self.concurrency {
            0 => anyhow::bail!("concurrency must be greater than 0"),
            c if c < 0 => DEFAULT_CONCURRENCY,
            c => usize::try_from(c)?,
        };

        let timeout_secs = if self.connect_timeout_secs > 0 {
            self.connect_timeout_secs as u64
        } else {
            default_connect_timeout() as u64
        };

        Ok(ScanSettings {
            connect_timeout: Duration::from_secs(timeout_secs),
            window,
            check_signature_algorithm: self.check_signature_algorithm,
            concurrency,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        Ok(cfg)
    }

    /// Load from a file when one is given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
