// src/output/human.rs
//! Human-readable, log-style terminal output

use crate::output::{report_lines, LineKind, OutputHandler, ReportLine};
use crate::types::HostResult;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, Write};
use std::sync::Mutex;

/// Writes one timestamped line per finding or connection error
pub struct HumanOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    use_colors: bool,
}

impl HumanOutput {
    /// Create a new HumanOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
            use_colors: is_terminal::is_terminal(std::io::stdout()),
        }
    }

    /// Create a new HumanOutput that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self::to_writer(Box::new(file))
    }

    /// Plain output to any writer
    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            use_colors: false,
        }
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%Y/%m/%d %H:%M:%S").to_string()
    }

    fn paint(line: &ReportLine) -> String {
        match line.kind {
            LineKind::ConnectionError => line.text.red().to_string(),
            LineKind::ExpiringShortly => line.text.red().bold().to_string(),
            LineKind::ExpiringSoon => line.text.yellow().to_string(),
            LineKind::SunsetAlgorithm => line.text.magenta().to_string(),
        }
    }
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for HumanOutput {
    async fn emit_result(&self, result: &HostResult) -> anyhow::Result<()> {
        let lines = report_lines(result);
        if lines.is_empty() {
            return Ok(());
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer lock poisoned"))?;
        let timestamp = Self::timestamp();

        for line in &lines {
            if self.use_colors {
                writeln!(writer, "{} {}", timestamp.dimmed(), Self::paint(line))?;
            } else {
                writeln!(writer, "{} {}", timestamp, line.text)?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer lock poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}
