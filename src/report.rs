// src/report.rs
//! Single consumer of scan results

use tracing::{info, warn};

use crate::output::OutputManager;
use crate::progress::ScanProgress;
use crate::scanner::ScanPipeline;
use crate::stats::{StatsCollector, StatsSnapshot};
use crate::types::HostResult;

/// Drains a scan pipeline into the output handlers
pub struct ResultAggregator {
    output: OutputManager,
    stats: StatsCollector,
    progress: ScanProgress,
}

impl ResultAggregator {
    pub fn new(output: OutputManager, stats: StatsCollector, progress: ScanProgress) -> Self {
        Self {
            output,
            stats,
            progress,
        }
    }

    /// Consume results until every worker has finished
    pub async fn drain(&self, mut pipeline: ScanPipeline) -> anyhow::Result<StatsSnapshot> {
        while let Some(result) = pipeline.next_result().await {
            self.handle(&result).await;
        }
        pipeline.finish().await;

        self.progress.finish();
        self.output.flush().await?;

        let snapshot = self.stats.snapshot();
        info!(
            "Scan complete: {} hosts, {} connection errors, {} findings",
            snapshot.hosts_scanned, snapshot.connection_errors, snapshot.findings
        );
        Ok(snapshot)
    }

    async fn handle(&self, result: &HostResult) {
        self.stats.record(result);

        // Clear the spinner line before output is written
        self.progress.suspend(|| {});
        if let Err(e) = self.output.emit(result).await {
            warn!("Output error: {:?}", e);
        }

        self.progress.host_done(self.stats.format_stats());
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }
}
