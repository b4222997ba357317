// src/scanner.rs
//! Bounded worker pool that scans hosts concurrently
//!
//! One producer feeds hosts into a shared intake, a fixed number of workers
//! probe and evaluate them, and a supervisor closes the results channel once
//! every worker has exited. A single watch channel carries cancellation to
//! all of them; it fires when the [`ScanPipeline`] is aborted or dropped.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::ScanError;
use crate::hosts::HostSource;
use crate::policy::PolicyEvaluator;
use crate::prober::{scan_host, Prober};
use crate::types::HostResult;

/// Default number of hosts scanned at once
pub const DEFAULT_CONCURRENCY: usize = 42;

/// Resolves once the cancellation signal is set or its sender is gone
pub(crate) async fn cancelled(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Handle that can cancel a running scan from another task
#[derive(Clone)]
pub struct CancelHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

/// Dispatcher owning the prober, evaluator and worker count
pub struct Scanner {
    prober: Arc<dyn Prober>,
    evaluator: Arc<PolicyEvaluator>,
    concurrency: usize,
}

impl Scanner {
    /// Create a scanner; zero workers is rejected
    pub fn new(
        prober: Arc<dyn Prober>,
        evaluator: Arc<PolicyEvaluator>,
        concurrency: usize,
    ) -> Result<Self, ScanError> {
        if concurrency == 0 {
            return Err(ScanError::ZeroConcurrency);
        }

        Ok(Self {
            prober,
            evaluator,
            concurrency,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Spawn the producer, the workers and the supervisor
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, hosts: HostSource) -> ScanPipeline {
        let (intake_tx, intake_rx) = mpsc::channel::<String>(1);
        let (results_tx, results_rx) = mpsc::channel::<HostResult>(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let producer = tokio::spawn(hosts.feed(intake_tx, shutdown_rx.clone()));

        let intake = Arc::new(Mutex::new(intake_rx));
        let workers: Vec<JoinHandle<()>> = (0..self.concurrency)
            .map(|id| {
                let worker = Worker {
                    id,
                    intake: Arc::clone(&intake),
                    results_tx: results_tx.clone(),
                    prober: Arc::clone(&self.prober),
                    evaluator: Arc::clone(&self.evaluator),
                    shutdown_rx: shutdown_rx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(intake);

        info!("Spawned {} scan workers", workers.len());

        let supervisor = tokio::spawn(async move {
            for outcome in join_all(workers).await {
                if let Err(e) = outcome {
                    error!("Scan worker failed: {}", e);
                }
            }
            // Every worker has exited, so nothing can be lost by closing now
            drop(results_tx);
            debug!("All scan workers stopped, results channel closed");

            if let Err(e) = producer.await {
                error!("Host producer failed: {}", e);
            }
        });

        ScanPipeline {
            results_rx,
            cancel: CancelHandle {
                shutdown_tx: Arc::new(shutdown_tx),
            },
            supervisor: Some(supervisor),
        }
    }
}

struct Worker {
    id: usize,
    intake: Arc<Mutex<mpsc::Receiver<String>>>,
    results_tx: mpsc::Sender<HostResult>,
    prober: Arc<dyn Prober>,
    evaluator: Arc<PolicyEvaluator>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        debug!("Worker {} started", self.id);

        loop {
            let host = tokio::select! {
                biased;
                _ = cancelled(&mut self.shutdown_rx) => break,
                host = next_host(&self.intake) => match host {
                    Some(host) => host,
                    None => break,
                },
            };

            let result = scan_host(self.prober.as_ref(), &self.evaluator, &host).await;

            tokio::select! {
                biased;
                _ = cancelled(&mut self.shutdown_rx) => break,
                sent = self.results_tx.send(result) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Worker {} stopped", self.id);
    }
}

async fn next_host(intake: &Mutex<mpsc::Receiver<String>>) -> Option<String> {
    intake.lock().await.recv().await
}

/// A running scan; dropping it cancels whatever is still in flight
pub struct ScanPipeline {
    results_rx: mpsc::Receiver<HostResult>,
    cancel: CancelHandle,
    supervisor: Option<JoinHandle<()>>,
}

impl ScanPipeline {
    /// Next host result, or `None` once every worker has finished
    pub async fn next_result(&mut self) -> Option<HostResult> {
        self.results_rx.recv().await
    }

    /// Stop the scan early; hosts already being probed still complete
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the supervisor after the results have been drained
    pub async fn finish(mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            if let Err(e) = supervisor.await {
                error!("Scan supervisor failed: {}", e);
            }
        }
    }
}

impl Drop for ScanPipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
