// src/main.rs
use cert_sentry::cli::Cli;
use cert_sentry::config::Config;
use cert_sentry::hosts::HostSource;
use cert_sentry::output::{human, OutputManager};
use cert_sentry::policy::{PolicyEvaluator, SunsetTable};
use cert_sentry::prober::TlsProber;
use cert_sentry::progress::ScanProgress;
use cert_sentry::report::ResultAggregator;
use cert_sentry::scanner::Scanner;
use cert_sentry::stats::StatsCollector;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file, then apply CLI overrides
    let mut config = Config::load(cli.config.as_deref().map(Path::new))?;
    cli.apply_overrides(&mut config.scan);

    // Initialize logging; findings own stdout
    let log_level = cli.log_level().unwrap_or(&config.logging.level);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting cert-sentry...");

    // Pin the MD2/MD5 sunset to process start before any host is scanned
    let sunsets = SunsetTable::global();
    tracing::debug!("Loaded {} sunset signature algorithms", sunsets.len());

    let settings = config.scan.normalized()?;
    tracing::info!(
        "Warning window: {}y {}m {}d, signature algorithm check {}, {} workers, {:?} timeout",
        settings.window.years,
        settings.window.months,
        settings.window.days,
        if settings.check_signature_algorithm { "on" } else { "off" },
        settings.concurrency,
        settings.connect_timeout
    );

    // Host list: file first, then any --host arguments
    let hosts = match cli.hosts_file {
        Some(ref path) => HostSource::from_file(Path::new(path)).await?,
        None => HostSource::from_text(""),
    }
    .with_hosts(&cli.hosts);

    let prober = TlsProber::with_native_roots(settings.connect_timeout)?;
    tracing::info!("Trusting {} root certificates", prober.trust_store().len());

    let evaluator = PolicyEvaluator::with_table(
        settings.window,
        settings.check_signature_algorithm,
        sunsets,
    );
    let scanner = Scanner::new(Arc::new(prober), Arc::new(evaluator), settings.concurrency)?;

    // Create output manager
    let mut output_manager = OutputManager::new();
    if let Some(ref path) = cli.output {
        let file = std::fs::File::create(path)?;
        output_manager.add_handler(Arc::new(human::HumanOutput::to_file(file)));
        tracing::info!("Writing findings to: {}", path);
    } else {
        output_manager.add_handler(Arc::new(human::HumanOutput::new()));
    }

    let stats = StatsCollector::new();
    let show_progress = cli.should_show_progress();
    let total_hosts = show_progress.then(|| hosts.remaining() as u64);
    let progress = ScanProgress::new(show_progress, total_hosts);
    let aggregator = ResultAggregator::new(output_manager, stats, progress);

    let pipeline = scanner.start(hosts);

    // Ctrl-C stops handing out hosts; in-flight probes still finish
    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, waiting for in-flight hosts...");
            cancel.cancel();
        }
    });

    let snapshot = aggregator.drain(pipeline).await?;

    if cli.stats {
        println!("\nFinal Statistics:");
        println!("  Hosts scanned: {}", snapshot.hosts_scanned);
        println!("  Connection errors: {}", snapshot.connection_errors);
        println!("  Certificates checked: {}", snapshot.certificates_checked);
        println!("  Findings: {}", snapshot.findings);
        println!("  Rate: {:.1} hosts/min", snapshot.hosts_per_minute);
        println!("  Elapsed: {}", StatsCollector::format_elapsed(snapshot.elapsed_secs));
    }

    Ok(())
}
