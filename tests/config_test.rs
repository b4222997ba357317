// Test configuration loading
use cert_sentry::cli::Cli;
use cert_sentry::config::Config;
use cert_sentry::policy::WarnWindow;
use clap::Parser;
use std::path::Path;
use std::time::Duration;

#[test]
fn test_load_test_config() {
    let config_path = Path::new("tests/test_config.toml");
    let config = Config::from_file(config_path).expect("Failed to load test config");

    // Verify scan config
    assert_eq!(config.scan.connect_timeout_secs, 5);
    assert_eq!(config.scan.warn_years, 0);
    assert_eq!(config.scan.warn_months, 1);
    assert_eq!(config.scan.warn_days, 14);
    assert!(config.scan.check_signature_algorithm);
    assert_eq!(config.scan.concurrency, 16);

    // Verify logging config
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_cli_overrides_config_file() {
    let mut config = Config::load(Some(Path::new("tests/test_config.toml"))).unwrap();
    let cli = Cli::parse_from([
        "cert-sentry",
        "--config",
        "tests/test_config.toml",
        "-f",
        "hosts.txt",
        "-m",
        "0",
        "-d",
        "0",
        "-s",
        "false",
    ]);
    cli.validate().unwrap();
    cli.apply_overrides(&mut config.scan);

    let settings = config.scan.normalized().unwrap();

    // Zeroing the whole window falls back to 30 days
    assert_eq!(settings.window, WarnWindow::new(0, 0, 30));
    assert!(!settings.check_signature_algorithm);
    assert_eq!(settings.concurrency, 16);
    assert_eq!(settings.connect_timeout, Duration::from_secs(5));
}

#[test]
fn test_negative_concurrency_uses_default() {
    let mut config = Config::load(Some(Path::new("tests/test_config.toml"))).unwrap();
    let cli = Cli::parse_from(["cert-sentry", "-f", "hosts.txt", "-c", "-1"]);
    cli.apply_overrides(&mut config.scan);

    assert_eq!(config.scan.normalized().unwrap().concurrency, 42);
}
