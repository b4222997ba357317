// src/lib.rs
// Library interface for cert-sentry
pub mod cert_parser;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod hosts;
pub mod output;
pub mod policy;
pub mod progress;
pub mod prober;
pub mod report;
pub mod scanner;
pub mod stats;
pub mod types;
