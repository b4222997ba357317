// src/prober.rs
//! TLS probing of a single host and per-host certificate evaluation

use async_trait::async_trait;
use chrono::Utc;
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::cert_parser::{Certificate, CertificateParser};
use crate::chain::{build_verified_chains, TrustStore};
use crate::error::ProbeError;
use crate::policy::PolicyEvaluator;
use crate::types::{CertEvaluation, CertificateChain, HostResult};

/// Source of verified certificate chains for a host
#[async_trait]
pub trait Prober: Send + Sync {
    /// Make one connection attempt and return every verified chain, leaf first
    async fn fetch_chains(&self, host: &str) -> Result<Vec<CertificateChain>, ProbeError>;
}

/// Probe one host and evaluate each unique certificate it presents
pub async fn scan_host(prober: &dyn Prober, evaluator: &PolicyEvaluator, host: &str) -> HostResult {
    match prober.fetch_chains(host).await {
        Ok(chains) => {
            let certs = evaluate_chains(evaluator, &chains, Utc::now());
            debug!("{}: evaluated {} certificates", host, certs.len());
            HostResult::evaluated(host, certs)
        }
        Err(e) => {
            debug!("{}: probe failed: {}", host, e);
            HostResult::failed(host, e)
        }
    }
}

/// Evaluate certificates across all chains, skipping repeated signatures
pub fn evaluate_chains(
    evaluator: &PolicyEvaluator,
    chains: &[CertificateChain],
    now: chrono::DateTime<Utc>,
) -> Vec<CertEvaluation> {
    let mut checked: HashSet<&[u8]> = HashSet::new();
    let mut evaluations = Vec::new();

    for chain in chains {
        for (position, cert) in chain.iter().enumerate() {
            if !checked.insert(cert.signature.as_slice()) {
                continue;
            }

            debug!(
                "Checking '{}' (S/N {}, sha256 {}) at position {}/{}",
                cert.common_name,
                cert.serial_hex(),
                cert.fingerprint,
                position,
                chain.len()
            );

            evaluations.push(CertEvaluation {
                common_name: cert.common_name.clone(),
                serial: cert.serial_hex(),
                findings: evaluator.evaluate(cert, position, chain.len(), now),
            });
        }
    }

    evaluations
}

/// Split `host:port` (or `[v6]:port`) into name and port
pub fn split_host_port(host: &str) -> Result<(String, u16), ProbeError> {
    let invalid = |reason: &str| ProbeError::InvalidAddress {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let (name, port) = if let Some(rest) = host.strip_prefix('[') {
        let (name, after) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing ']' in address"))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| invalid("missing port in address"))?;
        (name, port)
    } else {
        let (name, port) = host
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port in address"))?;
        if name.contains(':') {
            return Err(invalid("too many colons in address"));
        }
        (name, port)
    };

    if name.is_empty() {
        return Err(invalid("missing host in address"));
    }
    let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

    Ok((name.to_string(), port))
}

/// Prober performing a verifying TLS handshake against the system roots
///
/// Verification runs on the ring provider, which has no SHA-1 or MD5
/// signature support. A server whose chain is signed with one of those
/// fails the handshake and is reported as a `tls handshake` error rather
/// than a sunset finding.
pub struct TlsProber {
    connector: TlsConnector,
    trust_store: Arc<TrustStore>,
    connect_timeout: Duration,
}

impl TlsProber {
    /// Create a prober trusting the given DER root certificates
    pub fn new(roots: Vec<CertificateDer<'static>>, connect_timeout: Duration) -> anyhow::Result<Self> {
        // Only ring is compiled in, but be explicit in case another crate
        // pulls in a second provider
        let _ = rustls::crypto::ring::default_provider().install_default();

        let trust_store = TrustStore::from_der(roots.iter().map(|c| c.as_ref()));

        let mut root_store = RootCertStore::empty();
        let (added, ignored) = root_store.add_parsable_certificates(roots);
        if ignored > 0 {
            debug!("Ignored {} unusable root certificates", ignored);
        }
        if added == 0 {
            anyhow::bail!("No usable trusted root certificates found");
        }

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            trust_store: Arc::new(trust_store),
            connect_timeout,
        })
    }

    /// Create a prober trusting the operating system certificate store
    pub fn with_native_roots(connect_timeout: Duration) -> anyhow::Result<Self> {
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            warn!("Error loading system root certificates: {}", e);
        }
        debug!("Loaded {} system root certificates", native.certs.len());

        Self::new(native.certs, connect_timeout)
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    async fn handshake(&self, name: &str, port: u16) -> Result<TlsStream<TcpStream>, ProbeError> {
        let server_name = ServerName::try_from(name.to_string())
            .map_err(|_| ProbeError::InvalidServerName(name.to_string()))?;

        let stream = TcpStream::connect((name, port))
            .await
            .map_err(ProbeError::Connect)?;

        self.connector
            .connect(server_name, stream)
            .await
            .map_err(ProbeError::Handshake)
    }

    fn presented_certificates(stream: &TlsStream<TcpStream>) -> Result<Vec<Certificate>, ProbeError> {
        let (_, connection) = stream.get_ref();
        let presented = connection.peer_certificates().unwrap_or_default();
        parse_presented(presented)
    }
}

/// Parse the certificates a server sent, leaf first
///
/// Only the leaf has to parse. Extra certificates that cannot be read are
/// dropped, since they can never be linked into a chain.
fn parse_presented(presented: &[CertificateDer<'_>]) -> Result<Vec<Certificate>, ProbeError> {
    let (leaf, extra) = presented.split_first().ok_or(ProbeError::NoCertificates)?;

    let mut certs = vec![
        CertificateParser::parse_der(leaf.as_ref()).map_err(|e| ProbeError::Parse(e.to_string()))?,
    ];
    for der in extra {
        match CertificateParser::parse_der(der.as_ref()) {
            Ok(cert) => certs.push(cert),
            Err(e) => debug!("Ignoring unparsable presented certificate: {}", e),
        }
    }
    Ok(certs)
}

/// Send close_notify, giving up after `limit`
async fn close_within<S: AsyncWrite + Unpin>(stream: &mut S, limit: Duration) {
    match tokio::time::timeout(limit, stream.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("close_notify failed: {}", e),
        Err(_) => debug!("close_notify timed out after {:?}", limit),
    }
}

#[async_trait]
impl Prober for TlsProber {
    async fn fetch_chains(&self, host: &str) -> Result<Vec<CertificateChain>, ProbeError> {
        let (name, port) = split_host_port(host)?;

        let mut stream = tokio::time::timeout(self.connect_timeout, self.handshake(&name, port))
            .await
            .map_err(|_| ProbeError::Timeout(self.connect_timeout))??;

        let presented = Self::presented_certificates(&stream);

        close_within(&mut stream, self.connect_timeout).await;
        drop(stream);

        let chains = build_verified_chains(&presented?, &self.trust_store, Utc::now());
        debug!("{}: {} verified chain(s)", host, chains.len());
        Ok(chains)
    }
}
