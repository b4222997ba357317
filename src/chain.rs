// src/chain.rs
//! Verified chain reconstruction
//!
//! rustls verifies the presented certificates during the handshake but only
//! hands back the certificates the server sent. The policy layer needs the
//! full path up to the trust anchor, so the paths are rebuilt here by
//! checking each child's signature against the presented intermediates and
//! the trust store. A host can yield several chains when more than one
//! anchor or cross-signed intermediate verifies.

use crate::cert_parser::{Certificate, CertificateParser};
use crate::types::CertificateChain;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Longest path the builder will follow before giving up on a branch
pub const MAX_CHAIN_DEPTH: usize = 10;

/// Trusted root certificates, kept parsed so chains can end on them
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    roots: Vec<Certificate>,
    fingerprints: HashSet<String>,
}

impl TrustStore {
    /// Build a store from DER certificates, skipping any that fail to parse
    pub fn from_der<'a>(certs: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut store = Self::default();
        for der in certs {
            match CertificateParser::parse_der(der) {
                Ok(cert) => store.add(cert),
                Err(e) => debug!("Skipping unparsable trust anchor: {}", e),
            }
        }
        store
    }

    pub fn add(&mut self, cert: Certificate) {
        if self.fingerprints.insert(cert.fingerprint.clone()) {
            self.roots.push(cert);
        }
    }

    pub fn contains(&self, cert: &Certificate) -> bool {
        self.fingerprints.contains(&cert.fingerprint)
    }

    pub fn roots(&self) -> &[Certificate] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Rebuild every verified chain for a presented certificate list (leaf first)
///
/// An issuer is accepted only when its key verifies the child's signature
/// and it is valid at `now`. A path is complete when it reaches a trust
/// store certificate. When no path completes, the longest verified issuer
/// path is returned as the only chain.
pub fn build_verified_chains(
    presented: &[Certificate],
    store: &TrustStore,
    now: DateTime<Utc>,
) -> Vec<CertificateChain> {
    let Some(leaf) = presented.first() else {
        return Vec::new();
    };

    let mut builder = ChainBuilder {
        intermediates: &presented[1..],
        store,
        now,
        chains: Vec::new(),
        longest: Vec::new(),
    };
    let mut path = vec![leaf];
    builder.walk(&mut path);

    if builder.chains.is_empty() {
        debug!(
            "No path from '{}' reaches a trust anchor, using {} certificate(s)",
            leaf.common_name,
            builder.longest.len()
        );
        let fallback = builder.longest.into_iter().cloned().collect();
        return vec![fallback];
    }
    builder.chains
}

struct ChainBuilder<'a> {
    intermediates: &'a [Certificate],
    store: &'a TrustStore,
    now: DateTime<Utc>,
    chains: Vec<CertificateChain>,
    longest: Vec<&'a Certificate>,
}

impl<'a> ChainBuilder<'a> {
    fn walk(&mut self, path: &mut Vec<&'a Certificate>) {
        if path.len() > self.longest.len() {
            self.longest = path.clone();
        }

        let current = path[path.len() - 1];
        if self.store.contains(current) {
            self.chains.push(path.iter().map(|c| (*c).clone()).collect());
            return;
        }
        if path.len() >= MAX_CHAIN_DEPTH {
            return;
        }

        for issuer in self.issuers_of(current, path) {
            path.push(issuer);
            self.walk(path);
            path.pop();
        }
    }

    /// Verified issuers whose identity is not already on the path,
    /// presented ones first
    fn issuers_of(&self, cert: &Certificate, path: &[&Certificate]) -> Vec<&'a Certificate> {
        let mut issuers: Vec<&'a Certificate> = Vec::new();
        for candidate in self.intermediates.iter().chain(self.store.roots()) {
            if path.iter().any(|c| c.same_identity(candidate))
                || issuers.iter().any(|c| c.fingerprint == candidate.fingerprint)
            {
                continue;
            }
            if !candidate.is_valid_at(self.now) {
                debug!("Skipping '{}': not valid at {}", candidate.common_name, self.now);
                continue;
            }
            if cert.is_signed_by(candidate) {
                issuers.push(candidate);
            }
        }
        issuers
    }
}
