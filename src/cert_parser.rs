// src/cert_parser.rs
use crate::types::SignatureAlgorithm;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

/// Certificate fields the scanner needs for chain building and policy checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub common_name: String,

    /// Big-endian serial number bytes as encoded in the certificate
    pub serial: Vec<u8>,

    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub signature_algorithm: SignatureAlgorithm,

    /// Raw signature bytes; used as the per-host identity of a certificate
    pub signature: Vec<u8>,

    /// Raw DER of the subject and issuer names, compared byte-for-byte
    pub subject: Vec<u8>,
    pub issuer: Vec<u8>,

    /// Raw DER of the SubjectPublicKeyInfo
    pub public_key: Vec<u8>,

    /// SHA-256 over the full DER encoding
    pub fingerprint: String,

    /// Full DER encoding, re-parsed when checking signatures
    pub der: Vec<u8>,
}

impl Certificate {
    /// Serial number as upper-case hex without leading zeros
    pub fn serial_hex(&self) -> String {
        let encoded = hex::encode_upper(&self.serial);
        let trimmed = encoded.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Same subject and key; a re-issued certificate counts as the same CA
    pub fn same_identity(&self, other: &Certificate) -> bool {
        self.subject == other.subject && self.public_key == other.public_key
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Whether `issuer` names this certificate's issuer and its public key
    /// verifies this certificate's signature
    pub fn is_signed_by(&self, issuer: &Certificate) -> bool {
        if self.issuer != issuer.subject {
            return false;
        }

        let (Ok((_, child)), Ok((_, parent))) = (
            X509Certificate::from_der(&self.der),
            X509Certificate::from_der(&issuer.der),
        ) else {
            return false;
        };

        child.verify_signature(Some(parent.public_key())).is_ok()
    }
}

/// Certificate parser for DER certificates presented during a handshake
pub struct CertificateParser;

impl CertificateParser {
    /// Parse a DER-encoded X.509 certificate
    pub fn parse_der(der_bytes: &[u8]) -> Result<Certificate> {
        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(der_bytes);
            hex::encode(hasher.finalize())
        };

        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse X.509 certificate: {:?}", e))?;

        let not_before = Self::to_utc(cert.validity().not_before)?;
        let not_after = Self::to_utc(cert.validity().not_after)?;

        let signature_algorithm =
            SignatureAlgorithm::from_oid(&cert.signature_algorithm.algorithm.to_id_string());

        Ok(Certificate {
            common_name: Self::extract_cn(&cert).unwrap_or_default(),
            serial: cert.raw_serial().to_vec(),
            not_before,
            not_after,
            signature_algorithm,
            signature: cert.signature_value.data.to_vec(),
            subject: cert.subject().as_raw().to_vec(),
            issuer: cert.issuer().as_raw().to_vec(),
            public_key: cert.public_key().raw.to_vec(),
            fingerprint,
            der: der_bytes.to_vec(),
        })
    }

    fn to_utc(time: ASN1Time) -> Result<DateTime<Utc>> {
        let ts = time.timestamp();
        DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow::anyhow!("validity time out of range: {}", ts))
    }

    /// Extract Common Name (CN) from certificate subject
    fn extract_cn(cert: &X509Certificate) -> Option<String> {
        cert.subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(|cn| cn.to_string())
    }
}
