// src/types.rs
use crate::cert_parser::Certificate;
use crate::error::ProbeError;
use std::fmt;

/// Ordered certificates, leaf first, trust anchor last
pub type CertificateChain = Vec<Certificate>;

/// Signature algorithms recognised by the policy layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Md2WithRsa,
    Md5WithRsa,
    Sha1WithRsa,
    Sha256WithRsa,
    Sha384WithRsa,
    Sha512WithRsa,
    RsaPss,
    DsaWithSha1,
    DsaWithSha256,
    EcdsaWithSha1,
    EcdsaWithSha256,
    EcdsaWithSha384,
    EcdsaWithSha512,
    Ed25519,
    Other(String),
}

impl SignatureAlgorithm {
    /// Map a dotted signature algorithm OID to a known algorithm
    pub fn from_oid(oid: &str) -> Self {
        match oid {
            "1.2.840.113549.1.1.2" => Self::Md2WithRsa,
            "1.2.840.113549.1.1.4" => Self::Md5WithRsa,
            // 1.3.14.3.2.29 is the old OIW alias for sha1WithRSA
            "1.2.840.113549.1.1.5" | "1.3.14.3.2.29" => Self::Sha1WithRsa,
            "1.2.840.113549.1.1.11" => Self::Sha256WithRsa,
            "1.2.840.113549.1.1.12" => Self::Sha384WithRsa,
            "1.2.840.113549.1.1.13" => Self::Sha512WithRsa,
            "1.2.840.113549.1.1.10" => Self::RsaPss,
            "1.2.840.10040.4.3" => Self::DsaWithSha1,
            "2.16.840.1.101.3.4.3.2" => Self::DsaWithSha256,
            "1.2.840.10045.4.1" => Self::EcdsaWithSha1,
            "1.2.840.10045.4.3.2" => Self::EcdsaWithSha256,
            "1.2.840.10045.4.3.3" => Self::EcdsaWithSha384,
            "1.2.840.10045.4.3.4" => Self::EcdsaWithSha512,
            "1.3.101.112" => Self::Ed25519,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md2WithRsa => "MD2-RSA",
            Self::Md5WithRsa => "MD5-RSA",
            Self::Sha1WithRsa => "SHA1-RSA",
            Self::Sha256WithRsa => "SHA256-RSA",
            Self::Sha384WithRsa => "SHA384-RSA",
            Self::Sha512WithRsa => "SHA512-RSA",
            Self::RsaPss => "RSA-PSS",
            Self::DsaWithSha1 => "DSA-SHA1",
            Self::DsaWithSha256 => "DSA-SHA256",
            Self::EcdsaWithSha1 => "ECDSA-SHA1",
            Self::EcdsaWithSha256 => "ECDSA-SHA256",
            Self::EcdsaWithSha384 => "ECDSA-SHA384",
            Self::EcdsaWithSha512 => "ECDSA-SHA512",
            Self::Ed25519 => "Ed25519",
            Self::Other(oid) => return write!(f, "unknown ({})", oid),
        };
        f.write_str(name)
    }
}

/// A single policy observation about one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Expires within 48 hours
    ExpiringShortly { hours: i64 },
    /// Expires inside the warning window, more than 48 hours out
    ExpiringSoon { days: i64 },
    /// Still valid past the sunset date of its signature algorithm
    SunsetAlgorithm { algorithm: String },
}

impl Finding {
    pub fn is_expiry(&self) -> bool {
        matches!(self, Self::ExpiringShortly { .. } | Self::ExpiringSoon { .. })
    }
}

/// Findings for one unique certificate seen on a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertEvaluation {
    pub common_name: String,

    /// Upper-case hex serial number
    pub serial: String,

    /// Expiry finding first, then sunset finding; empty when healthy
    pub findings: Vec<Finding>,
}

/// Terminal outcome of scanning one host
#[derive(Debug)]
pub struct HostResult {
    pub host: String,

    /// Either a connection error or the evaluations of every unique
    /// certificate across the host's verified chains
    pub outcome: Result<Vec<CertEvaluation>, ProbeError>,
}

impl HostResult {
    pub fn failed(host: impl Into<String>, error: ProbeError) -> Self {
        Self {
            host: host.into(),
            outcome: Err(error),
        }
    }

    pub fn evaluated(host: impl Into<String>, certs: Vec<CertEvaluation>) -> Self {
        Self {
            host: host.into(),
            outcome: Ok(certs),
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.outcome.as_ref().err()
    }

    /// Evaluations for a successful probe, empty for a failed one
    pub fn certs(&self) -> &[CertEvaluation] {
        match &self.outcome {
            Ok(certs) => certs,
            Err(_) => &[],
        }
    }

    pub fn finding_count(&self) -> usize {
        self.certs().iter().map(|c| c.findings.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_algorithm_from_oid() {
        assert_eq!(
            SignatureAlgorithm::from_oid("1.2.840.113549.1.1.5"),
            SignatureAlgorithm::Sha1WithRsa
        );
        assert_eq!(
            SignatureAlgorithm::from_oid("1.3.14.3.2.29"),
            SignatureAlgorithm::Sha1WithRsa
        );
        assert_eq!(
            SignatureAlgorithm::from_oid("1.2.840.10045.4.3.2"),
            SignatureAlgorithm::EcdsaWithSha256
        );
        assert_eq!(
            SignatureAlgorithm::from_oid("1.2.3.4"),
            SignatureAlgorithm::Other("1.2.3.4".to_string())
        );
    }

    #[test]
    fn test_failed_result_has_no_certs() {
        let result = HostResult::failed("example.com:443", ProbeError::NoCertificates);
        assert!(result.error().is_some());
        assert!(result.certs().is_empty());
        assert_eq!(result.finding_count(), 0);
    }

    #[test]
    fn test_evaluated_result_counts_findings() {
        let result = HostResult::evaluated(
            "example.com:443",
            vec![
                CertEvaluation {
                    common_name: "example.com".to_string(),
                    serial: "ABCDEF".to_string(),
                    findings: vec![
                        Finding::ExpiringSoon { days: 10 },
                        Finding::SunsetAlgorithm {
                            algorithm: "SHA1 with RSA".to_string(),
                        },
                    ],
                },
                CertEvaluation {
                    common_name: "Example CA".to_string(),
                    serial: "1".to_string(),
                    findings: vec![],
                },
            ],
        );

        assert!(result.error().is_none());
        assert_eq!(result.certs().len(), 2);
        assert_eq!(result.finding_count(), 2);
    }

    #[test]
    fn test_finding_is_expiry() {
        assert!(Finding::ExpiringShortly { hours: 3 }.is_expiry());
        assert!(Finding::ExpiringSoon { days: 3 }.is_expiry());
        assert!(!Finding::SunsetAlgorithm {
            algorithm: "MD5 with RSA".to_string()
        }
        .is_expiry());
    }
}
