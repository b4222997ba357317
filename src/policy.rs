// src/policy.rs
//! Certificate policy checks: impending expiry and sunset signature algorithms

use crate::cert_parser::Certificate;
use crate::types::{Finding, SignatureAlgorithm};
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Certificates expiring within this many hours are reported in hours
pub const EXPIRING_SHORTLY_HOURS: i64 = 48;

lazy_static! {
    /// Process-wide sunset table; MD2/MD5 sunset at the moment it is first built
    static ref SUNSET_TABLE: SunsetTable = SunsetTable::standard(Utc::now());
}

/// Display name and sunset date for a deprecated signature algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SunsetPolicy {
    pub name: &'static str,
    pub sunsets_at: DateTime<Utc>,
}

/// Read-only map from signature algorithm to its sunset policy
#[derive(Debug, Clone)]
pub struct SunsetTable {
    entries: HashMap<SignatureAlgorithm, SunsetPolicy>,
}

impl SunsetTable {
    /// The shared table, built on first use
    pub fn global() -> &'static SunsetTable {
        &SUNSET_TABLE
    }

    /// Standard table; `process_start` is the sunset of MD2 and MD5
    pub fn standard(process_start: DateTime<Utc>) -> Self {
        // A fixed, valid UTC date always maps to a single instant
        let sha1_sunset = Utc
            .with_ymd_and_hms(2017, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();

        let entries = HashMap::from([
            (
                SignatureAlgorithm::Md2WithRsa,
                SunsetPolicy { name: "MD2 with RSA", sunsets_at: process_start },
            ),
            (
                SignatureAlgorithm::Md5WithRsa,
                SunsetPolicy { name: "MD5 with RSA", sunsets_at: process_start },
            ),
            (
                SignatureAlgorithm::Sha1WithRsa,
                SunsetPolicy { name: "SHA1 with RSA", sunsets_at: sha1_sunset },
            ),
            (
                SignatureAlgorithm::DsaWithSha1,
                SunsetPolicy { name: "DSA with SHA1", sunsets_at: sha1_sunset },
            ),
            (
                SignatureAlgorithm::EcdsaWithSha1,
                SunsetPolicy { name: "ECDSA with SHA1", sunsets_at: sha1_sunset },
            ),
        ]);

        Self { entries }
    }

    pub fn get(&self, algorithm: &SignatureAlgorithm) -> Option<&SunsetPolicy> {
        self.entries.get(algorithm)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How far ahead of expiry to start warning, in calendar units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarnWindow {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl WarnWindow {
    pub fn new(years: u32, months: u32, days: u32) -> Self {
        Self { years, months, days }
    }

    /// `now` plus the window
    ///
    /// Years, months and days are added to the date fields together and any
    /// overflow rolls forward: Jan 31 plus one month is Mar 3 (or Mar 2 in a
    /// leap year), not the end of February. The time of day is kept.
    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let date = now.date_naive();
        let month_index = i64::from(date.year()) * 12
            + i64::from(date.month0())
            + i64::from(self.years) * 12
            + i64::from(self.months);

        i32::try_from(month_index.div_euclid(12))
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, month_index.rem_euclid(12) as u32 + 1, 1))
            .and_then(|first| first.checked_add_days(Days::new(u64::from(date.day0()) + u64::from(self.days))))
            .map(|day| day.and_time(now.time()).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for WarnWindow {
    fn default() -> Self {
        Self::new(0, 0, 30)
    }
}

/// Decides which findings apply to a certificate at a given chain position
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    window: WarnWindow,
    check_signature_algorithm: bool,
    sunsets: &'static SunsetTable,
}

impl PolicyEvaluator {
    pub fn new(window: WarnWindow, check_signature_algorithm: bool) -> Self {
        Self::with_table(window, check_signature_algorithm, SunsetTable::global())
    }

    pub fn with_table(
        window: WarnWindow,
        check_signature_algorithm: bool,
        sunsets: &'static SunsetTable,
    ) -> Self {
        Self {
            window,
            check_signature_algorithm,
            sunsets,
        }
    }

    pub fn window(&self) -> WarnWindow {
        self.window
    }

    /// Evaluate one certificate found at `position` in a chain of `chain_len`
    ///
    /// Returns at most one expiry finding followed by at most one sunset
    /// finding.
    pub fn evaluate(
        &self,
        cert: &Certificate,
        position: usize,
        chain_len: usize,
        now: DateTime<Utc>,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        if let Some(finding) = self.check_expiry(cert, now) {
            findings.push(finding);
        }
        if let Some(finding) = self.check_sunset(cert, position, chain_len) {
            findings.push(finding);
        }

        findings
    }

    fn check_expiry(&self, cert: &Certificate, now: DateTime<Utc>) -> Option<Finding> {
        if cert.not_after > self.window.threshold(now) {
            return None;
        }

        let hours = (cert.not_after - now).num_seconds().div_euclid(3600);
        if hours <= EXPIRING_SHORTLY_HOURS {
            Some(Finding::ExpiringShortly { hours })
        } else {
            Some(Finding::ExpiringSoon { days: hours / 24 })
        }
    }

    fn check_sunset(&self, cert: &Certificate, position: usize, chain_len: usize) -> Option<Finding> {
        // Trust anchors are exempt
        if !self.check_signature_algorithm || position + 1 >= chain_len {
            return None;
        }

        let policy = self.sunsets.get(&cert.signature_algorithm)?;
        (cert.not_after >= policy.sunsets_at).then(|| Finding::SunsetAlgorithm {
            algorithm: policy.name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn cert(not_after: DateTime<Utc>, algorithm: SignatureAlgorithm) -> Certificate {
        Certificate {
            common_name: "www.example.com".to_string(),
            serial: vec![0x01, 0x23],
            not_before: not_after - Duration::days(365),
            not_after,
            signature_algorithm: algorithm,
            signature: vec![0xAA; 16],
            subject: b"subject".to_vec(),
            issuer: b"issuer".to_vec(),
            public_key: b"key".to_vec(),
            fingerprint: "00".repeat(32),
            der: Vec::new(),
        }
    }

    fn evaluator() -> PolicyEvaluator {
        PolicyEvaluator::new(WarnWindow::default(), true)
    }

    #[test]
    fn test_healthy_certificate_has_no_findings() {
        let c = cert(now() + Duration::days(200), SignatureAlgorithm::Sha256WithRsa);
        assert!(evaluator().evaluate(&c, 0, 3, now()).is_empty());
    }

    #[test]
    fn test_expiring_in_40_hours() {
        let c = cert(now() + Duration::hours(40), SignatureAlgorithm::Sha256WithRsa);
        assert_eq!(
            evaluator().evaluate(&c, 0, 3, now()),
            vec![Finding::ExpiringShortly { hours: 40 }]
        );
    }

    #[test]
    fn test_expiring_in_10_days() {
        let c = cert(now() + Duration::days(10), SignatureAlgorithm::Sha256WithRsa);
        assert_eq!(
            evaluator().evaluate(&c, 0, 3, now()),
            vec![Finding::ExpiringSoon { days: 10 }]
        );
    }

    #[test]
    fn test_48_hour_boundary() {
        let at_48 = cert(now() + Duration::hours(48), SignatureAlgorithm::Sha256WithRsa);
        let at_49 = cert(now() + Duration::hours(49), SignatureAlgorithm::Sha256WithRsa);

        assert_eq!(
            evaluator().evaluate(&at_48, 0, 2, now()),
            vec![Finding::ExpiringShortly { hours: 48 }]
        );
        assert_eq!(
            evaluator().evaluate(&at_49, 0, 2, now()),
            vec![Finding::ExpiringSoon { days: 2 }]
        );
    }

    #[test]
    fn test_partial_hours_are_floored() {
        let c = cert(
            now() + Duration::hours(5) + Duration::minutes(59),
            SignatureAlgorithm::Sha256WithRsa,
        );
        assert_eq!(
            evaluator().evaluate(&c, 0, 2, now()),
            vec![Finding::ExpiringShortly { hours: 5 }]
        );
    }

    #[test]
    fn test_expiry_exactly_at_threshold_is_reported() {
        let window = WarnWindow::default();
        let c = cert(window.threshold(now()), SignatureAlgorithm::Sha256WithRsa);
        assert_eq!(
            evaluator().evaluate(&c, 0, 2, now()),
            vec![Finding::ExpiringSoon { days: 30 }]
        );

        let later = cert(
            window.threshold(now()) + Duration::seconds(1),
            SignatureAlgorithm::Sha256WithRsa,
        );
        assert!(evaluator().evaluate(&later, 0, 2, now()).is_empty());
    }

    #[test]
    fn test_threshold_uses_calendar_months() {
        let jan_31 = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let window = WarnWindow::new(1, 1, 0);
        // Feb 31 2027 rolls over into March
        assert_eq!(
            window.threshold(jan_31),
            Utc.with_ymd_and_hms(2027, 3, 3, 0, 0, 0).unwrap()
        );

        let window = WarnWindow::new(0, 0, 30);
        assert_eq!(
            window.threshold(jan_31),
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_threshold_month_overflow_rolls_forward() {
        let jan_31 = Utc.with_ymd_and_hms(2026, 1, 31, 9, 30, 0).unwrap();

        assert_eq!(
            WarnWindow::new(0, 1, 0).threshold(jan_31),
            Utc.with_ymd_and_hms(2026, 3, 3, 9, 30, 0).unwrap()
        );
        assert_eq!(
            WarnWindow::new(0, 1, 1).threshold(jan_31),
            Utc.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap()
        );

        let leap_jan_31 = Utc.with_ymd_and_hms(2028, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            WarnWindow::new(0, 1, 0).threshold(leap_jan_31),
            Utc.with_ymd_and_hms(2028, 3, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_threshold_leap_day_plus_year() {
        let feb_29 = Utc.with_ymd_and_hms(2028, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(
            WarnWindow::new(1, 0, 0).threshold(feb_29),
            Utc.with_ymd_and_hms(2029, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            WarnWindow::new(4, 0, 0).threshold(feb_29),
            Utc.with_ymd_and_hms(2032, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_threshold_month_carries_into_year() {
        let nov_15 = Utc.with_ymd_and_hms(2026, 11, 15, 0, 0, 0).unwrap();
        assert_eq!(
            WarnWindow::new(0, 14, 20).threshold(nov_15),
            Utc.with_ymd_and_hms(2028, 2, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_sha1_intermediate_past_sunset() {
        let c = cert(now() + Duration::days(400), SignatureAlgorithm::Sha1WithRsa);
        assert_eq!(
            evaluator().evaluate(&c, 1, 3, now()),
            vec![Finding::SunsetAlgorithm {
                algorithm: "SHA1 with RSA".to_string()
            }]
        );
    }

    #[test]
    fn test_root_position_never_sunset() {
        let c = cert(now() + Duration::days(400), SignatureAlgorithm::Sha1WithRsa);
        assert!(evaluator().evaluate(&c, 2, 3, now()).is_empty());

        let md5 = cert(now() + Duration::days(400), SignatureAlgorithm::Md5WithRsa);
        assert!(evaluator().evaluate(&md5, 0, 1, now()).is_empty());
    }

    #[test]
    fn test_sunset_check_disabled() {
        let evaluator = PolicyEvaluator::new(WarnWindow::default(), false);
        let c = cert(now() + Duration::days(400), SignatureAlgorithm::Sha1WithRsa);
        assert!(evaluator.evaluate(&c, 0, 3, now()).is_empty());
    }

    #[test]
    fn test_expired_before_sha1_sunset_not_flagged() {
        let c = cert(
            Utc.with_ymd_and_hms(2016, 12, 31, 23, 59, 59).unwrap(),
            SignatureAlgorithm::Sha1WithRsa,
        );
        let findings = evaluator().evaluate(&c, 0, 2, now());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_expiry());
    }

    #[test]
    fn test_sunset_boundary_is_inclusive() {
        let c = cert(
            Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap(),
            SignatureAlgorithm::EcdsaWithSha1,
        );
        let evaluator = PolicyEvaluator::new(WarnWindow::new(0, 0, 1), true);
        let findings = evaluator.evaluate(&c, 0, 2, now());
        assert_eq!(
            findings.last(),
            Some(&Finding::SunsetAlgorithm {
                algorithm: "ECDSA with SHA1".to_string()
            })
        );
    }

    #[test]
    fn test_expiry_finding_precedes_sunset_finding() {
        let c = cert(now() + Duration::days(3), SignatureAlgorithm::DsaWithSha1);
        assert_eq!(
            evaluator().evaluate(&c, 0, 2, now()),
            vec![
                Finding::ExpiringSoon { days: 3 },
                Finding::SunsetAlgorithm {
                    algorithm: "DSA with SHA1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_md5_sunsets_at_process_start() {
        let start = now();
        let table: &'static SunsetTable = Box::leak(Box::new(SunsetTable::standard(start)));
        let evaluator = PolicyEvaluator::with_table(WarnWindow::default(), true, table);

        let c = cert(start + Duration::days(365), SignatureAlgorithm::Md5WithRsa);
        assert_eq!(
            evaluator.evaluate(&c, 0, 2, start),
            vec![Finding::SunsetAlgorithm {
                algorithm: "MD5 with RSA".to_string()
            }]
        );
    }

    #[test]
    fn test_at_most_one_expiry_finding() {
        for hours in [-5, 0, 1, 47, 48, 49, 100, 24 * 29, 24 * 30] {
            let c = cert(now() + Duration::hours(hours), SignatureAlgorithm::Md2WithRsa);
            let findings = evaluator().evaluate(&c, 0, 2, now());
            assert_eq!(findings.iter().filter(|f| f.is_expiry()).count(), 1);
            assert!(findings.len() <= 2);
        }
    }

    #[test]
    fn test_global_table_entries() {
        let table = SunsetTable::global();
        assert_eq!(table.len(), 5);
        assert!(table.get(&SignatureAlgorithm::Sha256WithRsa).is_none());
        assert_eq!(
            table.get(&SignatureAlgorithm::Sha1WithRsa).map(|p| p.name),
            Some("SHA1 with RSA")
        );
    }
}
