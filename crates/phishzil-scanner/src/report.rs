//! Threat summary shown by the results view.
//!
//! There is no detection engine behind this: the summary is fixed display
//! data keyed on the scan kind, with the subject label filled in.

use crate::sequencer::ScanOutcome;
use phishzil_core::{ScanKind, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatStatus {
    ThreatDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatReport {
    pub scan_type: ScanKind,
    pub subject: String,
    pub status: ThreatStatus,
    pub risk_level: RiskLevel,
    pub headline: String,
    pub details: Vec<String>,
    pub scanned_at: Timestamp,
}

impl ThreatReport {
    /// Summary for a finished scan of `subject`.
    #[must_use]
    pub fn for_subject(kind: ScanKind, subject: &str) -> Self {
        let risk_level = RiskLevel::High;
        let (headline, details) = match kind {
            ScanKind::Email => (
                "An email has been flagged as a phishing threat and was blocked to protect your system.",
                vec![
                    "Email phishing attempt detected".to_string(),
                    format!("File Name: {subject}"),
                    format!("Risk Level: {risk_level}"),
                    "Action Taken: Email quarantined".to_string(),
                    "Detection Time: 0.4 seconds".to_string(),
                    "Suspicious sender: phishing@malicious-domain.com".to_string(),
                ],
            ),
            ScanKind::Link => (
                "This link was identified as dangerous and has been disabled for your protection.",
                vec![
                    "Phishing attempt detected".to_string(),
                    format!("Scanned URL: {subject}"),
                    "Suspicious domain: malicious-site.com".to_string(),
                    format!("Risk Level: {risk_level}"),
                    "Detection Time: 0.3 seconds".to_string(),
                ],
            ),
        };

        Self {
            scan_type: kind,
            subject: subject.to_string(),
            status: ThreatStatus::ThreatDetected,
            risk_level,
            headline: headline.to_string(),
            details,
            scanned_at: Timestamp::now(),
        }
    }

    /// Summary for a session outcome; `None` if it was not started from a profile.
    #[must_use]
    pub fn for_outcome(outcome: &ScanOutcome) -> Option<Self> {
        outcome
            .kind
            .map(|kind| Self::for_subject(kind, &outcome.subject_label))
    }
}

impl fmt::Display for ThreatReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "THREAT DETECTED")?;
        writeln!(f, "{}", self.headline)?;
        writeln!(f, "Scanned {}: {}", self.scan_type, self.subject)?;
        writeln!(f, "Threat Details:")?;
        for detail in &self.details {
            writeln!(f, "  - {detail}")?;
        }
        write!(f, "Scan Date: {}", self.scanned_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TerminalAction;
    use phishzil_core::SessionId;

    #[test]
    fn test_email_report() {
        let report = ThreatReport::for_subject(ScanKind::Email, "invoice.eml");
        assert_eq!(report.status, ThreatStatus::ThreatDetected);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.details.len(), 6);
        assert!(report.details.contains(&"File Name: invoice.eml".to_string()));
        assert!(report.details.contains(&"Risk Level: HIGH".to_string()));
    }

    #[test]
    fn test_link_report_display() {
        let report = ThreatReport::for_subject(ScanKind::Link, "http://bad.example");
        let text = report.to_string();
        assert!(text.starts_with("THREAT DETECTED"));
        assert!(text.contains("Scanned Link: http://bad.example"));
        assert!(text.contains("  - Detection Time: 0.3 seconds"));
    }

    #[test]
    fn test_report_json_shape() {
        let report = ThreatReport::for_subject(ScanKind::Email, "a.eml");
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["scan_type"], "EMAIL");
        assert_eq!(json["status"], "THREAT_DETECTED");
        assert_eq!(json["risk_level"], "HIGH");
    }

    #[test]
    fn test_risk_level_is_always_high() {
        for kind in [ScanKind::Link, ScanKind::Email] {
            assert_eq!(ThreatReport::for_subject(kind, "s").risk_level, RiskLevel::High);
        }
        assert!(serde_json::from_str::<RiskLevel>("\"LOW\"").is_err());
    }

    #[test]
    fn test_for_outcome_requires_kind() {
        let mut outcome = ScanOutcome {
            session_id: SessionId::generate(),
            subject_label: "x".to_string(),
            kind: None,
            action: TerminalAction::ReturnHome,
        };
        assert!(ThreatReport::for_outcome(&outcome).is_none());

        outcome.kind = Some(ScanKind::Link);
        let report = ThreatReport::for_outcome(&outcome).expect("report for link outcome");
        assert_eq!(report.subject, "x");
    }
}
