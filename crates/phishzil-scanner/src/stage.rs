//! Stage definitions and validated stage tables.
//!
//! A [`StageTable`] is immutable once built and cheap to clone, so one table
//! can back any number of concurrent scan sessions.

use crate::error::StageTableError;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;

/// One phase of a scan animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Short human-readable name of the stage
    pub title: String,
    /// Human-readable description
    pub subtitle: String,
    /// Sub-step labels, revealed in order
    #[serde(default)]
    pub steps: Vec<String>,
    /// Progress bar value (0-100) shown while this stage is current
    pub progress_target: u8,
    /// True only for the last stage of a table
    #[serde(default)]
    pub is_final: bool,
}

impl Stage {
    /// Create a non-final stage with no steps.
    #[must_use]
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>, progress_target: u8) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            steps: Vec::new(),
            progress_target,
            is_final: false,
        }
    }

    /// Set the step labels.
    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this stage as the final one.
    #[must_use]
    pub fn final_stage(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// A validated, shared, ordered list of stages.
///
/// Guarantees: non-empty, exactly one final stage and it is the last,
/// every progress target within 0-100, and targets never decrease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Stage>", into = "Vec<Stage>")]
pub struct StageTable {
    stages: Arc<[Stage]>,
}

impl StageTable {
    /// Validate `stages` and wrap them in a shareable table.
    pub fn new(stages: Vec<Stage>) -> Result<Self, StageTableError> {
        Self::validate(&stages)?;
        Ok(Self {
            stages: stages.into(),
        })
    }

    /// Check the table invariants without building a table.
    pub fn validate(stages: &[Stage]) -> Result<(), StageTableError> {
        let last = stages.len().checked_sub(1).ok_or(StageTableError::Empty)?;

        if let Some(index) = stages[..last].iter().position(|s| s.is_final) {
            return Err(StageTableError::FinalNotLast { index });
        }
        if !stages[last].is_final {
            return Err(StageTableError::MissingFinal);
        }

        let mut previous = 0;
        for (index, stage) in stages.iter().enumerate() {
            let value = stage.progress_target;
            if value > 100 {
                return Err(StageTableError::ProgressOutOfRange { index, value });
            }
            if value < previous {
                return Err(StageTableError::ProgressDecreases {
                    index,
                    previous,
                    value,
                });
            }
            previous = value;
        }

        Ok(())
    }

    /// Index of the final stage.
    #[must_use]
    pub fn final_index(&self) -> usize {
        self.stages.len() - 1
    }

    /// Five-stage table driving a link scan.
    #[must_use]
    pub fn link_scan() -> Self {
        Self::builtin(vec![
            Stage::new(
                "Scanning URL",
                "Checking the provided link for suspicious patterns",
                0,
            )
            .with_steps([
                "Initializing scanner",
                "Analyzing URL format",
                "Querying threat database",
            ]),
            Stage::new(
                "Identifying Threat",
                "Matching against known phishing signatures",
                25,
            )
            .with_steps([
                "Loading threat signatures",
                "Matching patterns",
                "Threat identified",
            ]),
            Stage::new(
                "Neutralizing Threat",
                "Removing malicious payload from the link",
                50,
            )
            .with_steps([
                "Disabling harmful scripts",
                "Removing redirects",
                "Cleaning embedded payloads",
            ]),
            Stage::new(
                "Securing Device",
                "Ensuring no residual malicious code remains",
                75,
            )
            .with_steps([
                "Scanning local cache",
                "Verifying system integrity",
                "Applying security patches",
            ]),
            Stage::new(
                "Phishing Link Neutralized Successfully!",
                "Protecting your device from malicious content",
                100,
            )
            .with_steps([
                "URL analyzed and categorized",
                "Threat signatures identified",
                "Neutralizing malicious code",
            ])
            .final_stage(),
        ])
    }

    /// Five-stage table driving an email scan.
    #[must_use]
    pub fn email_scan() -> Self {
        Self::builtin(vec![
            Stage::new(
                "Scanning Email",
                "Analyzing the provided email for phishing indicators",
                0,
            )
            .with_steps([
                "Initializing scanner",
                "Extracting headers",
                "Parsing email content",
            ]),
            Stage::new(
                "Identifying Threat",
                "Matching against known phishing templates",
                25,
            )
            .with_steps([
                "Loading threat patterns",
                "Matching templates",
                "Threat detected",
            ]),
            Stage::new(
                "Neutralizing Threat",
                "Removing malicious links and attachments",
                50,
            )
            .with_steps([
                "Disabling harmful links",
                "Cleaning attachments",
                "Sanitizing HTML content",
            ]),
            Stage::new(
                "Securing Inbox",
                "Ensuring no residual malicious traces remain",
                75,
            )
            .with_steps([
                "Scanning local cache",
                "Verifying email integrity",
                "Applying security measures",
            ]),
            Stage::new("Analysis Complete", "Scan results ready", 100)
                .with_steps([
                    "Email analyzed and categorized",
                    "Threat signatures identified",
                    "Generating security report",
                ])
                .final_stage(),
        ])
    }

    // Built-in tables are covered by tests, so skip the Result plumbing.
    fn builtin(stages: Vec<Stage>) -> Self {
        debug_assert!(Self::validate(&stages).is_ok());
        Self {
            stages: stages.into(),
        }
    }
}

impl Deref for StageTable {
    type Target = [Stage];

    fn deref(&self) -> &Self::Target {
        &self.stages
    }
}

impl TryFrom<Vec<Stage>> for StageTable {
    type Error = StageTableError;

    fn try_from(stages: Vec<Stage>) -> Result<Self, Self::Error> {
        Self::new(stages)
    }
}

impl From<StageTable> for Vec<Stage> {
    fn from(table: StageTable) -> Self {
        table.stages.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage() -> Vec<Stage> {
        vec![
            Stage::new("first", "", 50).with_steps(["a", "b"]),
            Stage::new("second", "", 100).with_steps(["c"]).final_stage(),
        ]
    }

    #[test]
    fn test_valid_table() {
        let table = StageTable::new(two_stage()).expect("valid table");
        assert_eq!(table.len(), 2);
        assert_eq!(table.final_index(), 1);
        assert_eq!(table[0].steps, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(StageTable::new(vec![]), Err(StageTableError::Empty));
    }

    #[test]
    fn test_final_not_last_rejected() {
        let mut stages = two_stage();
        stages[0].is_final = true;
        assert_eq!(
            StageTable::new(stages),
            Err(StageTableError::FinalNotLast { index: 0 })
        );
    }

    #[test]
    fn test_missing_final_rejected() {
        let mut stages = two_stage();
        stages[1].is_final = false;
        assert_eq!(StageTable::new(stages), Err(StageTableError::MissingFinal));
    }

    #[test]
    fn test_progress_constraints() {
        let mut stages = two_stage();
        stages[1].progress_target = 101;
        assert_eq!(
            StageTable::new(stages),
            Err(StageTableError::ProgressOutOfRange {
                index: 1,
                value: 101
            })
        );

        let mut stages = two_stage();
        stages[1].progress_target = 10;
        assert_eq!(
            StageTable::new(stages),
            Err(StageTableError::ProgressDecreases {
                index: 1,
                previous: 50,
                value: 10
            })
        );
    }

    #[test]
    fn test_single_final_stage_without_steps() {
        let table = StageTable::new(vec![Stage::new("only", "", 100).final_stage()])
            .expect("single stage table");
        assert!(table[0].steps.is_empty());
    }

    #[test]
    fn test_builtin_tables_are_valid() {
        for table in [StageTable::link_scan(), StageTable::email_scan()] {
            assert!(StageTable::validate(&table).is_ok());
            assert_eq!(table.len(), 5);
            let targets: Vec<u8> = table.iter().map(|s| s.progress_target).collect();
            assert_eq!(targets, vec![0, 25, 50, 75, 100]);
            assert!(table.iter().all(|s| s.steps.len() == 3));
        }
        assert_eq!(StageTable::email_scan()[4].title, "Analysis Complete");
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"[
            {"title": "a", "subtitle": "", "steps": ["x"], "progress_target": 10, "is_final": true},
            {"title": "b", "subtitle": "", "progress_target": 100, "is_final": true}
        ]"#;
        let err = serde_json::from_str::<StageTable>(json).expect_err("final flag on first stage");
        assert!(err.to_string().contains("not the last stage"));

        let toml_str = r#"
[[stages]]
title = "Checking"
subtitle = "Looking around"
steps = ["one", "two"]
progress_target = 40

[[stages]]
title = "Done"
subtitle = ""
progress_target = 100
is_final = true
"#;
        #[derive(Deserialize)]
        struct Wrapper {
            stages: StageTable,
        }
        let parsed: Wrapper = toml::from_str(toml_str).expect("parse toml stage table");
        assert_eq!(parsed.stages.len(), 2);
        assert_eq!(parsed.stages[0].steps.len(), 2);
    }
}
