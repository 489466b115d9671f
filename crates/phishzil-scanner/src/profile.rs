//! Scan profiles: one configuration object per kind of scan.
//!
//! Link and email scans differ only in their stage table, the label used when
//! no subject was supplied, and what the presentation layer does once the
//! sequence finishes.

use crate::stage::StageTable;
use phishzil_core::{ScanKind, ScanningConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the presentation layer should do after the terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TerminalAction {
    /// Offer a "Done" control that returns to the start screen.
    ReturnHome,
    /// Reveal the threat report after `delay`.
    ShowResults {
        /// Pause between completion and the results view
        #[serde(with = "millis")]
        delay: Duration,
    },
}

/// Configuration for one kind of scan session.
#[derive(Debug, Clone)]
pub struct ScanProfile {
    kind: ScanKind,
    stages: StageTable,
    terminal_action: TerminalAction,
    fallback_subject: String,
}

impl ScanProfile {
    /// Build a profile from its parts.
    #[must_use]
    pub fn new(kind: ScanKind, stages: StageTable) -> Self {
        let fallback_subject = match kind {
            ScanKind::Link => "No URL provided",
            ScanKind::Email => "No email provided",
        };
        Self {
            kind,
            stages,
            terminal_action: TerminalAction::ReturnHome,
            fallback_subject: fallback_subject.to_string(),
        }
    }

    /// Link scan: built-in link table, returns home when done.
    #[must_use]
    pub fn link() -> Self {
        Self::new(ScanKind::Link, StageTable::link_scan())
    }

    /// Email scan: built-in email table, shows results one second after completion.
    #[must_use]
    pub fn email() -> Self {
        Self::new(ScanKind::Email, StageTable::email_scan()).with_terminal_action(
            TerminalAction::ShowResults {
                delay: Duration::from_millis(1000),
            },
        )
    }

    /// Built-in profile for `kind`, with the results delay taken from config.
    #[must_use]
    pub fn for_kind(kind: ScanKind, config: &ScanningConfig) -> Self {
        match kind {
            ScanKind::Link => Self::link(),
            ScanKind::Email => Self::email().with_terminal_action(TerminalAction::ShowResults {
                delay: config.results_delay(),
            }),
        }
    }

    /// Replace the stage table.
    #[must_use]
    pub fn with_stages(mut self, stages: StageTable) -> Self {
        self.stages = stages;
        self
    }

    /// Replace what happens once the final stage is reached.
    #[must_use]
    pub fn with_terminal_action(mut self, action: TerminalAction) -> Self {
        self.terminal_action = action;
        self
    }

    /// Label used when the caller supplies no subject.
    #[must_use]
    pub fn with_fallback_subject(mut self, subject: impl Into<String>) -> Self {
        self.fallback_subject = subject.into();
        self
    }

    /// Scan kind this profile runs as.
    #[must_use]
    pub fn kind(&self) -> ScanKind {
        self.kind
    }

    /// Stage table driven by sessions of this profile.
    #[must_use]
    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    /// Action carried by the completion event.
    #[must_use]
    pub fn terminal_action(&self) -> TerminalAction {
        self.terminal_action
    }

    /// Subject label for a session: the caller's, unless missing or blank.
    ///
    /// A non-blank subject is kept exactly as given, surrounding whitespace
    /// included.
    #[must_use]
    pub fn resolve_subject(&self, subject: Option<&str>) -> String {
        match subject {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => self.fallback_subject.clone(),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
