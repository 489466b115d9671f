//! PhishZil Scanner - multi-stage scan progress sequencing.
//!
//! This crate drives the "disarming" progress view: a subject label is run
//! through an ordered table of stages, each revealing its step labels on a
//! fixed timer, until the final stage completes and the caller moves on to a
//! results view.
//!
//! # Features
//!
//! - Validated, shareable stage tables with built-in link and email variants
//! - One tokio task per session, non-blocking start
//! - Snapshot (`watch`) and ordered event (`mpsc`) views of each session
//! - Idempotent cancellation that also holds on multi-threaded runtimes
//! - Static threat summary for the results view
//!
//! # Example
//!
//! ```rust,no_run
//! use phishzil_scanner::{ScanProfile, ScanSequencer, ThreatReport};
//!
//! # async fn demo() -> phishzil_scanner::Result<()> {
//! let sequencer = ScanSequencer::default();
//! let mut handle = sequencer.start_profile(&ScanProfile::email(), Some("invoice.eml"))?;
//!
//! while let Some(event) = handle.next_event().await {
//!     println!("{event:?}");
//! }
//! let report = ThreatReport::for_subject(phishzil_core::ScanKind::Email, "invoice.eml");
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod profile;
#[allow(missing_docs)]
pub mod report;
pub mod sequencer;
pub mod stage;

// Re-export commonly used types
pub use error::{Result, ScanError, StageTableError};
pub use profile::{ScanProfile, TerminalAction};
pub use report::{RiskLevel, ThreatReport, ThreatStatus};
pub use sequencer::{
    ScanEvent, ScanOutcome, ScanSequencer, SequencerHandle, SequencerPhase, SequencerState,
    SequencerTiming, STEP_INTERVAL, TRANSITION_GAP,
};
pub use stage::{Stage, StageTable};
