//! PhishZil Core - Foundation crate for the PhishZil scan workspace.
//!
//! This crate provides shared types, error handling, and configuration
//! management that the scanner, SMS intake, and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`SessionId`, `ScanKind`, `Timestamp`)
//!
//! # Example
//!
//! ```rust
//! use phishzil_core::{AppConfig, ScanKind};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scanning.step_interval_ms, 800);
//! assert_eq!(ScanKind::Email.display_name(), "Email");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, GeneralConfig, ScanningConfig, SmsConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::{ScanKind, SessionId, Timestamp};
