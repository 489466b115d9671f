//! SMS intake errors.

use phishzil_scanner::ScanError;
use thiserror::Error;

/// Errors raised while handling an incoming message.
#[derive(Debug, Error)]
pub enum SmsError {
    /// The link scan for a flagged message could not be started
    #[error("failed to start link scan: {0}")]
    Scan(#[from] ScanError),
}

/// Result type alias for SMS operations.
pub type Result<T> = std::result::Result<T, SmsError>;
