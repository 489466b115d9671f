//! PhishZil SMS - incoming message inspection.
//!
//! Messages whose body carries a link are flagged, and when configured a
//! link scan is started for the first link found.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod message;
pub mod monitor;

pub use error::{Result, SmsError};
pub use message::{inspect, SmsMessage, SmsVerdict};
pub use monitor::{SmsAlert, SmsMonitor};
