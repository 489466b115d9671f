//! Incoming messages and link inspection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// An incoming SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Originating address, when the platform supplies one
    pub sender: Option<String>,
    /// Message text
    pub body: String,
}

impl SmsMessage {
    /// Create a message.
    #[must_use]
    pub fn new(sender: Option<String>, body: impl Into<String>) -> Self {
        Self {
            sender,
            body: body.into(),
        }
    }

    /// Sender for display and logging.
    #[must_use]
    pub fn sender_label(&self) -> &str {
        self.sender.as_deref().unwrap_or("unknown")
    }
}

/// Result of inspecting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SmsVerdict {
    /// No link-like content
    Clean,
    /// Body mentions `http`; `links` holds what could be extracted
    SuspiciousLink {
        /// Extracted URLs, or the whole body when none parsed
        links: Vec<String>,
    },
}

impl SmsVerdict {
    /// True for anything that should raise an alert.
    #[must_use]
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Self::SuspiciousLink { .. })
    }
}

/// Flag messages that carry a link.
///
/// The check is a case-insensitive substring match on `http`; there is no
/// classifier behind it.
#[must_use]
pub fn inspect(message: &SmsMessage) -> SmsVerdict {
    if !message.body.to_ascii_lowercase().contains("http") {
        return SmsVerdict::Clean;
    }

    let mut links = extract_links(&message.body);
    if links.is_empty() {
        links.push(message.body.trim().to_string());
    }
    SmsVerdict::SuspiciousLink { links }
}

fn extract_links(body: &str) -> Vec<String> {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX
        .get_or_init(|| Regex::new(r#"(?i)\bhttps?://[^\s<>"']+"#).expect("valid regex"));

    regex
        .find_iter(body)
        .map(|m| {
            m.as_str()
                .trim_end_matches(&['.', ',', ';', ':', '!', '?', ')'][..])
                .to_string()
        })
        .collect()
}
