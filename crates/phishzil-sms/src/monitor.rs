//! SMS monitor: turns incoming messages into alerts and link scans.

use crate::error::Result;
use crate::message::{inspect, SmsMessage, SmsVerdict};
use phishzil_core::SmsConfig;
use phishzil_scanner::{ScanProfile, ScanSequencer, SequencerHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Raised for a message that carries a link.
#[derive(Debug)]
pub struct SmsAlert {
    /// Originating address, if known
    pub sender: Option<String>,
    /// Links extracted from the body
    pub links: Vec<String>,
    /// Link scan started for the first link, when auto-scan is on
    pub scan: Option<SequencerHandle>,
}

/// Inspects incoming messages and launches link scans.
#[derive(Debug, Clone)]
pub struct SmsMonitor {
    sequencer: ScanSequencer,
    profile: ScanProfile,
    config: SmsConfig,
}

impl SmsMonitor {
    /// Create a monitor that scans with the built-in link profile.
    #[must_use]
    pub fn new(sequencer: ScanSequencer, config: SmsConfig) -> Self {
        Self {
            sequencer,
            profile: ScanProfile::link(),
            config,
        }
    }

    /// Use a different profile for the scans this monitor starts.
    #[must_use]
    pub fn with_profile(mut self, profile: ScanProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Inspect one message.
    ///
    /// Returns `None` for clean messages and when intake is disabled.
    pub fn handle(&self, message: &SmsMessage) -> Result<Option<SmsAlert>> {
        if !self.config.enabled {
            debug!("SMS intake disabled, ignoring message");
            return Ok(None);
        }

        debug!("Processing SMS from {}", message.sender_label());

        let SmsVerdict::SuspiciousLink { links } = inspect(message) else {
            return Ok(None);
        };

        warn!(
            sender = message.sender_label(),
            links = links.len(),
            "Possible phishing link in SMS"
        );

        let scan = if self.config.auto_scan_links {
            let handle = self
                .sequencer
                .start_profile(&self.profile, links.first().map(String::as_str))?;
            info!(session_id = %handle.session_id(), "Started link scan for SMS");
            Some(handle)
        } else {
            None
        };

        Ok(Some(SmsAlert {
            sender: message.sender.clone(),
            links,
            scan,
        }))
    }

    /// Handle messages from `messages` until it closes, forwarding alerts.
    ///
    /// Stops early if the alert receiver goes away. Returns the number of
    /// alerts delivered.
    pub async fn run(
        self,
        mut messages: mpsc::Receiver<SmsMessage>,
        alerts: mpsc::Sender<SmsAlert>,
    ) -> Result<usize> {
        let mut delivered = 0;
        while let Some(message) = messages.recv().await {
            let Some(alert) = self.handle(&message)? else {
                continue;
            };
            if alerts.send(alert).await.is_err() {
                debug!("Alert receiver closed, stopping SMS monitor");
                break;
            }
            delivered += 1;
        }
        Ok(delivered)
    }
}
