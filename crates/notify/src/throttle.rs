//! Duplicate-alert suppression.
//!
//! The risk monitor recomputes from the snapshot every cycle and will raise
//! the same breach again and again while it persists. This throttle is the
//! collaborator-side state that keeps repeated `(market, category,
//! severity)` alerts from flooding the notification channel; it lives here,
//! outside the core, so the monitor stays pure.

use chrono::{DateTime, Duration, Utc};
use gmxlp_core::{Alert, AlertCategory, AlertSeverity};
use std::collections::HashMap;

type Key = (Option<String>, AlertCategory, AlertSeverity);

pub struct AlertThrottle {
    window: Duration,
    last_sent: HashMap<Key, DateTime<Utc>>,
}

impl AlertThrottle {
    #[must_use]
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs.min(i64::MAX as u64) as i64),
            last_sent: HashMap::new(),
        }
    }

    /// Returns true if the alert should be delivered, and records it.
    /// An escalated severity for the same market and category is always
    /// admitted: the throttle keys on severity, so a Warning turning
    /// Critical is a new key, never a suppressed duplicate.
    pub fn admit(&mut self, alert: &Alert) -> bool {
        let key: Key = (alert.market_key.clone(), alert.category, alert.severity);
        let now = alert.timestamp;

        match self.last_sent.get(&key) {
            Some(last) if now - *last < self.window => false,
            _ => {
                self.last_sent.insert(key, now);
                true
            }
        }
    }

    /// Drops entries older than the window so the map does not grow with
    /// every market ever alerted on.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.last_sent.retain(|_, sent| now - *sent < window);
    }
}
