//! Result debouncing: one event per code while it stays in view.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;

use crate::config::DebounceKey;
use crate::models::{Detection, Symbology};

/// Outcome of classifying a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First sighting, or first after the cooldown elapsed: emit
    New,
    /// Repeat inside the cooldown window: do not emit
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    symbology: Option<Symbology>,
    payload: String,
}

/// Sliding-window duplicate suppression keyed by (symbology, payload).
#[derive(Debug, Clone)]
pub struct Debouncer {
    cooldown: Duration,
    retention: Duration,
    key_policy: DebounceKey,
    last_seen: HashMap<EntryKey, Duration>,
    last_purge: Option<Duration>,
}

impl Debouncer {
    /// Empty debouncer. `retention` is raised to at least `cooldown`.
    pub fn new(cooldown: Duration, retention: Duration, key_policy: DebounceKey) -> Self {
        Self {
            cooldown,
            retention: retention.max(cooldown),
            key_policy,
            last_seen: HashMap::new(),
            last_purge: None,
        }
    }

    /// Classify a detection and refresh its entry.
    ///
    /// An entry whose age is at least the cooldown counts as expired. Every
    /// sighting, suppressed or not, moves the entry's timestamp forward.
    pub fn classify(&mut self, detection: &Detection) -> Verdict {
        let now = detection.timestamp;
        self.maybe_purge(now);

        let key = self.key_for(detection);
        let verdict = match self.last_seen.get(&key) {
            Some(&last) if now.saturating_sub(last) < self.cooldown => Verdict::Suppressed,
            _ => Verdict::New,
        };
        if verdict == Verdict::Suppressed {
            debug!(
                "suppressed repeat {} {:?} at {:?}",
                detection.symbology, detection.payload, now
            );
        }
        // Keep the newest timestamp if detections arrive out of order.
        let entry = self.last_seen.entry(key).or_insert(now);
        *entry = (*entry).max(now);
        verdict
    }

    /// Drop entries untouched for longer than the retention window.
    pub fn purge(&mut self, now: Duration) {
        let retention = self.retention;
        let before = self.last_seen.len();
        self.last_seen
            .retain(|_, &mut last| now.saturating_sub(last) <= retention);
        let purged = before - self.last_seen.len();
        if purged > 0 {
            debug!("purged {purged} debounce entries");
        }
        self.last_purge = Some(now);
    }

    /// Forget every entry.
    pub fn reset(&mut self) {
        self.last_seen.clear();
        self.last_purge = None;
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    /// True when no code is tracked
    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    fn maybe_purge(&mut self, now: Duration) {
        match self.last_purge {
            None => self.last_purge = Some(now),
            Some(last) if now.saturating_sub(last) >= self.retention => self.purge(now),
            Some(_) => {}
        }
    }

    fn key_for(&self, detection: &Detection) -> EntryKey {
        let symbology = match self.key_policy {
            DebounceKey::SymbologyAndPayload => Some(detection.symbology),
            DebounceKey::Payload => None,
        };
        EntryKey {
            symbology,
            payload: detection.payload.clone(),
        }
    }
}
