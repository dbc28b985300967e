//! User presence tracking.
//!
//! Notifications are pointless while the user is typing in the terminal.
//! The tracker is an ordinary value owned by the caller; time is always
//! passed in, never read from the system clock here.
//!
//! Since each hook runs in a fresh process, the last activity instant is
//! persisted in a small marker file written by `cc-heads-up activity`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;

pub const DEFAULT_THRESHOLD_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceTracker {
    last_activity: Option<DateTime<Utc>>,
    threshold_ms: u64,
    enabled: bool,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_MS, true)
    }
}

impl PresenceTracker {
    pub fn new(threshold_ms: u64, enabled: bool) -> Self {
        Self {
            last_activity: None,
            threshold_ms,
            enabled,
        }
    }

    pub fn with_last_activity(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_activity = at;
        self
    }

    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
        tracing::debug!("user activity recorded");
    }

    /// Active within the threshold. Always `false` when disabled or when no
    /// activity was ever recorded.
    pub fn is_present(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        self.idle_time(now)
            .is_some_and(|idle| idle < Duration::milliseconds(self.threshold_ms as i64))
    }

    pub fn idle_time(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_activity.map(|at| now - at)
    }

    pub fn configure(&mut self, threshold_ms: u64, enabled: bool) {
        self.threshold_ms = threshold_ms;
        self.enabled = enabled;
        tracing::info!(
            "presence detection {} (threshold {threshold_ms}ms)",
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

/// Default location of the activity marker.
pub fn activity_marker_path() -> Option<PathBuf> {
    dirs_next::cache_dir().map(|p| p.join("cc-heads-up").join("last-activity"))
}

/// Last recorded activity, `None` when the marker is missing or unreadable.
pub fn load_last_activity(path: &Path) -> Option<DateTime<Utc>> {
    let contents = std::fs::read_to_string(path).ok()?;
    match DateTime::parse_from_rfc3339(contents.trim()) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("ignoring malformed activity marker {}: {e}", path.display());
            None
        }
    }
}

pub fn store_last_activity(path: &Path, at: DateTime<Utc>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, at.to_rfc3339())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_never_active_is_absent() {
        let tracker = PresenceTracker::default();
        assert!(!tracker.is_present(at(0)));
        assert_eq!(tracker.idle_time(at(0)), None);
    }

    #[test]
    fn test_present_within_threshold() {
        let mut tracker = PresenceTracker::new(30_000, true);
        tracker.record_activity(at(0));
        assert!(tracker.is_present(at(29)));
        assert!(!tracker.is_present(at(30)));
        assert_eq!(tracker.idle_time(at(10)), Some(Duration::seconds(10)));
    }

    #[test]
    fn test_disabled_is_never_present() {
        let mut tracker = PresenceTracker::new(30_000, true);
        tracker.record_activity(at(0));
        tracker.configure(30_000, false);
        assert!(!tracker.is_present(at(1)));

        tracker.configure(500, true);
        assert!(!tracker.is_present(at(1)));
    }

    #[test]
    fn test_marker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("last-activity");
        assert_eq!(load_last_activity(&path), None);

        store_last_activity(&path, at(5)).unwrap();
        assert_eq!(load_last_activity(&path), Some(at(5)));

        std::fs::write(&path, "yesterday").unwrap();
        assert_eq!(load_last_activity(&path), None);
    }
}
