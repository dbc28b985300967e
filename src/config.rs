//! YAML configuration.
//!
//! ```yaml
//! notification_method: slack
//! slack_webhook_url: https://hooks.slack.com/services/...
//! presence:
//!   enabled: true
//!   threshold_ms: 30000
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{NotifyError, Result};
use crate::format::Channel;
use crate::presence::{PresenceTracker, DEFAULT_THRESHOLD_MS};
use crate::transcript::MAX_TRANSCRIPT_LINES;

pub const DEFAULT_RELAY_URL: &str = "https://www.heyagent.dev/api/notification";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notification_method: Channel,
    pub notifications_enabled: bool,
    pub webhook_url: Option<String>,
    pub relay_url: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub slack_username: Option<String>,
    /// Forwarded to the relay as-is; the relay decides what it means.
    pub license_key: Option<String>,
    pub presence: PresenceConfig,
    pub transcript_lines: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub enabled: bool,
    pub threshold_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_ms: DEFAULT_THRESHOLD_MS,
        }
    }
}

impl PresenceConfig {
    pub fn tracker(&self) -> PresenceTracker {
        PresenceTracker::new(self.threshold_ms, self.enabled)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notification_method: Channel::Desktop,
            notifications_enabled: true,
            webhook_url: None,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            email: None,
            phone_number: None,
            telegram_chat_id: None,
            slack_webhook_url: None,
            slack_username: None,
            license_key: None,
            presence: PresenceConfig::default(),
            transcript_lines: MAX_TRANSCRIPT_LINES,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// `<config_dir>/cc-heads-up/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join("cc-heads-up").join("config.yaml"))
    }

    /// Load from `path`, or the default location. A missing file yields the
    /// defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_yaml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Check that `channel` has somewhere to deliver to.
    pub fn validate_for(&self, channel: Channel) -> Result<()> {
        let (field, value) = match channel {
            Channel::Desktop => return Ok(()),
            Channel::Email => ("email", &self.email),
            Channel::Telegram => ("telegram_chat_id", &self.telegram_chat_id),
            Channel::Slack => ("slack_webhook_url", &self.slack_webhook_url),
            Channel::Webhook => ("webhook_url", &self.webhook_url),
        };
        match value.as_deref() {
            Some(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(NotifyError::Config(format!(
                "{channel} notifications need `{field}` to be set"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.notification_method, Channel::Desktop);
        assert!(config.notifications_enabled);
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.transcript_lines, 10);
        assert!(!config.presence.enabled);
        assert_eq!(config.presence.threshold_ms, 30_000);
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml(
            "notification_method: webhook\nwebhook_url: https://example.com/hook\npresence:\n  enabled: true\n",
        )
        .unwrap();
        assert_eq!(config.notification_method, Channel::Webhook);
        assert_eq!(config.webhook_url.as_deref(), Some("https://example.com/hook"));
        assert!(config.presence.enabled);
        assert_eq!(config.presence.threshold_ms, 30_000);
        assert!(config.notifications_enabled);
    }

    #[test]
    fn test_unknown_method_is_desktop() {
        let config = Config::from_yaml("notification_method: whatsapp\n").unwrap();
        assert_eq!(config.notification_method, Channel::Desktop);
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert!(matches!(
            Config::from_yaml("notifications_enabled: [1, 2"),
            Err(NotifyError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("config.yaml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "notification_method: slack\nslack_webhook_url: https://hooks.slack.test/x\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.notification_method, Channel::Slack);
        assert!(config.validate_for(Channel::Slack).is_ok());
    }

    #[test]
    fn test_validate_for() {
        let config = Config::default();
        assert!(config.validate_for(Channel::Desktop).is_ok());
        let err = config.validate_for(Channel::Webhook).unwrap_err();
        assert!(err.to_string().contains("webhook_url"));

        let config = Config {
            email: Some("  ".into()),
            telegram_chat_id: Some("42".into()),
            ..Config::default()
        };
        assert!(config.validate_for(Channel::Email).is_err());
        assert!(config.validate_for(Channel::Telegram).is_ok());
    }
}
