//! Notification delivery.
//!
//! The pipeline only renders payloads; this module hands them to a
//! [`NotificationTransport`]. Delivery failures are returned to the caller,
//! nothing here retries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::process::Command;

use crate::config::Config;
use crate::error::{NotifyError, Result};
use crate::format::{Channel, NotificationPayload, WebhookPayload};
use crate::hook::HookEvent;
use crate::pipeline::fallback_notification;
use crate::presence::PresenceTracker;

const USER_AGENT: &str = concat!("cc-heads-up/", env!("CARGO_PKG_VERSION"));

pub trait NotificationTransport: Send + Sync {
    fn send_desktop<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Markdown message for chat-style channels (email, Slack, Telegram).
    fn send_rich<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, Result<()>>;

    fn send_webhook<'a>(&'a self, payload: &'a WebhookPayload) -> BoxFuture<'a, Result<()>>;
}

/// Route a rendered payload to the matching transport method.
pub async fn deliver(transport: &dyn NotificationTransport, payload: &NotificationPayload) -> Result<()> {
    match payload {
        NotificationPayload::Desktop(n) => transport.send_desktop(&n.title, &n.message).await,
        NotificationPayload::Markdown(n) => transport.send_rich(&n.title, &n.message).await,
        NotificationPayload::Webhook(p) => transport.send_webhook(p).await,
    }
}

/// Plain desktop notification for when rendering or delivery failed.
/// Returns whether it was shown; a closed gate suppresses it like any other
/// notification.
pub async fn deliver_fallback(
    transport: &dyn NotificationTransport,
    gate: Gate,
    event: &HookEvent,
) -> Result<bool> {
    if gate != Gate::Open {
        tracing::info!("fallback notification suppressed ({gate:?})");
        return Ok(false);
    }
    let (title, message) = fallback_notification(
        event.hook_event_name.as_deref(),
        event.cwd.as_deref(),
        event.message.as_deref(),
    );
    transport.send_desktop(&title, &message).await?;
    tracing::info!("fallback notification sent");
    Ok(true)
}

/// Whether a notification should go out at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    Disabled,
    /// The user was active in the terminal within the presence threshold.
    UserPresent,
}

pub fn gate(config: &Config, presence: &PresenceTracker, now: DateTime<Utc>) -> Gate {
    if !config.notifications_enabled {
        return Gate::Disabled;
    }
    if presence.is_present(now) {
        let idle_ms = presence
            .idle_time(now)
            .map(|d| d.num_milliseconds())
            .unwrap_or_default();
        tracing::info!("user is present (idle {idle_ms}ms), suppressing notification");
        return Gate::UserPresent;
    }
    Gate::Open
}

/// Body posted to the notification relay for chat-style channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub method: Channel,
    pub email: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub chat_id: Option<&'a str>,
    pub slack_webhook_url: Option<&'a str>,
    pub slack_username: Option<&'a str>,
}

/// Transport backed by the OS notifier, the relay and plain webhooks.
pub struct Notifier {
    client: reqwest::Client,
    config: Config,
    channel: Channel,
}

impl Notifier {
    pub fn new(config: Config, channel: Channel) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            config,
            channel,
        })
    }

    fn relay_request<'a>(&'a self, title: &'a str, message: &'a str) -> RelayRequest<'a> {
        RelayRequest {
            title,
            message,
            method: self.channel,
            email: self.config.email.as_deref(),
            phone_number: self.config.phone_number.as_deref(),
            chat_id: self.config.telegram_chat_id.as_deref(),
            slack_webhook_url: self.config.slack_webhook_url.as_deref(),
            slack_username: self.config.slack_username.as_deref(),
        }
    }

    async fn post_relay(&self, title: &str, message: &str) -> Result<()> {
        let mut request = self
            .client
            .post(&self.config.relay_url)
            .json(&self.relay_request(title, message));
        if let Some(key) = &self.config.license_key {
            request = request.header(reqwest::header::AUTHORIZATION, format!("License {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NotifyError::LicenseRejected);
        }
        if !status.is_success() {
            return Err(NotifyError::delivery(self.channel.as_str(), format!("HTTP {status}")));
        }

        tracing::info!("{} notification sent", self.channel);
        Ok(())
    }

    async fn post_webhook(&self, payload: &WebhookPayload) -> Result<()> {
        let url = self
            .config
            .webhook_url
            .as_deref()
            .ok_or_else(|| NotifyError::Config("webhook URL not configured".into()))?;

        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::delivery("webhook", format!("HTTP {status}")));
        }

        tracing::info!("webhook notification sent to {url}");
        Ok(())
    }
}

impl NotificationTransport for Notifier {
    fn send_desktop<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, Result<()>> {
        show_desktop(title, message).boxed()
    }

    fn send_rich<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, Result<()>> {
        self.post_relay(title, message).boxed()
    }

    fn send_webhook<'a>(&'a self, payload: &'a WebhookPayload) -> BoxFuture<'a, Result<()>> {
        self.post_webhook(payload).boxed()
    }
}

async fn show_desktop(title: &str, message: &str) -> Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("osascript");
        c.arg("-e").arg(format!(
            "display notification {} with title {}",
            applescript_quote(message),
            applescript_quote(title)
        ));
        c
    } else {
        let mut c = Command::new("notify-send");
        c.arg("--app-name=cc-heads-up").arg(title).arg(message);
        c
    };

    let output = command
        .output()
        .await
        .map_err(|e| NotifyError::delivery("desktop", e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NotifyError::delivery("desktop", stderr.trim()));
    }

    tracing::info!("desktop notification shown: {title}");
    Ok(())
}

fn applescript_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
