//! Notification formatting.
//!
//! Renders a scenario and its suggestion into the shape a channel expects:
//! a short title/message pair for desktop popups, a markdown body for chat
//! and email relays, or a structured JSON document for webhooks.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{iso_timestamp, Clock};
use crate::context::RequestContext;
use crate::patterns::ErrorKind;
use crate::scenario::{Scenario, ScenarioKind};
use crate::suggestion::{condensed, Condensed, SuggestedAction, Suggestion};

pub const DESKTOP_MAX_LENGTH: usize = 200;

/// Notification delivery medium. Unrecognized names mean desktop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Channel {
    #[default]
    Desktop,
    Email,
    Slack,
    Telegram,
    Webhook,
}

impl Channel {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "slack" => Self::Slack,
            "telegram" => Self::Telegram,
            "webhook" => Self::Webhook,
            _ => Self::Desktop,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Email => "email",
            Self::Slack => "slack",
            Self::Telegram => "telegram",
            Self::Webhook => "webhook",
        }
    }

    /// Channels delivered through the markdown relay.
    pub fn is_rich(self) -> bool {
        matches!(self, Self::Email | Self::Slack | Self::Telegram)
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl FromStr for Channel {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesktopNotification {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RichNotification {
    pub title: String,
    pub message: String,
    pub rich_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub title: String,
    pub message: String,
    pub scenario: ScenarioKind,
    pub subtype: Option<String>,
    pub project: String,
    pub timestamp: String,
    pub context: WebhookContext,
    pub error: Option<WebhookError>,
    pub tool_use: Option<WebhookToolUse>,
    pub suggestions: Vec<SuggestedAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookContext {
    pub cwd: String,
    pub session_id: Option<String>,
    pub hook_event: String,
    pub notification_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookToolUse {
    pub name: String,
    pub input: Value,
}

/// A rendered notification, ready for its transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum NotificationPayload {
    Desktop(DesktopNotification),
    Markdown(RichNotification),
    Webhook(WebhookPayload),
}

impl NotificationPayload {
    pub fn title(&self) -> &str {
        match self {
            Self::Desktop(n) => &n.title,
            Self::Markdown(n) => &n.title,
            Self::Webhook(n) => &n.title,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Desktop(n) => &n.message,
            Self::Markdown(n) => &n.message,
            Self::Webhook(n) => &n.message,
        }
    }
}

pub fn format(
    channel: Channel,
    scenario: &Scenario,
    context: &RequestContext,
    suggestion: &Suggestion,
    clock: &dyn Clock,
) -> NotificationPayload {
    match channel {
        Channel::Desktop => NotificationPayload::Desktop(format_desktop(scenario, context, suggestion)),
        Channel::Email | Channel::Slack | Channel::Telegram => {
            NotificationPayload::Markdown(format_markdown(scenario, context, suggestion))
        }
        Channel::Webhook => {
            NotificationPayload::Webhook(format_webhook(scenario, context, suggestion, clock))
        }
    }
}

fn primary(suggestion: &Suggestion) -> Option<&str> {
    Some(suggestion.primary.as_str()).filter(|p| !p.is_empty())
}

fn error_file<'a>(scenario: &'a Scenario, context: &'a RequestContext) -> Option<&'a str> {
    scenario
        .details
        .file
        .as_deref()
        .or_else(|| context.last_error.as_ref().and_then(|e| e.file.as_deref()))
}

fn error_line(scenario: &Scenario, context: &RequestContext) -> Option<u32> {
    scenario
        .details
        .line
        .or_else(|| context.last_error.as_ref().and_then(|e| e.line))
}

fn tool_name(context: &RequestContext) -> &str {
    context
        .last_tool_use
        .as_ref()
        .map(|t| t.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("Action")
}

pub fn format_desktop(
    scenario: &Scenario,
    context: &RequestContext,
    suggestion: &Suggestion,
) -> DesktopNotification {
    let project = &context.project;
    let primary = primary(suggestion).map(String::from);

    let (title, message) = match scenario.scenario {
        ScenarioKind::Error => {
            let location = match (error_file(scenario, context), error_line(scenario, context)) {
                (Some(file), Some(line)) => format!(" in {file}:{line}"),
                (Some(file), None) => format!(" in {file}"),
                _ => String::new(),
            };
            (
                format!("{project} - Error"),
                primary.unwrap_or_else(|| format!("Error{location}")),
            )
        }
        ScenarioKind::Permission => (
            format!("{project} - Approval needed"),
            primary.unwrap_or_else(|| format!("{} requires approval", tool_name(context))),
        ),
        ScenarioKind::Idle => (
            format!("{project} is waiting"),
            primary.unwrap_or_else(|| "Claude needs your input".to_string()),
        ),
        ScenarioKind::Completion => (
            format!("{project} completed"),
            primary.unwrap_or_else(|| "Task finished".to_string()),
        ),
        _ => (
            project.clone(),
            primary.unwrap_or_else(|| "Waiting for input".to_string()),
        ),
    };

    DesktopNotification {
        title,
        message: truncate(&message, DESKTOP_MAX_LENGTH),
    }
}

pub fn format_markdown(
    scenario: &Scenario,
    context: &RequestContext,
    suggestion: &Suggestion,
) -> RichNotification {
    let project = if context.project.is_empty() {
        "Project"
    } else {
        context.project.as_str()
    };

    let mut details = String::new();
    match scenario.scenario {
        ScenarioKind::Error => {
            let last_error = context.last_error.as_ref();
            let kind = scenario.details.error_kind.or(last_error.map(|e| e.kind));
            let message = scenario
                .details
                .error_message
                .as_deref()
                .or(last_error.map(|e| e.message.as_str()))
                .filter(|m| !m.is_empty());

            details.push_str("\n\n**File:** ");
            details.push_str(error_file(scenario, context).unwrap_or("unknown"));
            if let Some(line) = error_line(scenario, context) {
                details.push_str(&format!(":{line}"));
            }
            if let Some(kind) = kind {
                details.push_str(&format!("\n**Error:** {kind}"));
            }
            if let Some(message) = message {
                details.push_str(&format!("\n**Message:** {message}"));
            }
        }
        ScenarioKind::Permission => {
            details.push_str(&format!("\n\n**Tool:** {}", tool_name(context)));
            let command = context
                .last_tool_use
                .as_ref()
                .and_then(|t| t.input_str("command"))
                .filter(|c| !c.is_empty());
            if let Some(command) = command {
                details.push_str(&format!("\n**Command:** `{command}`"));
            }
        }
        ScenarioKind::Idle => details.push_str("\n\nClaude is waiting for your input to continue."),
        ScenarioKind::Completion => {
            details.push_str("\n\nTask completed successfully. Ready for next task.")
        }
        _ => {}
    }

    let Condensed { primary, hints, .. } = condensed(suggestion);
    let primary = if primary.is_empty() {
        format!("{project} is waiting for you")
    } else {
        primary
    };

    let actions = if hints.is_empty() {
        String::new()
    } else {
        let bullets: Vec<String> = hints.iter().map(|h| format!("- {h}")).collect();
        format!("\n\n**Actions:**\n{}", bullets.join("\n"))
    };

    let message = format!("**{primary}**{details}{actions}");
    RichNotification {
        title: project.to_string(),
        rich_message: message.clone(),
        message,
    }
}

pub fn format_webhook(
    scenario: &Scenario,
    context: &RequestContext,
    suggestion: &Suggestion,
    clock: &dyn Clock,
) -> WebhookPayload {
    WebhookPayload {
        title: format!("{} - {}", context.project, scenario.scenario),
        message: primary(suggestion)
            .unwrap_or("Waiting for input")
            .to_string(),
        scenario: scenario.scenario,
        subtype: scenario.subtype.clone(),
        project: context.project.clone(),
        timestamp: iso_timestamp(clock.now()),
        context: WebhookContext {
            cwd: context.cwd.clone(),
            session_id: context.session_id.clone(),
            hook_event: context.hook_event_name.clone(),
            notification_type: context.notification_type.clone(),
        },
        error: context.last_error.as_ref().map(|e| WebhookError {
            kind: e.kind,
            message: e.message.clone(),
            file: e.file.clone(),
            line: e.line,
        }),
        tool_use: context.last_tool_use.as_ref().map(|t| WebhookToolUse {
            name: t.name.clone(),
            input: t.input.clone(),
        }),
        suggestions: suggestion.actions.clone(),
    }
}

/// Cap `text` at `max_chars` characters, ending in `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::hook::HookEvent;
    use crate::scenario::{detect_scenario, ScenarioDetails};
    use crate::suggestion::{default_suggestion, generate};
    use crate::transcript::{ErrorInfo, ToolUse};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap())
    }

    fn context(event: &str, notification_type: Option<&str>) -> RequestContext {
        RequestContext::from_event(HookEvent {
            session_id: Some("sess-1".into()),
            cwd: Some("/work/heyagent".into()),
            hook_event_name: Some(event.into()),
            notification_type: notification_type.map(String::from),
            ..Default::default()
        })
    }

    fn bash(command: &str) -> ToolUse {
        ToolUse {
            name: "Bash".into(),
            input: json!({"command": command}),
            id: Some("toolu_1".into()),
            timestamp: None,
        }
    }

    fn empty_suggestion(kind: ScenarioKind) -> Suggestion {
        Suggestion {
            primary: String::new(),
            actions: Vec::new(),
            scenario: kind,
            subtype: None,
        }
    }

    fn scenario(kind: ScenarioKind) -> Scenario {
        Scenario {
            scenario: kind,
            confidence: 1.0,
            subtype: None,
            details: ScenarioDetails::default(),
        }
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!(Channel::parse("slack"), Channel::Slack);
        assert_eq!(Channel::parse("Webhook"), Channel::Webhook);
        assert_eq!(Channel::parse("whatsapp"), Channel::Desktop);
        assert_eq!("email".parse::<Channel>().unwrap(), Channel::Email);
        let channel: Channel = serde_json::from_str("\"pager\"").unwrap();
        assert_eq!(channel, Channel::Desktop);
    }

    #[test]
    fn test_desktop_permission_bash() {
        let mut ctx = context("Notification", Some("permission_prompt"));
        ctx.message = Some("needs permission".into());
        ctx.last_tool_use = Some(bash("ls"));
        let scenario = detect_scenario(&ctx);
        let suggestion = generate(&scenario, &ctx);

        let payload = format(Channel::Desktop, &scenario, &ctx, &suggestion, &clock());
        assert_eq!(
            payload,
            NotificationPayload::Desktop(DesktopNotification {
                title: "heyagent - Approval needed".into(),
                message: "Bash command requires approval".into(),
            })
        );
    }

    #[test]
    fn test_desktop_fallback_phrases() {
        let ctx = context("Stop", None);
        let cases = [
            (ScenarioKind::Permission, "heyagent - Approval needed", "Action requires approval"),
            (ScenarioKind::Idle, "heyagent is waiting", "Claude needs your input"),
            (ScenarioKind::Completion, "heyagent completed", "Task finished"),
            (ScenarioKind::Question, "heyagent", "Waiting for input"),
            (ScenarioKind::Working, "heyagent", "Waiting for input"),
            (ScenarioKind::Error, "heyagent - Error", "Error"),
        ];
        for (kind, title, message) in cases {
            let n = format_desktop(&scenario(kind), &ctx, &empty_suggestion(kind));
            assert_eq!((n.title.as_str(), n.message.as_str()), (title, message), "{kind}");
        }
    }

    #[test]
    fn test_desktop_error_location_fallback() {
        let mut ctx = context("Stop", None);
        ctx.last_error = Some(ErrorInfo {
            kind: ErrorKind::SyntaxError,
            message: "bad".into(),
            file: Some("a.ts".into()),
            line: Some(4),
            raw: String::new(),
        });
        let n = format_desktop(
            &scenario(ScenarioKind::Error),
            &ctx,
            &empty_suggestion(ScenarioKind::Error),
        );
        assert_eq!(n.message, "Error in a.ts:4");
    }

    #[test]
    fn test_truncation_law() {
        let long = "é".repeat(250);
        let cut = truncate(&long, DESKTOP_MAX_LENGTH);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with("..."));

        let exact = "a".repeat(200);
        assert_eq!(truncate(&exact, DESKTOP_MAX_LENGTH), exact);
        assert_eq!(truncate("short", DESKTOP_MAX_LENGTH), "short");
    }

    #[test]
    fn test_desktop_truncates_long_primary() {
        let ctx = context("Notification", Some("idle_prompt"));
        let mut suggestion = empty_suggestion(ScenarioKind::Idle);
        suggestion.primary = "x".repeat(500);
        let n = format_desktop(&scenario(ScenarioKind::Idle), &ctx, &suggestion);
        assert_eq!(n.message.chars().count(), 200);
    }

    #[test]
    fn test_markdown_error() {
        let mut ctx = context("Stop", None);
        ctx.last_error = Some(ErrorInfo {
            kind: ErrorKind::TypeError,
            message: "x is undefined".into(),
            file: None,
            line: None,
            raw: "TypeError: x is undefined\n    at src/app.js:12:4".into(),
        });
        let scenario = detect_scenario(&ctx);
        let suggestion = generate(&scenario, &ctx);

        let n = format_markdown(&scenario, &ctx, &suggestion);
        assert_eq!(n.title, "heyagent");
        assert_eq!(
            n.message,
            "**Type error: x is undefined**\n\n**File:** src/app.js:12\n**Error:** TypeError\n\
             **Message:** x is undefined\n\n**Actions:**\n- Review type definitions\n- Open src/app.js"
        );
        assert_eq!(n.message, n.rich_message);
    }

    #[test]
    fn test_markdown_permission_with_command() {
        let mut ctx = context("Notification", Some("permission_prompt"));
        ctx.last_tool_use = Some(bash("rm -rf dist"));
        let scenario = detect_scenario(&ctx);
        let suggestion = generate(&scenario, &ctx);

        let n = format_markdown(&scenario, &ctx, &suggestion);
        assert!(n.message.starts_with("**Bash command requires approval**"));
        assert!(n.message.contains("**Tool:** Bash\n**Command:** `rm -rf dist`"));
        assert!(n.message.ends_with("- Command: rm -rf dist\n- Allow execution"));
    }

    #[test]
    fn test_markdown_unknown_without_actions() {
        let ctx = context("Stop", None);
        let n = format_markdown(
            &scenario(ScenarioKind::Unknown),
            &ctx,
            &empty_suggestion(ScenarioKind::Unknown),
        );
        assert_eq!(n.message, "**heyagent is waiting for you**");
    }

    #[test]
    fn test_markdown_lists_two_nonempty_hints() {
        let ctx = context("Notification", Some("idle_prompt"));
        let mut suggestion = empty_suggestion(ScenarioKind::Idle);
        suggestion.primary = "Claude is waiting".into();
        suggestion.actions = ["", "Answer the question", "Check terminal", "Ignore"]
            .into_iter()
            .map(|hint| SuggestedAction {
                label: "Act".into(),
                hint: hint.into(),
            })
            .collect();

        let rich = format_markdown(&scenario(ScenarioKind::Idle), &ctx, &suggestion);
        assert!(rich
            .message
            .ends_with("**Actions:**\n- Answer the question\n- Check terminal"));
        assert!(rich.message.starts_with("**Claude is waiting**"));
    }

    #[test]
    fn test_markdown_idle_and_completion_sentences() {
        let ctx = context("Notification", Some("idle_prompt"));
        let suggestion = default_suggestion(&ctx);
        let idle = format_markdown(&scenario(ScenarioKind::Idle), &ctx, &suggestion);
        assert!(idle.message.contains("\n\nClaude is waiting for your input to continue."));
        let done = format_markdown(&scenario(ScenarioKind::Completion), &ctx, &suggestion);
        assert!(done.message.contains("Task completed successfully. Ready for next task."));
    }

    #[test]
    fn test_webhook_shape() {
        let mut ctx = context("Notification", Some("permission_prompt"));
        ctx.last_tool_use = Some(bash("ls"));
        let scenario = detect_scenario(&ctx);
        let suggestion = generate(&scenario, &ctx);

        let payload = format_webhook(&scenario, &ctx, &suggestion, &clock());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "heyagent - permission",
                "message": "Bash command requires approval",
                "scenario": "permission",
                "subtype": "Bash",
                "project": "heyagent",
                "timestamp": "2025-03-14T09:26:53.000Z",
                "context": {
                    "cwd": "/work/heyagent",
                    "sessionId": "sess-1",
                    "hookEvent": "Notification",
                    "notificationType": "permission_prompt"
                },
                "error": null,
                "toolUse": {"name": "Bash", "input": {"command": "ls"}},
                "suggestions": [
                    {"label": "Review", "hint": "Command: ls"},
                    {"label": "Approve", "hint": "Allow execution"}
                ]
            })
        );
    }

    #[test]
    fn test_webhook_error_object() {
        let mut ctx = context("Stop", None);
        ctx.last_error = Some(ErrorInfo {
            kind: ErrorKind::Generic,
            message: "exit 1".into(),
            file: None,
            line: None,
            raw: "exit 1".into(),
        });
        let scenario = detect_scenario(&ctx);
        let payload = format_webhook(&scenario, &ctx, &generate(&scenario, &ctx), &clock());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["error"],
            json!({"type": "Error", "message": "exit 1", "file": null, "line": null})
        );
        assert_eq!(value["toolUse"], Value::Null);
    }

    #[test]
    fn test_format_is_idempotent() {
        let mut ctx = context("Notification", Some("permission_prompt"));
        ctx.last_tool_use = Some(bash("ls"));
        let scenario = detect_scenario(&ctx);
        let suggestion = generate(&scenario, &ctx);

        for channel in [Channel::Desktop, Channel::Slack, Channel::Webhook] {
            let a = serde_json::to_string(&format(channel, &scenario, &ctx, &suggestion, &clock())).unwrap();
            let b = serde_json::to_string(&format(channel, &scenario, &ctx, &suggestion, &clock())).unwrap();
            assert_eq!(a, b);
        }
    }
}
