//! Hook event wire format.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{NotifyError, Result};
use crate::lenient;

/// Input received from Claude Code via stdin.
///
/// Every field is optional on the wire; missing values are filled in by the
/// context builder. A field of the wrong type is treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookEvent {
    #[serde(default, deserialize_with = "lenient::string")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub transcript_path: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub permission_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub hook_event_name: Option<String>,
    /// Only present for Notification: `permission_prompt`, `idle_prompt`,
    /// `auth_success` or `elicitation_dialog`.
    #[serde(default, deserialize_with = "lenient::string")]
    pub notification_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: Option<String>,
    /// Set when the assistant keeps working after a Stop hook blocked it.
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub stop_hook_active: Option<bool>,
}

/// Hook events the notifier reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEventName {
    Stop,
    Notification,
}

impl HookEventName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Stop" => Some(Self::Stop),
            "Notification" => Some(Self::Notification),
            _ => None,
        }
    }
}

impl HookEvent {
    /// The event name when it is one the notifier handles.
    pub fn handled_event(&self) -> Option<HookEventName> {
        self.hook_event_name.as_deref().and_then(HookEventName::parse)
    }
}

/// Parse the raw stdin payload. Only a payload that isn't a JSON object is
/// rejected; everything inside the object is optional and loosely typed.
pub fn parse_hook_event(input: &str) -> Result<HookEvent> {
    let value: Value = serde_json::from_str(input.trim())?;
    if !value.is_object() {
        return Err(NotifyError::InvalidPayload(format!(
            "expected a JSON object, got {}",
            json_type_name(&value)
        )));
    }
    Ok(serde_json::from_value(value)?)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let event = parse_hook_event(
            r#"{
                "session_id": "abc",
                "transcript_path": "~/.claude/projects/x/abc.jsonl",
                "cwd": "/home/dev/heyagent",
                "hook_event_name": "Notification",
                "notification_type": "permission_prompt",
                "message": "Claude needs your permission to use Bash"
            }"#,
        )
        .unwrap();
        assert_eq!(event.session_id.as_deref(), Some("abc"));
        assert_eq!(event.handled_event(), Some(HookEventName::Notification));
        assert_eq!(event.notification_type.as_deref(), Some("permission_prompt"));
        assert_eq!(event.stop_hook_active, None);
    }

    #[test]
    fn test_parse_empty_object() {
        let event = parse_hook_event("{}\n").unwrap();
        assert_eq!(event, HookEvent::default());
        assert_eq!(event.handled_event(), None);
    }

    #[test]
    fn test_other_events_are_not_handled() {
        let event = parse_hook_event(r#"{"hook_event_name": "PreToolUse"}"#).unwrap();
        assert_eq!(event.handled_event(), None);
    }

    #[test]
    fn test_wrong_field_types_degrade() {
        let event = parse_hook_event(
            r#"{"hook_event_name": "Stop", "session_id": 12345, "stop_hook_active": "true", "message": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(event.handled_event(), Some(HookEventName::Stop));
        assert_eq!(event.session_id.as_deref(), Some("12345"));
        assert_eq!(event.stop_hook_active, Some(true));
        assert_eq!(event.message, None);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = parse_hook_event("[1, 2]").unwrap_err();
        assert!(matches!(err, NotifyError::InvalidPayload(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_unparsable_is_rejected() {
        let err = parse_hook_event("{not json").unwrap_err();
        assert!(matches!(err, NotifyError::Json(_)));
    }
}
