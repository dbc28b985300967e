//! Scenario detection.
//!
//! Maps a [`RequestContext`] to the situation the user is notified about.
//! Notification types are authoritative (confidence 1.0); Stop events are
//! classified from the transcript; anything else is `unknown`. A concrete
//! error found in the transcript then escalates any non-error result.

use std::fmt;

use serde::Serialize;

use crate::context::RequestContext;
use crate::patterns::{detect_error_type, extract_file_location, ErrorKind};
use crate::transcript::ErrorInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Error,
    Permission,
    Idle,
    Completion,
    Question,
    Unknown,
    Working,
}

impl ScenarioKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Permission => "permission",
            Self::Idle => "idle",
            Self::Completion => "completion",
            Self::Question => "question",
            Self::Unknown => "unknown",
            Self::Working => "working",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts extracted while classifying, used for template substitution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioDetails {
    pub notification_type: Option<String>,
    pub message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub scenario: ScenarioKind,
    pub confidence: f64,
    pub subtype: Option<String>,
    pub details: ScenarioDetails,
}

impl Scenario {
    fn new(scenario: ScenarioKind, confidence: f64, subtype: Option<String>) -> Self {
        Self {
            scenario,
            confidence,
            subtype,
            details: ScenarioDetails::default(),
        }
    }
}

/// Fixed mapping of notification types; unrecognized types are questions.
pub fn scenario_for_notification_type(notification_type: &str) -> ScenarioKind {
    match notification_type {
        "permission_prompt" => ScenarioKind::Permission,
        "idle_prompt" => ScenarioKind::Idle,
        "auth_success" => ScenarioKind::Completion,
        "elicitation_dialog" => ScenarioKind::Question,
        _ => ScenarioKind::Question,
    }
}

pub fn detect_scenario(context: &RequestContext) -> Scenario {
    let result = if let Some(notification_type) = context.notification_type.as_deref() {
        from_notification_type(context, notification_type)
    } else if context.hook_event_name == "Stop" {
        classify_stop(context)
    } else {
        Scenario::new(ScenarioKind::Unknown, 0.5, None)
    };

    let result = match &context.last_error {
        Some(error) => escalate_error(result, error),
        None => result,
    };

    tracing::info!(
        "detected scenario: {}, subtype: {}",
        result.scenario,
        result.subtype.as_deref().unwrap_or("none")
    );
    result
}

fn from_notification_type(context: &RequestContext, notification_type: &str) -> Scenario {
    let kind = scenario_for_notification_type(notification_type);
    let subtype = match (&context.last_tool_use, kind) {
        (Some(tool), ScenarioKind::Permission) if !tool.name.is_empty() => Some(tool.name.clone()),
        _ => None,
    };

    Scenario {
        details: ScenarioDetails {
            notification_type: Some(notification_type.to_string()),
            message: context.message.clone(),
            ..Default::default()
        },
        ..Scenario::new(kind, 1.0, subtype)
    }
}

fn classify_stop(context: &RequestContext) -> Scenario {
    if let Some(error) = &context.last_error {
        let detected = detect_error_type(&error.raw);
        let location = extract_file_location(&error.raw);

        return Scenario {
            details: ScenarioDetails {
                error_kind: Some(detected.kind),
                error_message: Some(detected.message),
                file: location.file.or_else(|| error.file.clone()),
                line: location.line.or(error.line),
                ..Default::default()
            },
            ..Scenario::new(ScenarioKind::Error, 0.9, Some(detected.kind.to_string()))
        };
    }

    if context.stop_hook_active {
        return Scenario {
            details: ScenarioDetails {
                message: Some("Claude is continuing work".to_string()),
                ..Default::default()
            },
            ..Scenario::new(ScenarioKind::Working, 0.8, Some("continued".to_string()))
        };
    }

    Scenario {
        details: ScenarioDetails {
            message: Some("Task completed".to_string()),
            ..Default::default()
        },
        ..Scenario::new(ScenarioKind::Completion, 0.7, Some("normal".to_string()))
    }
}

// A lingering error from an earlier turn still escalates here; there is no
// timestamp check against the event.
fn escalate_error(result: Scenario, error: &ErrorInfo) -> Scenario {
    if result.scenario == ScenarioKind::Error || error.kind.is_generic() {
        return result;
    }

    Scenario {
        scenario: ScenarioKind::Error,
        confidence: result.confidence.max(0.8),
        subtype: Some(error.kind.to_string()),
        details: ScenarioDetails {
            error_kind: Some(error.kind),
            error_message: Some(error.message.clone()),
            file: error.file.clone(),
            line: error.line,
            ..result.details
        },
    }
}

pub fn is_permission_prompt(context: &RequestContext) -> bool {
    context.notification_type.as_deref() == Some("permission_prompt")
}

pub fn is_idle_prompt(context: &RequestContext) -> bool {
    context.notification_type.as_deref() == Some("idle_prompt")
}

/// A transcript error only counts when no notification type is present.
pub fn is_error(context: &RequestContext) -> bool {
    context.notification_type.is_none() && context.last_error.is_some()
}

pub fn is_completion(context: &RequestContext) -> bool {
    context.notification_type.as_deref() == Some("auth_success")
        || (context.hook_event_name == "Stop" && context.last_error.is_none())
}
