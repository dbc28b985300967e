//! End-to-end processing of one hook event: parse, build context, detect
//! the scenario, pick a suggestion and render it for a channel.

use crate::clock::{Clock, SystemClock};
use crate::context::{build_context, project_name, RequestContext};
use crate::error::Result;
use crate::format::{format, Channel, NotificationPayload};
use crate::hook::parse_hook_event;
use crate::scenario::{detect_scenario, Scenario};
use crate::suggestion::{generate, Suggestion};
use crate::transcript::MAX_TRANSCRIPT_LINES;

/// Everything produced for one handled event.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub context: RequestContext,
    pub scenario: Scenario,
    pub suggestion: Suggestion,
    pub payload: NotificationPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The event is missing a name or names a hook the notifier doesn't
    /// react to.
    Ignored { event_name: Option<String> },
    Rendered(Box<Rendered>),
}

pub struct Pipeline<C = SystemClock> {
    channel: Channel,
    transcript_lines: usize,
    clock: C,
}

impl<C: Clock> Pipeline<C> {
    pub fn with_clock(channel: Channel, clock: C) -> Self {
        Self {
            channel,
            transcript_lines: MAX_TRANSCRIPT_LINES,
            clock,
        }
    }

    pub fn transcript_lines(mut self, lines: usize) -> Self {
        self.transcript_lines = lines.max(1);
        self
    }

    /// Process a raw stdin payload.
    ///
    /// Only a payload that isn't a JSON object is an error. Anything but a
    /// `Stop` or `Notification` event, including one without a name, is
    /// ignored.
    pub async fn process(&self, input: &str) -> Result<Outcome> {
        let event = parse_hook_event(input)?;

        if event.handled_event().is_none() {
            tracing::debug!(
                "ignoring {} event",
                event.hook_event_name.as_deref().unwrap_or("unnamed")
            );
            return Ok(Outcome::Ignored {
                event_name: event.hook_event_name,
            });
        }

        let context = build_context(event, self.transcript_lines).await;
        Ok(Outcome::Rendered(Box::new(self.render(context))))
    }

    /// Run the synchronous stages on an already built context.
    pub fn render(&self, context: RequestContext) -> Rendered {
        let scenario = detect_scenario(&context);
        let suggestion = generate(&scenario, &context);
        let payload = format(self.channel, &scenario, &context, &suggestion, &self.clock);

        Rendered {
            context,
            scenario,
            suggestion,
            payload,
        }
    }
}

/// Static title and message used when the pipeline or its delivery fails.
pub fn fallback_notification(
    event_name: Option<&str>,
    cwd: Option<&str>,
    message: Option<&str>,
) -> (String, String) {
    let project = project_name(cwd.unwrap_or_default());
    let title = format!("{project} is waiting for you");
    let body = match event_name {
        Some("Stop") => format!("{project} done"),
        _ => message
            .filter(|m| !m.is_empty())
            .unwrap_or("Claude needs your attention")
            .to_string(),
    };
    (title, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::scenario::ScenarioKind;
    use chrono::TimeZone;
    use chrono::Utc;

    fn pipeline(channel: Channel) -> Pipeline<FixedClock> {
        Pipeline::with_clock(
            channel,
            FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        )
    }

    fn rendered(outcome: Outcome) -> Rendered {
        match outcome {
            Outcome::Rendered(r) => *r,
            other => panic!("expected rendered outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_idle_notification() {
        let outcome = pipeline(Channel::Desktop)
            .process(r#"{"hook_event_name":"Notification","notification_type":"idle_prompt","cwd":"/work/api"}"#)
            .await
            .unwrap();
        let r = rendered(outcome);
        assert_eq!(r.scenario.scenario, ScenarioKind::Idle);
        assert_eq!(r.scenario.confidence, 1.0);
        assert_eq!(r.context.project, "api");
        assert!(matches!(r.payload, NotificationPayload::Desktop(_)));
    }

    #[tokio::test]
    async fn test_other_events_ignored() {
        let outcome = pipeline(Channel::Desktop)
            .process(r#"{"hook_event_name":"PreToolUse","cwd":"/work/api"}"#)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Ignored {
                event_name: Some("PreToolUse".into())
            }
        );
    }

    #[tokio::test]
    async fn test_missing_event_name_ignored() {
        for input in ["{}", r#"{"cwd":"/work/api"}"#, r#"{"hook_event_name":""}"#] {
            let outcome = pipeline(Channel::Webhook).process(input).await.unwrap();
            assert!(matches!(outcome, Outcome::Ignored { .. }), "{input}");
        }
        let outcome = pipeline(Channel::Webhook).process("{}").await.unwrap();
        assert_eq!(outcome, Outcome::Ignored { event_name: None });
    }

    #[tokio::test]
    async fn test_mistyped_fields_still_render() {
        let r = rendered(
            pipeline(Channel::Desktop)
                .process(r#"{"hook_event_name":"Stop","cwd":"/work/api","session_id":12345}"#)
                .await
                .unwrap(),
        );
        assert_eq!(r.scenario.scenario, ScenarioKind::Completion);
        assert_eq!(r.context.session_id.as_deref(), Some("12345"));

        let r = rendered(
            pipeline(Channel::Desktop)
                .process(r#"{"hook_event_name":"Stop","cwd":"/work/api","stop_hook_active":"true"}"#)
                .await
                .unwrap(),
        );
        assert_eq!(r.scenario.scenario, ScenarioKind::Working);
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        assert!(pipeline(Channel::Desktop).process("[1, 2]").await.is_err());
        assert!(pipeline(Channel::Desktop).process("not json").await.is_err());
    }

    #[test]
    fn test_fallback_notification() {
        assert_eq!(
            fallback_notification(Some("Stop"), Some("/work/api"), Some("ignored")),
            ("api is waiting for you".to_string(), "api done".to_string())
        );
        assert_eq!(
            fallback_notification(Some("Notification"), Some("/work/api"), Some("Need approval")),
            ("api is waiting for you".to_string(), "Need approval".to_string())
        );
        assert_eq!(
            fallback_notification(None, None, Some("")),
            (
                "unknown is waiting for you".to_string(),
                "Claude needs your attention".to_string()
            )
        );
    }
}
