//! Suggestion generation: pick a template for the scenario and fill in
//! its placeholders from the request context.

pub mod templates;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::context::RequestContext;
use crate::scenario::{Scenario, ScenarioKind};

pub use templates::{lookup, ActionTemplate, SuggestionTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedAction {
    pub label: String,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub primary: String,
    pub actions: Vec<SuggestedAction>,
    pub scenario: ScenarioKind,
    pub subtype: Option<String>,
}

/// Primary message plus at most two action hints, for space-constrained
/// channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condensed {
    pub primary: String,
    pub hints: Vec<String>,
    pub scenario: ScenarioKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder in {0:?}")]
    Unterminated(String),
    #[error("invalid placeholder {{{0}}}")]
    InvalidPlaceholder(String),
}

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z_$][\w$]*)\s+is\s+not\s+defined").unwrap());
static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Cannot find module ['"](.+?)['"]"#).unwrap());

/// Values available to templates. Absent values render as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub project: String,
    pub file: String,
    pub line: String,
    pub error: String,
    pub message: String,
    pub symbol: String,
    pub module: String,
    pub command: String,
    pub url: String,
    pub tool: String,
}

impl TemplateVars {
    pub fn from_context(scenario: &Scenario, context: &RequestContext) -> Self {
        let details = &scenario.details;
        let last_error = context.last_error.as_ref();
        let tool = context.last_tool_use.as_ref();

        let message = details
            .error_message
            .clone()
            .or_else(|| last_error.map(|e| e.message.clone()))
            .unwrap_or_default();

        // The detected message may already be reduced to a bare name, so the
        // stored message and raw text are searched too.
        let sources = [
            Some(message.as_str()),
            last_error.map(|e| e.message.as_str()),
            last_error.map(|e| e.raw.as_str()),
        ];

        Self {
            project: if context.project.is_empty() {
                "project".to_string()
            } else {
                context.project.clone()
            },
            file: details
                .file
                .clone()
                .or_else(|| last_error.and_then(|e| e.file.clone()))
                .or_else(|| tool.and_then(|t| t.input_str("file_path")).map(String::from))
                .unwrap_or_default(),
            line: details
                .line
                .or_else(|| last_error.and_then(|e| e.line))
                .map(|line| line.to_string())
                .unwrap_or_default(),
            error: details
                .error_kind
                .or_else(|| last_error.map(|e| e.kind))
                .map(|kind| kind.to_string())
                .unwrap_or_default(),
            symbol: first_capture(&SYMBOL_RE, &sources),
            module: first_capture(&MODULE_RE, &sources),
            message,
            command: tool
                .and_then(|t| t.input_str("command"))
                .unwrap_or_default()
                .to_string(),
            url: tool
                .and_then(|t| t.input_str("url"))
                .unwrap_or_default()
                .to_string(),
            tool: tool.map(|t| t.name.clone()).unwrap_or_default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "project" => &self.project,
            "file" => &self.file,
            "line" => &self.line,
            "error" => &self.error,
            "message" => &self.message,
            "symbol" => &self.symbol,
            "module" => &self.module,
            "command" => &self.command,
            "url" => &self.url,
            "tool" => &self.tool,
            _ => return None,
        };
        Some(value)
    }
}

fn first_capture(regex: &Regex, sources: &[Option<&str>]) -> String {
    sources
        .iter()
        .flatten()
        .find_map(|text| regex.captures(text).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Replace every `{name}` in `pattern`. Unknown names render as empty text,
/// so no placeholder survives into the output.
pub fn render(pattern: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TemplateError::Unterminated(pattern.to_string()))?;
        let name = &after[..close];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TemplateError::InvalidPlaceholder(name.to_string()));
        }
        out.push_str(vars.get(name).unwrap_or_default());
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn try_generate(scenario: &Scenario, context: &RequestContext) -> Result<Suggestion, TemplateError> {
    let template = lookup(scenario.scenario, scenario.subtype.as_deref());
    let vars = TemplateVars::from_context(scenario, context);

    let actions = template
        .actions
        .iter()
        .map(|action| {
            Ok(SuggestedAction {
                label: action.label.to_string(),
                hint: render(action.hint, &vars)?,
            })
        })
        .collect::<Result<Vec<_>, TemplateError>>()?;

    Ok(Suggestion {
        primary: render(template.primary, &vars)?,
        actions,
        scenario: scenario.scenario,
        subtype: scenario.subtype.clone(),
    })
}

/// Suggestion for `scenario`. Never fails: a template that can't be
/// rendered yields [`default_suggestion`].
pub fn generate(scenario: &Scenario, context: &RequestContext) -> Suggestion {
    try_generate(scenario, context).unwrap_or_else(|e| {
        tracing::error!("error generating suggestion: {e}");
        default_suggestion(context)
    })
}

pub fn default_suggestion(context: &RequestContext) -> Suggestion {
    let project = if context.project.is_empty() {
        "Project"
    } else {
        context.project.as_str()
    };

    Suggestion {
        primary: format!("{project} is waiting for you"),
        actions: vec![
            SuggestedAction {
                label: "Check terminal".into(),
                hint: "Review status".into(),
            },
            SuggestedAction {
                label: "Respond".into(),
                hint: "Provide input".into(),
            },
        ],
        scenario: ScenarioKind::Unknown,
        subtype: None,
    }
}

pub fn condensed(suggestion: &Suggestion) -> Condensed {
    Condensed {
        primary: suggestion.primary.clone(),
        hints: suggestion
            .actions
            .iter()
            .map(|a| a.hint.clone())
            .filter(|h| !h.is_empty())
            .take(2)
            .collect(),
        scenario: suggestion.scenario,
    }
}
