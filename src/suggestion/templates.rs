//! Suggestion templates keyed by (scenario, subtype).
//!
//! Lookup falls back from the exact subtype to the scenario default, and
//! from there to [`GLOBAL_DEFAULT`] for scenarios without templates.

use crate::scenario::ScenarioKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTemplate {
    pub label: &'static str,
    pub hint: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionTemplate {
    pub primary: &'static str,
    pub actions: &'static [ActionTemplate],
}

struct TemplateEntry {
    scenario: ScenarioKind,
    /// `None` is the scenario default.
    subtype: Option<&'static str>,
    template: SuggestionTemplate,
}

macro_rules! action {
    ($label:literal, $hint:literal) => {
        ActionTemplate {
            label: $label,
            hint: $hint,
        }
    };
}

const fn entry(
    scenario: ScenarioKind,
    subtype: Option<&'static str>,
    primary: &'static str,
    actions: &'static [ActionTemplate],
) -> TemplateEntry {
    TemplateEntry {
        scenario,
        subtype,
        template: SuggestionTemplate { primary, actions },
    }
}

const QUESTION: SuggestionTemplate = SuggestionTemplate {
    primary: "{project} needs input",
    actions: &[
        action!("Respond", "Answer question"),
        action!("Check terminal", "Review details"),
    ],
};

/// Used for scenarios with no templates of their own (`working`, `unknown`).
pub static GLOBAL_DEFAULT: SuggestionTemplate = QUESTION;

use ScenarioKind::{Completion, Error, Idle, Permission, Question};

static TEMPLATES: &[TemplateEntry] = &[
    entry(
        Error,
        Some("SyntaxError"),
        "Fix syntax error in {file}:{line}",
        &[action!("View file", "Open {file}"), action!("Check syntax", "Review line {line}")],
    ),
    entry(
        Error,
        Some("TypeError"),
        "Type error: {message}",
        &[action!("Check types", "Review type definitions"), action!("View file", "Open {file}")],
    ),
    entry(
        Error,
        Some("ReferenceError"),
        "Undefined reference: {symbol}",
        &[action!("Check imports", "Verify imports"), action!("View file", "Open {file}")],
    ),
    entry(
        Error,
        Some("ImportError"),
        "Missing module: {module}",
        &[action!("Install", "npm install {module}"), action!("Check deps", "Review package.json")],
    ),
    entry(
        Error,
        Some("PermissionError"),
        "Permission denied for {file}",
        &[action!("Check permissions", "Verify file access"), action!("View file", "Open {file}")],
    ),
    entry(
        Error,
        Some("FileNotFoundError"),
        "File not found: {file}",
        &[action!("Create file", "Create missing file"), action!("Check path", "Verify file path")],
    ),
    entry(
        Error,
        Some("TestFailure"),
        "Test failed in {project}",
        &[action!("Run tests", "npm test"), action!("View logs", "Check test output")],
    ),
    entry(
        Error,
        None,
        "Error in {project}",
        &[action!("Check logs", "Review terminal output"), action!("View file", "Open {file}")],
    ),
    entry(
        Permission,
        Some("Bash"),
        "Bash command requires approval",
        &[action!("Review", "Command: {command}"), action!("Approve", "Allow execution")],
    ),
    entry(
        Permission,
        Some("Write"),
        "Writing to {file}",
        &[action!("Check path", "File: {file}"), action!("Review", "Check content")],
    ),
    entry(
        Permission,
        Some("Edit"),
        "Editing {file}",
        &[action!("View changes", "Review modifications"), action!("Approve", "Allow edit")],
    ),
    entry(Permission, Some("Read"), "Reading {file}", &[action!("View", "Open file")]),
    entry(
        Permission,
        Some("WebFetch"),
        "Fetching: {url}",
        &[action!("Review", "Check URL"), action!("Approve", "Allow fetch")],
    ),
    entry(
        Permission,
        Some("WebSearch"),
        "Searching web",
        &[action!("Review", "Check query"), action!("Approve", "Allow search")],
    ),
    entry(
        Permission,
        None,
        "Action requires approval",
        &[action!("Check terminal", "Review pending action"), action!("Approve", "Allow action")],
    ),
    entry(
        Idle,
        None,
        "{project} is waiting for you",
        &[action!("Respond", "Provide next instruction"), action!("Continue", "Resume session")],
    ),
    entry(
        Completion,
        None,
        "{project} completed",
        &[action!("Continue", "Provide next task"), action!("Review", "Check results")],
    ),
    TemplateEntry {
        scenario: Question,
        subtype: None,
        template: QUESTION,
    },
];

pub fn lookup(scenario: ScenarioKind, subtype: Option<&str>) -> &'static SuggestionTemplate {
    let exact = subtype.and_then(|subtype| {
        TEMPLATES
            .iter()
            .find(|e| e.scenario == scenario && e.subtype == Some(subtype))
    });
    exact
        .or_else(|| {
            TEMPLATES
                .iter()
                .find(|e| e.scenario == scenario && e.subtype.is_none())
        })
        .map(|e| &e.template)
        .unwrap_or(&GLOBAL_DEFAULT)
}

#[cfg(test)]
pub(crate) fn all() -> impl Iterator<Item = &'static SuggestionTemplate> {
    TEMPLATES
        .iter()
        .map(|e| &e.template)
        .chain(std::iter::once(&GLOBAL_DEFAULT))
}
