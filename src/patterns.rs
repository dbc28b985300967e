//! Error pattern matching.
//!
//! Raw tool output is classified by an ordered table of regex rules. The
//! first rule that matches wins, so the table order is part of the contract:
//! overlapping texts (an `EACCES` line that also mentions `ENOENT`, say)
//! always resolve to the earlier rule.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Longest message kept when no rule matches and the first line is used.
pub const MAX_MESSAGE_CHARS: usize = 200;

/// Kind of error recognised in tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    SyntaxError,
    TypeError,
    ReferenceError,
    ImportError,
    PermissionError,
    FileNotFoundError,
    TestFailure,
    LinterError,
    NetworkError,
    /// Fallback when nothing more specific matched.
    #[serde(rename = "Error")]
    Generic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::TypeError => "TypeError",
            Self::ReferenceError => "ReferenceError",
            Self::ImportError => "ImportError",
            Self::PermissionError => "PermissionError",
            Self::FileNotFoundError => "FileNotFoundError",
            Self::TestFailure => "TestFailure",
            Self::LinterError => "LinterError",
            Self::NetworkError => "NetworkError",
            Self::Generic => "Error",
        }
    }

    pub fn is_generic(self) -> bool {
        self == Self::Generic
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`detect_error_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMatch {
    pub kind: ErrorKind,
    pub message: String,
    /// Full text matched by the winning rule, `None` for the fallback.
    pub raw_match: Option<String>,
}

/// Source location pulled out of error output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
}

struct ErrorRule {
    key: &'static str,
    kind: ErrorKind,
    regex: Regex,
    /// Capture groups tried in order for the message; the whole match is
    /// used when none of them participated.
    message_groups: &'static [usize],
}

static ERROR_RULES: LazyLock<Vec<ErrorRule>> = LazyLock::new(|| {
    let rule = |key: &'static str,
                kind: ErrorKind,
                pattern: &str,
                message_groups: &'static [usize]| ErrorRule {
        key,
        kind,
        regex: Regex::new(pattern).unwrap(),
        message_groups,
    };

    vec![
        rule("syntaxError", ErrorKind::SyntaxError, r"(?i)SyntaxError:\s*(.+)", &[1]),
        rule("typeError", ErrorKind::TypeError, r"(?i)TypeError:\s*(.+)", &[1]),
        rule(
            "referenceError",
            ErrorKind::ReferenceError,
            r"(?i)ReferenceError:\s*(\S+)\s+is\s+not\s+defined",
            &[1],
        ),
        rule(
            "importError",
            ErrorKind::ImportError,
            r#"(?i)Cannot find module ['"](.+)['"]|Cannot resolve module ['"](.+)['"]"#,
            &[1, 2],
        ),
        rule(
            "permissionError",
            ErrorKind::PermissionError,
            r"(?i)EACCES|EPERM|Permission denied",
            &[],
        ),
        rule(
            "fileNotFound",
            ErrorKind::FileNotFoundError,
            r#"(?i)ENOENT.*?['"](.+?)['"]|no such file or directory.*?['"](.+?)['"]"#,
            &[1],
        ),
        rule(
            "testFailure",
            ErrorKind::TestFailure,
            r"(?i)FAIL:\s*|Test failed|failing tests",
            &[],
        ),
        rule("linterError", ErrorKind::LinterError, r"(?i)eslint.*error|linting error", &[]),
        rule(
            "networkError",
            ErrorKind::NetworkError,
            r"(?i)ECONNREFUSED|ETIMEDOUT|Network error",
            &[],
        ),
    ]
});

static LOCATION_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // at src/app.js:42:10
        Regex::new(r"at\s+([^\s:]+):(\d+):\d+").unwrap(),
        // src/app.ts:42
        Regex::new(r"([/\w\-+.]+[.](js|ts|jsx|tsx|py|go|rs)):(\d+)").unwrap(),
        // in app.py line 42
        Regex::new(r"(?i)in\s+([^\s:]+)\s+line\s+(\d+)").unwrap(),
    ]
});

/// Classify `text` with the first matching rule of the error table.
pub fn detect_error_type(text: &str) -> ErrorMatch {
    if text.is_empty() {
        return ErrorMatch {
            kind: ErrorKind::Generic,
            message: "Unknown error".to_string(),
            raw_match: None,
        };
    }

    for rule in ERROR_RULES.iter() {
        let Some(caps) = rule.regex.captures(text) else {
            continue;
        };
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let message = rule
            .message_groups
            .iter()
            .find_map(|&group| caps.get(group))
            .map(|m| m.as_str())
            .unwrap_or(whole);

        return ErrorMatch {
            kind: rule.kind,
            message: message.trim().to_string(),
            raw_match: Some(whole.to_string()),
        };
    }

    ErrorMatch {
        kind: ErrorKind::Generic,
        message: first_line(text, MAX_MESSAGE_CHARS),
        raw_match: None,
    }
}

/// Find a `file:line` reference in error output. The three location
/// shapes are tried in order; the line is `None` when it doesn't parse.
pub fn extract_file_location(text: &str) -> FileLocation {
    for pattern in LOCATION_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let file = caps.get(1).map(|m| m.as_str().to_string());
            let line = caps
                .get(caps.len() - 1)
                .and_then(|m| m.as_str().parse::<u32>().ok());
            return FileLocation { file, line };
        }
    }
    FileLocation::default()
}

/// Test a single named rule (e.g. `"permissionError"`) against `text`.
/// Unknown rule keys never match.
pub fn matches_error_pattern(text: &str, key: &str) -> bool {
    ERROR_RULES
        .iter()
        .find(|rule| rule.key == key)
        .is_some_and(|rule| rule.regex.is_match(text))
}

/// Rule keys in evaluation order.
pub fn all_error_types() -> Vec<&'static str> {
    ERROR_RULES.iter().map(|rule| rule.key).collect()
}

/// First line of `text`, trimmed and clipped to `max_chars` characters.
pub(crate) fn first_line(text: &str, max_chars: usize) -> String {
    text.lines()
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(max_chars)
        .collect()
}
