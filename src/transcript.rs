//! Transcript reading.
//!
//! The session transcript is a JSON-lines file. Only its tail matters: the
//! most recent tool call and the most recent failed tool result. Reading it
//! is best-effort, so every failure degrades to "no transcript" and is
//! reported through [`TranscriptRead`] instead of an error.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient;
use crate::patterns::{ErrorKind, FileLocation, MAX_MESSAGE_CHARS};

pub const MAX_TRANSCRIPT_LINES: usize = 10;

/// A single entry in the transcript JSONL file.
///
/// Tool records appear either at the top level (`"type": "tool_use"`) or as
/// content blocks inside `message.content` of assistant/user entries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub entry_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub tool_use_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub is_error: Option<bool>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    ToolUse,
    ToolResult,
    Other,
}

impl TranscriptEntry {
    pub fn kind(&self) -> EntryKind {
        match self.entry_type.as_deref() {
            Some("tool_use") => EntryKind::ToolUse,
            Some("tool_result") => EntryKind::ToolResult,
            _ => EntryKind::Other,
        }
    }

    /// Tool records carried by this entry, in file order.
    fn tool_records(&self) -> Vec<TranscriptEntry> {
        if self.kind() != EntryKind::Other {
            return vec![self.clone()];
        }

        let Some(Value::Array(blocks)) = self.message.as_ref().and_then(|m| m.get("content"))
        else {
            return Vec::new();
        };

        blocks
            .iter()
            .filter_map(|block| serde_json::from_value::<TranscriptEntry>(block.clone()).ok())
            .filter(|record| record.kind() != EntryKind::Other)
            .map(|mut record| {
                if record.timestamp.is_none() {
                    record.timestamp = self.timestamp.clone();
                }
                record
            })
            .collect()
    }
}

/// The most recent tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUse {
    pub name: String,
    pub input: Value,
    pub id: Option<String>,
    pub timestamp: Option<String>,
}

impl ToolUse {
    /// String field of the tool input, e.g. `command` for Bash.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }
}

/// An error recovered from a failed tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Text the error was derived from.
    pub raw: String,
}

/// Outcome of reading the transcript tail.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptRead {
    Loaded(Vec<TranscriptEntry>),
    /// The hook event carried no transcript path.
    NoPath,
    NotFound(PathBuf),
    Unreadable { path: PathBuf, reason: String },
}

impl TranscriptRead {
    pub fn entries(&self) -> &[TranscriptEntry] {
        match self {
            Self::Loaded(entries) => entries,
            _ => &[],
        }
    }

    pub fn into_entries(self) -> Vec<TranscriptEntry> {
        match self {
            Self::Loaded(entries) => entries,
            _ => Vec::new(),
        }
    }

    /// `true` when a transcript was expected but could not be read.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unreadable { .. })
    }
}

/// Read the last `max_lines` non-blank lines of the transcript and parse
/// each as JSON. Lines that fail to parse are skipped.
pub async fn read_last_entries(path: Option<&Path>, max_lines: usize) -> TranscriptRead {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        return TranscriptRead::NoPath;
    };

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("transcript file not found: {}", path.display());
            return TranscriptRead::NotFound(path.to_path_buf());
        }
        Err(e) => {
            tracing::error!("error reading transcript {}: {e}", path.display());
            return TranscriptRead::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
        }
    };

    TranscriptRead::Loaded(parse_tail(&content, max_lines))
}

fn parse_tail(content: &str, max_lines: usize) -> Vec<TranscriptEntry> {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);

    let entries: Vec<TranscriptEntry> = lines[start..]
        .iter()
        .filter_map(|line| match serde_json::from_str::<TranscriptEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("failed to parse transcript line: {e}");
                None
            }
        })
        .collect();

    tracing::debug!("read {} entries from transcript", entries.len());
    entries
}

/// Walk tool records from the most recent backwards.
fn records_newest_first(entries: &[TranscriptEntry]) -> impl Iterator<Item = TranscriptEntry> + '_ {
    entries
        .iter()
        .rev()
        .flat_map(|entry| entry.tool_records().into_iter().rev())
}

pub fn find_last_tool_use(entries: &[TranscriptEntry]) -> Option<ToolUse> {
    records_newest_first(entries)
        .find(|record| record.kind() == EntryKind::ToolUse)
        .map(|record| ToolUse {
            name: record.name.unwrap_or_default(),
            input: record
                .input
                .unwrap_or_else(|| Value::Object(Default::default())),
            id: record.id.or(record.tool_use_id),
            timestamp: record.timestamp,
        })
}

pub fn find_last_error(entries: &[TranscriptEntry]) -> Option<ErrorInfo> {
    let record = records_newest_first(entries)
        .find(|record| record.kind() == EntryKind::ToolResult && record.is_error == Some(true))?;

    let text = record.content.as_ref().map(extract_text).unwrap_or_default();
    let location = locate(&text);

    Some(ErrorInfo {
        kind: classify_kind(&text),
        message: extract_message(&text),
        file: location.file,
        line: location.line,
        raw: text,
    })
}

/// Text of a tool result: the string itself, or every `text` block joined
/// by newlines.
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

static KIND_CHECKS: LazyLock<Vec<(Regex, ErrorKind)>> = LazyLock::new(|| {
    [
        (r"(?i)SyntaxError", ErrorKind::SyntaxError),
        (r"(?i)TypeError", ErrorKind::TypeError),
        (r"(?i)ReferenceError", ErrorKind::ReferenceError),
        (r"(?i)Cannot find module", ErrorKind::ImportError),
        (r"(?i)EACCES|EPERM", ErrorKind::PermissionError),
        (r"(?i)ENOENT", ErrorKind::FileNotFoundError),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), kind))
    .collect()
});

static ERROR_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Error:\s*(.+)$").unwrap());
static KIND_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(SyntaxError|TypeError|ReferenceError):\s*(.+)$").unwrap()
});
static FRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at\s+([^\s:]+):(\d+):\d+").unwrap());
static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([/\w\-+.]+[.](js|ts|py|go|rs)):?(\d+)?").unwrap());

fn classify_kind(text: &str) -> ErrorKind {
    KIND_CHECKS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Generic)
}

fn extract_message(text: &str) -> String {
    let captured = ERROR_LINE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .or_else(|| KIND_LINE_RE.captures(text).and_then(|caps| caps.get(2)));

    match captured {
        Some(m) => m.as_str().trim().to_string(),
        None => {
            let line = text.split('\n').next().unwrap_or_default();
            let source = if line.is_empty() { text } else { line };
            source.chars().take(MAX_MESSAGE_CHARS).collect()
        }
    }
}

fn locate(text: &str) -> FileLocation {
    if let Some(caps) = FRAME_RE.captures(text) {
        return FileLocation {
            file: caps.get(1).map(|m| m.as_str().to_string()),
            line: caps.get(2).and_then(|m| m.as_str().parse().ok()),
        };
    }
    match PATH_RE.captures(text) {
        Some(caps) => FileLocation {
            file: caps.get(1).map(|m| m.as_str().to_string()),
            line: caps.get(3).and_then(|m| m.as_str().parse().ok()),
        },
        None => FileLocation::default(),
    }
}
