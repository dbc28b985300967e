use std::path::{Path, PathBuf};

use crate::hook::HookEvent;
use crate::transcript::{
    find_last_error, find_last_tool_use, read_last_entries, ErrorInfo, ToolUse, TranscriptEntry,
    TranscriptRead,
};

/// Normalized view of a hook event merged with what the transcript tail
/// revealed. Built once per event and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub session_id: Option<String>,
    pub transcript_path: Option<PathBuf>,
    pub cwd: String,
    pub permission_mode: String,
    pub hook_event_name: String,
    pub notification_type: Option<String>,
    pub message: Option<String>,
    pub stop_hook_active: bool,
    pub project: String,
    pub last_tool_use: Option<ToolUse>,
    pub last_error: Option<ErrorInfo>,
    pub transcript: TranscriptRead,
}

impl RequestContext {
    /// Context from the hook event alone, before any transcript is read.
    pub fn from_event(event: HookEvent) -> Self {
        let cwd = non_empty(event.cwd).unwrap_or_else(|| {
            std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        });
        let project = project_name(&cwd);

        Self {
            session_id: non_empty(event.session_id),
            transcript_path: non_empty(event.transcript_path).map(|p| expand_path(&p)),
            cwd,
            permission_mode: non_empty(event.permission_mode)
                .unwrap_or_else(|| "default".to_string()),
            hook_event_name: non_empty(event.hook_event_name)
                .unwrap_or_else(|| "Unknown".to_string()),
            notification_type: non_empty(event.notification_type),
            message: non_empty(event.message),
            stop_hook_active: event.stop_hook_active.unwrap_or(false),
            project,
            last_tool_use: None,
            last_error: None,
            transcript: TranscriptRead::NoPath,
        }
    }

    /// Attach transcript facts: last tool use, last error and the entries.
    pub fn with_transcript(mut self, transcript: TranscriptRead) -> Self {
        self.last_tool_use = find_last_tool_use(transcript.entries());
        self.last_error = find_last_error(transcript.entries());
        self.transcript = transcript;
        self
    }

    pub fn recent_entries(&self) -> &[TranscriptEntry] {
        self.transcript.entries()
    }
}

/// Merge the hook event with its transcript tail.
pub async fn build_context(event: HookEvent, max_lines: usize) -> RequestContext {
    let context = RequestContext::from_event(event);
    let transcript = read_last_entries(context.transcript_path.as_deref(), max_lines).await;
    if transcript.is_degraded() {
        tracing::debug!("continuing without transcript facts");
    }
    let context = context.with_transcript(transcript);

    tracing::info!(
        "parsed hook context: {}, project: {}",
        context.hook_event_name,
        context.project
    );
    context
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(path)
}

/// Project name from the working directory basename,
/// e.g. "/home/user/projects/heyagent" → "heyagent".
pub fn project_name(cwd: &str) -> String {
    if cwd.is_empty() {
        return "unknown".to_string();
    }
    let path = Path::new(cwd);
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_string(),
        None if path.has_root() => {
            tracing::warn!("running from root directory, using \"root\" as project name");
            "root".to_string()
        }
        None => "unknown".to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
