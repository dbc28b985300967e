//! Smart notifications for Claude Code hook events.
//!
//! A hook event arriving on stdin is merged with the tail of the session
//! transcript, classified into a scenario, paired with a suggestion and
//! rendered for the configured channel. See [`pipeline::Pipeline`].

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod hook;
mod lenient;
pub mod notify;
pub mod patterns;
pub mod pipeline;
pub mod presence;
pub mod scenario;
pub mod suggestion;
pub mod transcript;

pub use error::{NotifyError, Result};
