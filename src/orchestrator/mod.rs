//! Session-level orchestration for the CLI.
//!
//! This module owns the long-lived pieces around individual API calls: the status
//! line that renders the shared UI status, and polling loops that repeat a call
//! until the backend reaches a stable state.

mod poll;
mod status_line;

pub(crate) use poll::watch_analysis;
pub(crate) use status_line::spawn_status_line;
