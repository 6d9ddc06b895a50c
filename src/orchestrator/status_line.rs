//! Renders changes of the shared UI status to stderr.

use crate::cli::OutputLine;
use intelliscrape::UiStatus;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{oneshot, watch};

/// Handle for a running status line task.
pub(crate) struct StatusLine {
    stop_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl StatusLine {
    /// Render any change not shown yet, then stop the task.
    pub(crate) async fn finish(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.await;
    }
}

/// Subscribe to status changes and print a line for each visible transition.
pub(crate) fn spawn_status_line(
    mut status_rx: watch::Receiver<UiStatus>,
    out: UnboundedSender<OutputLine>,
) -> StatusLine {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    // Baseline is taken now so changes made before the task first runs still render.
    let mut shown = status_rx.borrow_and_update().clone();
    let handle = tokio::spawn(async move {
        let mut render = |next: UiStatus| {
            for line in render_transition(&shown, &next) {
                let _ = out.send(OutputLine::Stderr(line));
            }
            shown = next;
        };

        loop {
            tokio::select! {
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = status_rx.borrow_and_update().clone();
                    render(next);
                }
                _ = &mut stop_rx => {
                    // The last call may have resolved after our final wakeup.
                    if status_rx.has_changed().unwrap_or(false) {
                        let next = status_rx.borrow_and_update().clone();
                        render(next);
                    }
                    break;
                }
            }
        }
    });
    StatusLine { stop_tx, handle }
}

/// Lines describing the move from `prev` to `next`. Loading ending and errors
/// expiring are silent.
pub(crate) fn render_transition(prev: &UiStatus, next: &UiStatus) -> Vec<String> {
    let mut lines = Vec::new();
    if next.is_loading && !prev.is_loading {
        lines.push("Loading…".to_string());
    }
    if let Some(err) = &next.error {
        if prev.error.as_ref() != Some(err) {
            lines.push(format!("Error: {err}"));
        }
    }
    lines
}
