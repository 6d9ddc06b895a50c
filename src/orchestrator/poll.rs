//! Polling of long-running backend work.

use anyhow::{Context, Result};
use intelliscrape::model::AnalysisStatus;
use intelliscrape::ApiClient;
use std::future::Future;
use std::time::Duration;

/// Poll the analysis status of `theme` every `interval` until every analysis has
/// completed or failed. Returns the last statuses seen; Ctrl-C stops early.
///
/// Each poll is an ordinary client call, so the status line shows its loading
/// state and a failed poll ends the watch with that error.
pub(crate) async fn watch_analysis<F>(
    client: &ApiClient,
    theme: &str,
    interval: Duration,
    on_update: F,
) -> Result<Vec<AnalysisStatus>>
where
    F: FnMut(&[AnalysisStatus]),
{
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!(theme, "analysis watch interrupted");
    };
    watch_analysis_until(client, theme, interval, interrupted, on_update).await
}

/// Like [`watch_analysis`], but stops when `stop` resolves, including in the
/// middle of a poll.
async fn watch_analysis_until<F, S>(
    client: &ApiClient,
    theme: &str,
    interval: Duration,
    stop: S,
    mut on_update: F,
) -> Result<Vec<AnalysisStatus>>
where
    F: FnMut(&[AnalysisStatus]),
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(stop);
    let mut last = Vec::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop => return Ok(last),
        }

        let response = tokio::select! {
            response = client.get_analysis_status(theme) => response
                .with_context(|| format!("failed to fetch analysis status for {theme}"))?,
            _ = &mut stop => return Ok(last),
        };
        let statuses: Vec<AnalysisStatus> = response
            .json()
            .context("unexpected analysis status payload")?;
        on_update(&statuses);

        if statuses.iter().all(AnalysisStatus::is_terminal) {
            return Ok(statuses);
        }
        last = statuses;
    }
}
