//! Text summary builder for CLI output.
//!
//! This module decodes response bodies into their models and formats
//! human-readable lines for text mode.

use anyhow::{Context, Result};
use intelliscrape::model::{
    AnalysisStatus, CrawlTask, DataSource, StandardDataset, WorkbenchResponse,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// What a response body holds, and therefore how to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseKind {
    /// `{"message": ...}` acknowledgements
    Message,
    Workbench,
    AnalysisStatuses,
    StandardDatasets,
    CrawlTask,
    CrawlTasks,
    DataSource,
    DataSources,
    /// Anything else; printed as pretty JSON.
    Raw,
}

fn decode<T: DeserializeOwned>(body: &Value, what: &str) -> Result<T> {
    T::deserialize(body).with_context(|| format!("unexpected {what} payload (try --json)"))
}

/// Build a text summary for a response body.
pub(crate) fn build_text_summary(kind: ResponseKind, body: &Value) -> Result<TextSummary> {
    let lines = match kind {
        ResponseKind::Message => match body.get("message").and_then(Value::as_str) {
            Some(msg) => vec![msg.to_string()],
            None => raw_lines(body)?,
        },
        ResponseKind::Workbench => workbench_lines(&decode(body, "workbench")?),
        ResponseKind::AnalysisStatuses => {
            let statuses: Vec<AnalysisStatus> = decode(body, "analysis status")?;
            if statuses.is_empty() {
                vec!["No analyses found.".to_string()]
            } else {
                statuses.iter().map(analysis_line).collect()
            }
        }
        ResponseKind::StandardDatasets => {
            let datasets: Vec<StandardDataset> = decode(body, "standard dataset")?;
            if datasets.is_empty() {
                vec!["No standard datasets.".to_string()]
            } else {
                datasets.iter().map(dataset_line).collect()
            }
        }
        ResponseKind::CrawlTask => vec![task_line(&decode(body, "crawl task")?)],
        ResponseKind::CrawlTasks => {
            let tasks: Vec<CrawlTask> = decode(body, "crawl task")?;
            if tasks.is_empty() {
                vec!["No crawl tasks.".to_string()]
            } else {
                tasks.iter().map(task_line).collect()
            }
        }
        ResponseKind::DataSource => vec![source_line(&decode(body, "data source")?)],
        ResponseKind::DataSources => {
            let sources: Vec<DataSource> = decode(body, "data source")?;
            if sources.is_empty() {
                vec!["No data sources.".to_string()]
            } else {
                sources.iter().map(source_line).collect()
            }
        }
        ResponseKind::Raw => raw_lines(body)?,
    };
    Ok(TextSummary { lines })
}

fn raw_lines(body: &Value) -> Result<Vec<String>> {
    let text = serde_json::to_string_pretty(body)?;
    Ok(text.lines().map(str::to_string).collect())
}

fn workbench_lines(wb: &WorkbenchResponse) -> Vec<String> {
    let mut lines = Vec::new();
    let existing = if wb.existing_standard_fields.is_empty() {
        "-".to_string()
    } else {
        wb.existing_standard_fields.join(", ")
    };
    lines.push(format!("Standard fields: {existing}"));

    if wb.discovered_fields.is_empty() {
        lines.push("No new fields discovered.".to_string());
    } else {
        lines.push("Discovered fields:".to_string());
        for field in &wb.discovered_fields {
            let marker = if wb.recommendations.contains(&field.name) {
                " *"
            } else {
                ""
            };
            lines.push(format!(
                "  {}{marker}: {}/{} sources, top selector {}",
                field.name,
                field.count,
                field.sources_count,
                field.top_selector().unwrap_or("-"),
            ));
        }
    }
    if !wb.recommendations.is_empty() {
        lines.push(format!("Recommended: {}", wb.recommendations.join(", ")));
    }
    lines
}

fn analysis_line(status: &AnalysisStatus) -> String {
    match status.error_message.as_deref() {
        Some(err) if !err.is_empty() => {
            format!("Source {}: {} ({err})", status.data_source_id, status.status)
        }
        _ => format!("Source {}: {}", status.data_source_id, status.status),
    }
}

/// One-line progress summary while watching an analysis.
pub(crate) fn progress_line(statuses: &[AnalysisStatus]) -> String {
    let done = statuses.iter().filter(|s| s.is_terminal()).count();
    format!("Analysis: {done}/{} sources finished", statuses.len())
}

fn dataset_line(dataset: &StandardDataset) -> String {
    match dataset.description.as_deref() {
        Some(desc) if !desc.trim().is_empty() => {
            format!("#{} {}: {}", dataset.id, dataset.name, desc)
        }
        _ => format!("#{} {}", dataset.id, dataset.name),
    }
}

fn task_line(task: &CrawlTask) -> String {
    let sources: Vec<String> = task.data_source_ids.iter().map(i64::to_string).collect();
    let schedule = task.schedule_cron.as_deref().unwrap_or("once");
    format!(
        "#{} {} [{}] dataset {}, sources {}, schedule {}",
        task.id,
        task.name,
        task.status,
        task.standard_dataset_id,
        sources.join(","),
        schedule
    )
}

fn source_line(source: &DataSource) -> String {
    format!(
        "#{} {} ({}) {}",
        source.id, source.name, source.site_key, source.url
    )
}
