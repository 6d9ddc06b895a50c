//! Request and response shapes of the backend-for-frontend service.
//!
//! The client itself treats bodies as opaque JSON; these types are for callers
//! that want typed access via [`crate::ApiResponse::json`] or that build request
//! payloads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub data_source_id: i64,
    pub theme_name: String,
}

/// Body of simple acknowledgement responses (analysis triggered, theme standardized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A field discovered across analyzed sources, shown on the standardization workbench.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbenchField {
    pub name: String,
    /// Number of sources in which the field was found.
    pub count: u64,
    /// Total number of analyzed sources.
    pub sources_count: u64,
    /// Selector -> number of times it was proposed.
    pub selectors: BTreeMap<String, u64>,
}

impl WorkbenchField {
    /// The selector proposed most often, ties broken by selector order.
    pub fn top_selector(&self) -> Option<&str> {
        self.selectors
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(selector, _)| selector.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbenchResponse {
    pub existing_standard_fields: Vec<String>,
    pub discovered_fields: Vec<WorkbenchField>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizeField {
    pub field_name: String,
    #[serde(default)]
    pub description: String,
    /// e.g. "String", "Integer", "Text"
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNameMapping {
    pub field_name: String,
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfigPayload {
    pub data_source_id: i64,
    pub mappings: Vec<FieldNameMapping>,
    #[serde(default)]
    pub extra_fields: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizeRequest {
    pub theme_name: String,
    #[serde(default)]
    pub description: String,
    pub fields_to_standardize: Vec<StandardizeField>,
    pub source_configs: Vec<SourceConfigPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatus {
    pub data_source_id: i64,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl AnalysisStatus {
    /// Whether the analysis has stopped changing.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "completed" | "failed")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTaskCreate {
    pub name: String,
    pub standard_dataset_id: i64,
    pub data_source_ids: Vec<i64>,
    /// One-off tasks (no schedule) are started immediately by the server.
    #[serde(default)]
    pub schedule_cron: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub id: i64,
    pub name: String,
    pub standard_dataset_id: i64,
    pub data_source_ids: Vec<i64>,
    #[serde(default)]
    pub schedule_cron: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceInput {
    pub site_key: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub site_key: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardDataset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
