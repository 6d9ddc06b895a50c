use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::status::DEFAULT_ERROR_TTL;

/// Base URL of the backend-for-frontend service when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Settings for building an [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    /// How long a stored error stays visible before it is cleared.
    #[serde(with = "humantime_serde")]
    pub error_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: default_user_agent(),
            error_ttl: DEFAULT_ERROR_TTL,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

pub fn default_user_agent() -> String {
    format!("intelliscrape/{}", env!("CARGO_PKG_VERSION"))
}
