use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use super::error::ApiError;
use super::interceptor::{Interceptor, StatusInterceptor, TraceInterceptor};
use super::request::RequestDescriptor;
use crate::config::ClientConfig;
use crate::model::{AnalyzeRequest, DataSourceInput};
use crate::status::UiStatusStore;

/// A successful response, passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Parsed JSON body; `Null` when the body is empty, a JSON string when it is
    /// not valid JSON.
    pub body: Value,
}

impl ApiResponse {
    /// Decode the body into a typed model.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(&self.body).map_err(ApiError::Decode)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    status: UiStatusStore,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ApiClient {
    /// Build a client whose calls are mirrored into `status` and logged.
    pub fn new(cfg: &ClientConfig, status: UiStatusStore) -> Result<Self, ApiError> {
        let base_url = Url::parse(&cfg.base_url).map_err(|e| {
            ApiError::InvalidRequest(format!("invalid base URL {:?}: {e}", cfg.base_url))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .build()?;

        status.set_error_ttl(cfg.error_ttl);

        Ok(Self {
            http,
            base_url,
            interceptors: vec![
                Arc::new(StatusInterceptor::new(status.clone())),
                Arc::new(TraceInterceptor),
            ],
            status,
        })
    }

    /// Register an additional interceptor, run after the existing ones.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn status(&self) -> &UiStatusStore {
        &self.status
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Run one request through the interceptor pipeline.
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse, ApiError> {
        for interceptor in &self.interceptors {
            interceptor.on_request(&request);
        }

        let mut pending = PendingCall {
            interceptors: &self.interceptors,
            request: &request,
            settled: false,
        };
        let result = self.dispatch(&request).await;
        pending.settled = true;

        match &result {
            Ok(response) => {
                for interceptor in &self.interceptors {
                    interceptor.on_response(&request, response);
                }
            }
            Err(error) => {
                for interceptor in &self.interceptors {
                    interceptor.on_error(&request, error);
                }
            }
        }
        result
    }

    async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let response = request.build(&self.http, &self.base_url)?.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);

        if status.is_success() {
            Ok(ApiResponse {
                status,
                body: body.unwrap_or(Value::Null),
            })
        } else {
            Err(ApiError::Status { status, body })
        }
    }

    // --- Themes ---

    pub async fn trigger_analysis(
        &self,
        data_source_id: i64,
        theme_name: &str,
    ) -> Result<ApiResponse, ApiError> {
        let body = AnalyzeRequest {
            data_source_id,
            theme_name: theme_name.to_string(),
        };
        self.send(RequestDescriptor::post(["themes", "analyze"]).json(&body))
            .await
    }

    pub async fn get_workbench_data(&self, theme_name: &str) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::get(["themes", theme_name, "workbench"]))
            .await
    }

    /// `payload` is forwarded as-is; see [`crate::model::StandardizeRequest`].
    pub async fn standardize_theme<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::post(["themes", "standardize"]).json(payload))
            .await
    }

    pub async fn get_analysis_status(&self, theme_name: &str) -> Result<ApiResponse, ApiError> {
        self.send(
            RequestDescriptor::get(["themes", "analysis_status"]).query("theme_name", theme_name),
        )
        .await
    }

    pub async fn list_standard_datasets(&self) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::get(["themes", ""])).await
    }

    // --- Crawl tasks ---

    /// `task_data` is forwarded as-is; see [`crate::model::CrawlTaskCreate`].
    pub async fn create_crawl_task<T: Serialize + ?Sized>(
        &self,
        task_data: &T,
    ) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::post(["crawl-tasks", ""]).json(task_data))
            .await
    }

    pub async fn list_crawl_tasks(&self) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::get(["crawl-tasks", ""])).await
    }

    // --- Data sources ---

    pub async fn list_data_sources(&self) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::get(["data-sources", ""])).await
    }

    pub async fn get_data_source(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::get(["data-sources".to_string(), id.to_string()]))
            .await
    }

    pub async fn create_data_source(
        &self,
        source: &DataSourceInput,
    ) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::post(["data-sources", ""]).json(source))
            .await
    }

    pub async fn update_data_source(
        &self,
        id: i64,
        source: &DataSourceInput,
    ) -> Result<ApiResponse, ApiError> {
        self.send(
            RequestDescriptor::put(["data-sources".to_string(), id.to_string()]).json(source),
        )
        .await
    }

    pub async fn delete_data_source(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.send(RequestDescriptor::delete([
            "data-sources".to_string(),
            id.to_string(),
        ]))
        .await
    }
}

/// Runs `on_cancel` if the call future is dropped while the request is in flight.
struct PendingCall<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    request: &'a RequestDescriptor,
    settled: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        for interceptor in self.interceptors {
            interceptor.on_cancel(self.request);
        }
    }
}

fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
