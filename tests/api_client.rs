use intelliscrape::api::{Interceptor, RequestDescriptor, FALLBACK_ERROR_MESSAGE};
use intelliscrape::model::{CrawlTask, WorkbenchResponse};
use intelliscrape::{ApiClient, ApiError, ApiResponse, ClientConfig, UiError, UiStatusStore};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::with_base_url(format!("{}/api/v1", server.uri()))
}

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&config_for(server), UiStatusStore::new()).unwrap()
}

fn error_text(client: &ApiClient) -> Option<String> {
    client.status().error().map(|e| e.to_string())
}

#[tokio::test]
async fn success_passes_body_through_and_stops_loading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/themes/analyze"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"data_source_id": 3, "theme_name": "books"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(
            json!({"message": "Analysis task has been successfully triggered."}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let resp = client.trigger_analysis(3, "books").await.unwrap();

    assert_eq!(resp.status.as_u16(), 202);
    assert_eq!(
        resp.body,
        json!({"message": "Analysis task has been successfully triggered."})
    );
    assert!(!client.status().is_loading());
    assert_eq!(client.status().error(), None);
}

#[tokio::test]
async fn loading_is_on_while_the_call_is_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crawl-tasks/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let call = tokio::spawn({
        let client = client.clone();
        async move { client.list_crawl_tasks().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.status().is_loading());

    call.await.unwrap().unwrap();
    assert!(!client.status().is_loading());
}

#[tokio::test]
async fn overlapping_calls_keep_loading_until_the_last_one_settles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crawl-tasks/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data-sources/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fast = tokio::spawn({
        let client = client.clone();
        async move { client.list_crawl_tasks().await }
    });
    let slow = tokio::spawn({
        let client = client.clone();
        async move { client.list_data_sources().await }
    });

    fast.await.unwrap().unwrap();
    assert!(client.status().is_loading());

    slow.await.unwrap().unwrap();
    assert!(!client.status().is_loading());
}

#[tokio::test]
async fn server_detail_becomes_the_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data-sources/42"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Data source not found."})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_data_source(42).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(err.detail(), Some(&json!("Data source not found.")));
    assert_eq!(error_text(&client).as_deref(), Some("Data source not found."));
    assert!(!client.status().is_loading());
}

#[tokio::test]
async fn validation_errors_are_kept_structured() {
    let server = MockServer::start().await;
    let detail = json!([
        {"loc": ["body", "name"], "msg": "field required", "type": "value_error.missing"},
        {"loc": ["body", "standard_dataset_id"], "msg": "value is not a valid integer", "type": "type_error.integer"}
    ]);
    Mock::given(method("POST"))
        .and(path("/api/v1/crawl-tasks/"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": detail.clone()})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .create_crawl_task(&json!({"data_source_ids": [1]}))
        .await
        .unwrap_err();

    assert_eq!(client.status().error(), Some(UiError::Structured(detail)));
    assert_eq!(
        error_text(&client).as_deref(),
        Some("field required; value is not a valid integer")
    );
}

#[tokio::test]
async fn status_without_detail_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/themes/books/workbench"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_workbench_data("books").await.unwrap_err();

    assert!(matches!(err, ApiError::Status { .. }));
    assert_eq!(error_text(&client).as_deref(), Some(FALLBACK_ERROR_MESSAGE));
}

#[tokio::test]
async fn transport_failure_reports_the_transport_message() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let cfg = ClientConfig::with_base_url(format!("http://127.0.0.1:{port}/api/v1"));
    let client = ApiClient::new(&cfg, UiStatusStore::new()).unwrap();

    let err = client.list_crawl_tasks().await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    let shown = error_text(&client).unwrap();
    assert_eq!(shown, err.to_string());
    assert_ne!(shown, FALLBACK_ERROR_MESSAGE);
    assert!(!client.status().is_loading());
}

#[tokio::test]
async fn new_request_clears_previous_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data-sources/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "gone"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crawl-tasks/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_data_source(1).await.unwrap_err();
    assert_eq!(error_text(&client).as_deref(), Some("gone"));

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.list_crawl_tasks().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.status().is_loading());
    assert_eq!(client.status().error(), None);

    call.await.unwrap().unwrap();
    assert_eq!(client.status().error(), None);
}

#[tokio::test]
async fn error_expires_after_configured_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/themes/analysis_status"))
        .and(query_param("theme_name", "books"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .mount(&server)
        .await;

    let mut cfg = config_for(&server);
    cfg.error_ttl = Duration::from_millis(200);
    let client = ApiClient::new(&cfg, UiStatusStore::new()).unwrap();

    client.get_analysis_status("books").await.unwrap_err();
    assert_eq!(error_text(&client).as_deref(), Some("boom"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.status().error(), None);
}

#[tokio::test]
async fn empty_path_parameter_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_workbench_data("").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(
        error_text(&client).as_deref(),
        Some("empty path segment in /themes//workbench")
    );
    assert!(!client.status().is_loading());
}

#[tokio::test]
async fn path_parameters_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/themes/hot%20deals/workbench"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "existing_standard_fields": [],
            "discovered_fields": [],
            "recommendations": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let wb: WorkbenchResponse = client
        .get_workbench_data("hot deals")
        .await
        .unwrap()
        .json()
        .unwrap();
    assert!(wb.discovered_fields.is_empty());
}

#[tokio::test]
async fn data_source_round_trip_through_crud_calls() {
    let server = MockServer::start().await;
    let stored = json!({
        "id": 9, "site_key": "books_toscrape", "name": "Books to Scrape",
        "url": "https://books.toscrape.com", "description": null
    });
    Mock::given(method("PUT"))
        .and(path("/api/v1/data-sources/9"))
        .and(body_json(json!({
            "site_key": "books_toscrape", "name": "Books to Scrape",
            "url": "https://books.toscrape.com", "description": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/data-sources/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let input = intelliscrape::model::DataSourceInput {
        site_key: "books_toscrape".into(),
        name: "Books to Scrape".into(),
        url: "https://books.toscrape.com".into(),
        description: None,
    };
    let updated = client.update_data_source(9, &input).await.unwrap();
    assert_eq!(updated.body, stored);
    let deleted = client.delete_data_source(9).await.unwrap();
    assert_eq!(deleted.body, stored);
}

#[tokio::test]
async fn crawl_task_decodes_into_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/crawl-tasks/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 5, "name": "nightly", "standard_dataset_id": 2,
            "data_source_ids": [1, 3], "schedule_cron": null, "status": "running"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let task: CrawlTask = client
        .create_crawl_task(&json!({
            "name": "nightly", "standard_dataset_id": 2, "data_source_ids": [1, 3]
        }))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(task.status, "running");
    assert_eq!(task.schedule_cron, None);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Interceptor for Recorder {
    fn on_request(&self, request: &RequestDescriptor) {
        self.events.lock().unwrap().push(format!("request {request}"));
    }

    fn on_response(&self, request: &RequestDescriptor, response: &ApiResponse) {
        self.events
            .lock()
            .unwrap()
            .push(format!("response {request} {}", response.status.as_u16()));
    }

    fn on_error(&self, request: &RequestDescriptor, error: &ApiError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error {request} {}", error.ui_error()));
    }

    fn on_cancel(&self, request: &RequestDescriptor) {
        self.events.lock().unwrap().push(format!("cancel {request}"));
    }
}

#[tokio::test]
async fn interceptors_see_each_call_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/themes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data-sources/3"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "missing"})))
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let client = client_for(&server).with_interceptor(recorder.clone());

    client.list_standard_datasets().await.unwrap();
    client.get_data_source(3).await.unwrap_err();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "request GET /themes/",
            "response GET /themes/ 200",
            "request GET /data-sources/3",
            "error GET /data-sources/3 missing",
        ]
    );
}

#[tokio::test]
async fn repeated_calls_are_not_deduplicated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/themes/alpha/workbench"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "existing_standard_fields": [],
            "discovered_fields": [],
            "recommendations": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_workbench_data("alpha").await.unwrap();
    client.get_workbench_data("alpha").await.unwrap();
}

#[tokio::test]
async fn crawl_task_payload_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    let created = json!({"id": 11, "name": "t1", "extra": [1, 2]});
    Mock::given(method("POST"))
        .and(path("/api/v1/crawl-tasks/"))
        .and(body_json(json!({"name": "t1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let resp = client.create_crawl_task(&json!({"name": "t1"})).await.unwrap();
    assert_eq!(resp.status.as_u16(), 201);
    assert_eq!(resp.body, created);
}

#[tokio::test]
async fn dropped_call_releases_loading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crawl-tasks/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let client = client_for(&server).with_interceptor(recorder.clone());

    let timed_out =
        tokio::time::timeout(Duration::from_millis(100), client.list_crawl_tasks()).await;

    assert!(timed_out.is_err());
    assert!(!client.status().is_loading());
    assert_eq!(client.status().error(), None);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["request GET /crawl-tasks/", "cancel GET /crawl-tasks/"]
    );
}

#[tokio::test]
async fn dot_path_parameter_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_workbench_data("..").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert!(!client.status().is_loading());
}
