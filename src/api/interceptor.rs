use super::client::ApiResponse;
use super::error::ApiError;
use super::request::RequestDescriptor;
use crate::status::UiStatusStore;

/// Hooks run around every call made through [`super::ApiClient`].
///
/// For each call `on_request` runs exactly once before dispatch, followed by
/// exactly one of `on_response` or `on_error` once the call resolves. If the
/// caller drops the call before it resolves, `on_cancel` runs instead.
/// Interceptors run in registration order.
pub trait Interceptor: Send + Sync {
    fn on_request(&self, _request: &RequestDescriptor) {}

    fn on_response(&self, _request: &RequestDescriptor, _response: &ApiResponse) {}

    fn on_error(&self, _request: &RequestDescriptor, _error: &ApiError) {}

    fn on_cancel(&self, _request: &RequestDescriptor) {}
}

/// Mirrors the request lifecycle into a [`UiStatusStore`].
pub struct StatusInterceptor {
    store: UiStatusStore,
}

impl StatusInterceptor {
    pub fn new(store: UiStatusStore) -> Self {
        Self { store }
    }
}

impl Interceptor for StatusInterceptor {
    fn on_request(&self, _request: &RequestDescriptor) {
        self.store.begin_request();
        self.store.clear_error();
    }

    fn on_response(&self, _request: &RequestDescriptor, _response: &ApiResponse) {
        self.store.end_request();
    }

    fn on_error(&self, _request: &RequestDescriptor, error: &ApiError) {
        self.store.set_error(Some(error.ui_error()));
        self.store.end_request();
    }

    fn on_cancel(&self, _request: &RequestDescriptor) {
        self.store.end_request();
    }
}

/// Logs each call through `tracing`.
pub struct TraceInterceptor;

impl Interceptor for TraceInterceptor {
    fn on_request(&self, request: &RequestDescriptor) {
        tracing::debug!(method = %request.method(), path = %request.path(), "sending request");
    }

    fn on_response(&self, request: &RequestDescriptor, response: &ApiResponse) {
        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            status = response.status.as_u16(),
            "request succeeded"
        );
    }

    fn on_error(&self, request: &RequestDescriptor, error: &ApiError) {
        tracing::warn!(
            method = %request.method(),
            path = %request.path(),
            status = error.status().map(|s| s.as_u16()),
            error = %error,
            "request failed"
        );
    }

    fn on_cancel(&self, request: &RequestDescriptor) {
        tracing::debug!(method = %request.method(), path = %request.path(), "request dropped");
    }
}
