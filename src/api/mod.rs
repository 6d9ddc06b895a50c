//! HTTP client for the IntelliScrape backend-for-frontend service.
//!
//! All operations share one request/response pipeline. Interceptors observe each
//! call before dispatch and after it resolves; the default set keeps the
//! [`UiStatusStore`](crate::status::UiStatusStore) in sync and logs every call.

mod client;
mod error;
mod interceptor;
mod request;

pub use client::{ApiClient, ApiResponse};
pub use error::{normalize_error, ApiError, FALLBACK_ERROR_MESSAGE};
pub use interceptor::{Interceptor, StatusInterceptor, TraceInterceptor};
pub use request::RequestDescriptor;
