//! Client library for the IntelliScrape backend-for-frontend service.
//!
//! Every call made through [`api::ApiClient`] is mirrored into a shared
//! [`status::UiStatusStore`]: a loading indicator that is on while requests are
//! in flight, and an error slot holding the most recent failure until it expires.

pub mod api;
pub mod config;
pub mod model;
pub mod routes;
pub mod status;

pub use api::{ApiClient, ApiError, ApiResponse};
pub use config::ClientConfig;
pub use status::{UiError, UiStatus, UiStatusStore};
