use reqwest::Method;
use serde::Serialize;
use std::fmt;
use url::Url;

use super::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Json(serde_json::Value),
    // Serialization failures surface when the request is dispatched.
    Invalid(String),
}

/// One outgoing call: method, path relative to the base URL, query and body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Body>,
}

impl RequestDescriptor {
    /// `segments` are appended to the base URL path, each percent-encoded as a
    /// single segment. A trailing `""` yields a trailing slash.
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    pub fn put<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PUT, segments)
    }

    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, segments)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.body = Some(match serde_json::to_value(body) {
            Ok(value) => Body::Json(value),
            Err(e) => Body::Invalid(format!("failed to serialize request body: {e}")),
        });
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL, unencoded, e.g. `/themes/alpha/workbench`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Some(Body::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Resolve the absolute URL against `base`.
    pub fn url(&self, base: &Url) -> Result<Url, ApiError> {
        let last = self.segments.len().saturating_sub(1);
        if self.segments[..last].iter().any(|s| s.is_empty()) {
            return Err(ApiError::InvalidRequest(format!(
                "empty path segment in {}",
                self.path()
            )));
        }
        // `PathSegmentsMut::extend` drops these instead of encoding them.
        if let Some(dot) = self.segments.iter().find(|s| *s == "." || *s == "..") {
            return Err(ApiError::InvalidRequest(format!(
                "path segment {dot:?} is not allowed in {}",
                self.path()
            )));
        }

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("base URL {base} cannot have a path")))?
            .pop_if_empty()
            .extend(&self.segments);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    pub(crate) fn build(
        &self,
        http: &reqwest::Client,
        base: &Url,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.url(base)?;
        let builder = http.request(self.method.clone(), url);
        match &self.body {
            None => Ok(builder),
            Some(Body::Json(value)) => Ok(builder.json(value)),
            Some(Body::Invalid(reason)) => Err(ApiError::InvalidRequest(reason.clone())),
        }
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}
