//! Core request abstractions for the EnvData SDK
//!
//! - `Method`: the four HTTP verbs the API uses
//! - `RequestDescriptor`: one logical API call, built per call and discarded afterwards
//! - `RequestBody`: empty, JSON or multipart payloads
//! - `ClientBuilder`: builder pattern for creating clients

pub mod builder;
pub use builder::ClientBuilder;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{classify, RawFailure, Result};

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Only GET is treated as safe to repeat automatically
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// Request payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// Sent as `multipart/form-data`; the boundary header is set by the transport
    Multipart(Vec<MultipartPart>),
}

/// Description of one logical API call
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: BTreeMap<String, String>,
    body: RequestBody,
    headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: RequestBody::Empty,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header; caller headers override the SDK defaults
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON body. Fails with a validation error if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            classify(RawFailure::invalid_field(
                "body",
                format!("not JSON-serializable: {}", e),
            ))
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Attach a multipart body
    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Check the descriptor before anything is sent
    pub fn validate(&self) -> std::result::Result<(), RawFailure> {
        let path = self.path.as_str();
        if !path.starts_with('/') {
            return Err(RawFailure::invalid_field("path", "must start with '/'"));
        }
        if path.starts_with("//") || path.contains("://") {
            return Err(RawFailure::invalid_field("path", "must be a relative URL"));
        }
        if path.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(RawFailure::invalid_field(
                "path",
                "must not contain whitespace, '?' or '#'",
            ));
        }
        Ok(())
    }
}

/// Build a path from a fixed prefix and one caller-supplied segment,
/// percent-encoding the segment.
pub fn path_with_segment(prefix: &str, segment: &str) -> String {
    let mut url = match url::Url::parse("http://localhost") {
        Ok(url) => url,
        Err(_) => return format!("{}/{}", prefix.trim_end_matches('/'), segment),
    };
    url.set_path(prefix.trim_end_matches('/'));
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(segment);
    }
    url.path().to_string()
}
