//! Request identity and stored response types.
//!
//! A [`RequestKey`] is what the cache stores entries under: an uppercased
//! method plus a canonical absolute URL (query included, fragment dropped).

pub mod url;

use std::fmt;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use self::url::{UrlError, canonicalize, resolve};
use crate::cache::hash::compute_entry_key;

/// Fetch mode of an intercepted request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// Normalized request identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: ::url::Url,
}

impl RequestKey {
    pub fn new(method: &str, mut url: ::url::Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url }
    }

    pub fn get(url: ::url::Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &::url::Url {
        &self.url
    }

    /// Storage key used for the `entries` table.
    pub fn digest(&self) -> String {
        compute_entry_key(&self.method, self.url.as_str())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: ::url::Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// The fragment is dropped; it never reaches the network or the cache.
    pub fn new(method: &str, mut url: ::url::Url, mode: RequestMode) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, mode, headers: Vec::new() }
    }

    pub fn get(url: ::url::Url) -> Self {
        Self::new("GET", url, RequestMode::default())
    }

    pub fn navigate(url: ::url::Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, self.url.clone())
    }
}

/// A full response as held by the cache or returned by the network.
///
/// Never patched once stored; replacing an entry writes a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: None, headers: Vec::new(), body: body.into() }
    }

    /// Plain-text response synthesized when nothing else can answer.
    pub fn degraded(status: u16, body: &str) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_status_text(mut self, text: &str) -> Self {
        self.status_text = Some(text.to_string());
        self
    }

    /// 2xx responses are the only ones written to the cache.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
