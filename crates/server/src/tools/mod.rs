//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server. Each
//! tool returns its output as pretty-printed JSON text content.

pub mod cache;
pub mod worker;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, StoredResponse, request::resolve};
use url::Url;

use crate::error::ToolError;

pub use cache::{CacheDeleteParams, CacheGetParams, CacheStatusParams};
pub use worker::{WorkerFetchParams, WorkerInstallParams, WorkerNotificationClickParams, WorkerPushParams};

/// Serialize `value` as the tool's text content.
pub(crate) fn json_result(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Resolve a tool URL argument against the worker origin. Absolute URLs are
/// canonicalized as-is.
pub(crate) fn resolve_url(origin: &Url, input: &str) -> Result<Url, McpError> {
    resolve(origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")).into())
}

/// Uppercased method name, rejecting anything that is not a plain token.
pub(crate) fn parse_method(method: &str) -> Result<String, McpError> {
    let method = method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {method:?}")).into());
    }
    Ok(method.to_ascii_uppercase())
}

pub(crate) fn default_method() -> String {
    "GET".into()
}

/// A request or response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderParam {
    pub name: String,
    pub value: String,
}

/// A response as shown to the tool caller.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: Option<String>,
    pub headers: Vec<HeaderParam>,
    pub body_len: usize,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
}

impl From<&StoredResponse> for ResponseView {
    fn from(response: &StoredResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderParam { name: name.clone(), value: value.clone() })
                .collect(),
            body_len: response.body.len(),
            body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use shellcache_core::{
        AppConfig, CacheDb, Network, NetworkError, RecordingHost, Request, StoredResponse, Worker,
    };

    /// Fixed responses keyed by URL; anything else is a connection failure.
    #[derive(Default)]
    pub(crate) struct StaticNetwork {
        routes: Mutex<HashMap<String, StoredResponse>>,
    }

    impl StaticNetwork {
        pub(crate) fn respond(&self, url: &str, response: StoredResponse) {
            self.routes.lock().unwrap().insert(url.to_string(), response);
        }
    }

    #[async_trait]
    impl Network for StaticNetwork {
        async fn fetch(&self, request: &Request) -> Result<StoredResponse, NetworkError> {
            self.routes
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| NetworkError::Connect(format!("no route to {}", request.url)))
        }
    }

    pub(crate) struct Harness {
        pub worker: Arc<Worker>,
        pub host: Arc<RecordingHost>,
        pub network: Arc<StaticNetwork>,
    }

    /// Worker for `https://app.test` with manifest `/` and `/logo.png`, both
    /// served by the network.
    pub(crate) async fn harness() -> Harness {
        let mut config = AppConfig { origin: "https://app.test".into(), ..Default::default() };
        config.policy.version = "v1".into();
        config.policy.manifest = vec!["/".into(), "/logo.png".into()];

        let network = Arc::new(StaticNetwork::default());
        network.respond(
            "https://app.test/",
            StoredResponse::new(200, "<html>shell</html>").with_header("content-type", "text/html"),
        );
        network.respond("https://app.test/logo.png", StoredResponse::new(200, vec![0x89, b'P', b'N', b'G']));

        let host = Arc::new(RecordingHost::new());
        let cache = CacheDb::open_in_memory().await.unwrap();
        let worker = Arc::new(Worker::new(&config, cache, network.clone(), host.clone()).unwrap());
        Harness { worker, host, network }
    }

    /// Parse the JSON text content of a tool result.
    pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
