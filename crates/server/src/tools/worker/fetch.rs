//! worker_fetch tool implementation.
//!
//! Delivers a fetch event. Requests the worker does not intercept are sent
//! straight to the network, as a browser would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, FetchOutcome, Network, Request, RequestMode, ResponseSource, Strategy, Worker};

use crate::tools::{HeaderParam, ResponseView, default_method, json_result, parse_method, resolve_url};

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the worker origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate" for page loads, otherwise "cors" (default),
    /// "same-origin" or "no-cors".
    #[serde(default)]
    pub mode: RequestMode,

    /// Request headers forwarded to the network.
    #[serde(default)]
    pub headers: Vec<HeaderParam>,

    /// Wait for background cache writes before returning (default: true).
    #[serde(default = "default_true")]
    pub wait_until: bool,
}

fn default_true() -> bool {
    true
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerFetchOutput {
    pub url: String,
    /// False when the request bypassed the worker.
    pub intercepted: bool,
    /// The bypass rule, for requests that were not intercepted.
    pub rule: Option<String>,
    pub strategy: Option<Strategy>,
    pub source: Option<ResponseSource>,
    /// Whether all background work had finished when the tool returned.
    pub settled: bool,
    pub response: ResponseView,
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(
    worker: &Worker, network: &dyn Network, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve_url(worker.origin(), &params.url)?;
    let method = parse_method(&params.method)?;

    let mut request = Request::new(&method, url, params.mode);
    for header in &params.headers {
        request = request.with_header(&header.name, &header.value);
    }

    let output = match worker.on_fetch(request.clone()).await {
        FetchOutcome::Passthrough { rule } => {
            let response = network.fetch(&request).await.map_err(Error::from)?;
            WorkerFetchOutput {
                url: request.url.to_string(),
                intercepted: false,
                rule: Some(rule),
                strategy: Some(Strategy::Bypass),
                source: Some(ResponseSource::Network),
                settled: true,
                response: ResponseView::from(&response),
            }
        }
        FetchOutcome::Responded(mut responded) => {
            if params.wait_until {
                responded.settle().await;
            }
            WorkerFetchOutput {
                url: request.url.to_string(),
                intercepted: true,
                rule: None,
                strategy: Some(responded.strategy),
                source: Some(responded.source),
                settled: responded.is_settled(),
                response: ResponseView::from(&responded.response),
            }
        }
    };

    json_result(&output)
}
