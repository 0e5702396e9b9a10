//! cache_get tool implementation.
//!
//! Reads one stored response, from the current generation or a named one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, RequestKey, Worker};

use crate::tools::{ResponseView, default_method, json_result, parse_method, resolve_url};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the worker origin.
    pub url: String,

    /// HTTP method of the stored entry (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Generation label to read from. Defaults to the current generation.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub key: String,
    /// The generation asked for, or none for the current one.
    pub generation: Option<String>,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve_url(worker.origin(), &params.url)?;
    let key = RequestKey::new(&parse_method(&params.method)?, url);

    let found = match &params.generation {
        Some(label) => worker.cache().match_entry(label, &key).await?,
        None => worker.cache().match_current(&key).await?,
    };
    let response = found.ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let output = CacheGetOutput { key: key.to_string(), generation: params.generation, response: (&response).into() };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{harness, output_json};
    use rmcp::model::ErrorCode;

    fn params(url: &str, generation: Option<&str>) -> CacheGetParams {
        CacheGetParams { url: url.into(), method: default_method(), generation: generation.map(String::from) }
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let h = harness().await;
        let err = get_impl(&h.worker, params("/logo.png", None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32001));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let h = harness().await;
        h.worker.on_install().await.unwrap();

        let err = get_impl(&h.worker, params("/", None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32001), "installed but not yet current");

        let result = get_impl(&h.worker, params("/", Some("v1"))).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["key"], "GET https://app.test/");
        assert_eq!(output["response"]["body"], "<html>shell</html>");

        h.worker.on_activate().await.unwrap();
        assert!(get_impl(&h.worker, params("https://app.test/", None)).await.is_ok());
    }
}
