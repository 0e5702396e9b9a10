//! cache_delete tool implementation.
//!
//! Deletes a single entry or a whole generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{RequestKey, Worker};

use crate::error::ToolError;
use crate::tools::{default_method, json_result, parse_method, resolve_url};

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Entry to delete. Without it, the whole `generation` is deleted.
    #[serde(default)]
    pub url: Option<String>,

    /// HTTP method of the entry (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Generation label. Defaults to the current generation when deleting
    /// an entry; required when deleting a generation.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheDeleteOutput {
    /// What was targeted: an entry key or a generation label.
    pub target: String,
    pub generation: String,
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(worker: &Worker, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let cache = worker.cache();

    let output = match (params.url, params.generation) {
        (Some(url), generation) => {
            let key = RequestKey::new(&parse_method(&params.method)?, resolve_url(worker.origin(), &url)?);
            let label = match generation {
                Some(label) => label,
                None => cache
                    .current_generation()
                    .await?
                    .map(|g| g.label)
                    .ok_or_else(|| ToolError::InvalidInput("no current generation; pass `generation`".into()))?,
            };
            let deleted = cache.delete_entry(&label, &key).await?;
            CacheDeleteOutput { target: key.to_string(), generation: label, deleted }
        }
        (None, Some(label)) => {
            let deleted = cache.delete_generation(&label).await?;
            CacheDeleteOutput { target: label.clone(), generation: label, deleted }
        }
        (None, None) => {
            return Err(ToolError::InvalidInput("At least one of url or generation must be specified".into()).into());
        }
    };

    tracing::info!(target_key = %output.target, generation = %output.generation, deleted = output.deleted, "cache delete");
    json_result(&output)
}
