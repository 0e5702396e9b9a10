//! cache_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{EntryRecord, Generation, Worker};

use crate::tools::json_result;

/// Parameters for the cache_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusParams {
    /// Also list the entries of the worker's own generation.
    #[serde(default)]
    pub entries: bool,
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusOutput {
    /// Label this worker installs and activates.
    pub version: String,
    pub origin: String,
    /// Label of the current generation, if any.
    pub current: Option<String>,
    pub generations: Vec<Generation>,
    pub manifest: Vec<String>,
    /// Routing rules in evaluation order.
    pub rules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryRecord>>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(worker: &Worker, params: CacheStatusParams) -> Result<CallToolResult, McpError> {
    let generations = worker.cache().generations().await?;
    let current = generations.iter().find(|g| g.is_current()).map(|g| g.label.clone());
    let entries = if params.entries { Some(worker.cache().entries(worker.version()).await?) } else { None };

    let output = CacheStatusOutput {
        version: worker.version().to_string(),
        origin: worker.origin().to_string(),
        current,
        generations,
        manifest: worker.manifest().keys().iter().map(|key| key.url().to_string()).collect(),
        rules: worker.routes().rules().iter().map(ToString::to_string).collect(),
        entries,
    };
    json_result(&output)
}
