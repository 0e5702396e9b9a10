//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CacheDeleteParams, CacheGetParams, CacheStatusParams, WorkerFetchParams, WorkerInstallParams,
    WorkerNotificationClickParams, WorkerPushParams, cache, worker,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_core::{Network, RecordingHost, Worker};

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
    host: Arc<RecordingHost>,
    network: Arc<dyn Network>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellcacheServer {
    /// Create a new server handler.
    ///
    /// `host` must be the host the worker was built with, so each tool can
    /// report the actions its event caused.
    pub fn new(worker: Arc<Worker>, host: Arc<RecordingHost>, network: Arc<dyn Network>) -> Self {
        Self { tool_router: Self::tool_router(), worker, host, network }
    }

    #[tool(
        description = "Install the configured cache version: fetch every manifest asset and store them as a new generation. Fails without writing anything if any asset fails."
    )]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        worker::install_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(
        description = "Activate the installed cache version: delete every other generation and make this one current."
    )]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        worker::activate_impl(&self.worker, &self.host).await
    }

    /// Deliver a fetch event.
    ///
    /// Intercepted requests are answered by the worker's strategy and
    /// fallback chain; bypassed requests go straight to the network.
    #[tool(
        description = "Fetch a URL through the offline cache worker. Returns the response plus the strategy and source (cache, network, shell, degraded) that produced it."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        worker::fetch_impl(&self.worker, self.network.as_ref(), params.0).await
    }

    #[tool(description = "Deliver a push message and show the resulting notification.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        worker::push_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Deliver a notification click, optionally on an action button.")]
    async fn worker_notification_click(
        &self, params: Parameters<WorkerNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        worker::click_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Show cache generations, the pre-cache manifest, and the routing rules.")]
    async fn cache_status(&self, params: Parameters<CacheStatusParams>) -> Result<CallToolResult, McpError> {
        cache::status_impl(&self.worker, params.0).await
    }

    #[tool(description = "Read a stored response from the current generation or a named one.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a stored entry, or a whole generation.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        cache::delete_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline asset cache worker. Run worker_install then worker_activate, then send requests with worker_fetch."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
