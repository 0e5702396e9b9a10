//! worker_install and worker_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{ActivateOutcome, Error, HostAction, InstallOutcome, RecordingHost, Worker};

use crate::tools::json_result;

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Activate the generation right after a successful install.
    #[serde(default)]
    pub activate: bool,
}

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerInstallOutput {
    pub install: InstallOutcome,
    /// Present when `activate` was requested.
    pub activate: Option<ActivateOutcome>,
    pub host_actions: Vec<HostAction>,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerActivateOutput {
    pub activate: ActivateOutcome,
    pub host_actions: Vec<HostAction>,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(
    worker: &Worker, host: &RecordingHost, params: WorkerInstallParams,
) -> Result<CallToolResult, McpError> {
    let result = async {
        let install = worker.on_install().await?;
        let activate = if params.activate { Some(worker.on_activate().await?) } else { None };
        Ok::<_, Error>((install, activate))
    }
    .await;

    let ((install, activate), host_actions) = with_host_actions(host, result).await?;
    json_result(&WorkerInstallOutput { install, activate, host_actions })
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &Worker, host: &RecordingHost) -> Result<CallToolResult, McpError> {
    let result = worker.on_activate().await;
    let (activate, host_actions) = with_host_actions(host, result).await?;
    json_result(&WorkerActivateOutput { activate, host_actions })
}

/// Drain the host whether or not the event succeeded, so actions recorded
/// before a failure never show up in a later call's output.
async fn with_host_actions<T>(
    host: &RecordingHost, result: Result<T, Error>,
) -> Result<(T, Vec<HostAction>), McpError> {
    let host_actions = host.drain().await;
    match result {
        Ok(value) => Ok((value, host_actions)),
        Err(e) => {
            if !host_actions.is_empty() {
                tracing::warn!(error = %e, dropped = host_actions.len(), "event failed after host actions were recorded");
            }
            Err(e.into())
        }
    }
}
