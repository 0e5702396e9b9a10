//! worker_push and worker_notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{ClickOutcome, HostAction, Notification, RecordingHost, Worker};

use crate::tools::json_result;

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Raw push message. Normally JSON `{"title": ..., "body": ...}`; any
    /// other content falls back to the default notification.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the worker_push tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerPushOutput {
    pub notification: Notification,
    pub host_actions: Vec<HostAction>,
}

/// Parameters for the worker_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerNotificationClickParams {
    /// Action button that was clicked, or none for the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Output from the worker_notification_click tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerNotificationClickOutput {
    pub click: ClickOutcome,
    pub host_actions: Vec<HostAction>,
}

/// Implementation of the worker_push tool.
pub async fn push_impl(
    worker: &Worker, host: &RecordingHost, params: WorkerPushParams,
) -> Result<CallToolResult, McpError> {
    let notification = worker.on_push(params.payload.as_deref().map(str::as_bytes)).await?;
    let output = WorkerPushOutput { notification, host_actions: host.drain().await };
    json_result(&output)
}

/// Implementation of the worker_notification_click tool.
pub async fn click_impl(
    worker: &Worker, host: &RecordingHost, params: WorkerNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let click = worker.on_notification_click(params.action.as_deref()).await?;
    let output = WorkerNotificationClickOutput { click, host_actions: host.drain().await };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{harness, output_json};

    #[tokio::test]
    async fn test_push_shows_notification() {
        let h = harness().await;
        let params = WorkerPushParams { payload: Some(r#"{"title":"Alert","body":"Moved"}"#.into()) };

        let result = push_impl(&h.worker, &h.host, params).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["notification"]["title"], "Alert");
        assert_eq!(output["notification"]["vibrate"], serde_json::json!([100, 50, 100]));
        assert_eq!(output["host_actions"][0]["action"], "show_notification");
        assert!(h.host.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_push_garbage_uses_defaults() {
        let h = harness().await;
        let params = WorkerPushParams { payload: Some("{not json".into()) };

        let result = push_impl(&h.worker, &h.host, params).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["notification"]["title"], "New notification");
    }

    #[tokio::test]
    async fn test_click_explore_opens_window() {
        let h = harness().await;
        let params = WorkerNotificationClickParams { action: Some("explore".into()) };

        let result = click_impl(&h.worker, &h.host, params).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["click"]["opened"], "https://app.test/");
        assert_eq!(output["host_actions"][0]["action"], "close_notification");
        assert_eq!(output["host_actions"][1]["action"], "open_window");
    }

    #[tokio::test]
    async fn test_click_close_only_closes() {
        let h = harness().await;
        let params = WorkerNotificationClickParams { action: Some("close".into()) };

        let result = click_impl(&h.worker, &h.host, params).await.unwrap();
        let output = output_json(&result);
        assert!(output["click"]["opened"].is_null());
        assert_eq!(output["host_actions"].as_array().unwrap().len(), 1);
    }
}
