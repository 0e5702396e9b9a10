//! Push relay: turning push messages into notifications and handling clicks.

use serde::Serialize;
use serde_json::Value;

use super::Worker;
use crate::Error;
use crate::request::resolve;

/// Recognized payload fields. Anything else in the message is ignored.
#[derive(Debug, Default)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
}

impl PushPayload {
    /// Each field is taken on its own; a missing or non-string field leaves
    /// only that field unset.
    fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => {
                let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
                Self { title: field("title"), body: field("body") }
            }
            Err(e) => {
                tracing::warn!(error = %e, bytes = bytes.len(), "unreadable push payload; using defaults");
                Self::default()
            }
        }
    }
}

/// Notification handed to the host for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    /// Arrival time in milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickOutcome {
    pub closed: bool,
    /// URL of the window opened or focused, if any.
    pub opened: Option<String>,
}

impl Worker {
    /// Show a notification for a push message.
    ///
    /// A missing, malformed, or partial payload falls back to the configured
    /// defaults field by field; the notification is always shown.
    pub async fn on_push(&self, payload: Option<&[u8]>) -> Result<Notification, Error> {
        let parsed = payload.map(PushPayload::parse).unwrap_or_default();

        let notification = self.build_notification(parsed);
        self.host.show_notification(&notification).await?;
        Ok(notification)
    }

    fn build_notification(&self, payload: PushPayload) -> Notification {
        let push = &self.push;
        Notification {
            title: payload.title.unwrap_or_else(|| push.default_title.clone()),
            body: payload.body.unwrap_or_else(|| push.default_body.clone()),
            icon: push.icon.clone(),
            badge: push.badge.clone(),
            vibrate: push.vibrate.clone(),
            actions: push
                .actions
                .iter()
                .map(|a| NotificationAction { action: a.action.clone(), title: a.title.clone(), icon: a.icon.clone() })
                .collect(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
        }
    }

    /// Close the clicked notification and, for the open action, bring up a
    /// window on the configured page.
    pub async fn on_notification_click(&self, action: Option<&str>) -> Result<ClickOutcome, Error> {
        self.host.close_notification().await?;

        if action != Some(self.push.open_action.as_str()) {
            tracing::debug!(action = ?action, "notification dismissed");
            return Ok(ClickOutcome { closed: true, opened: None });
        }

        let target = resolve(&self.origin, &self.push.open_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.push.open_url)))?;
        self.host.open_window(&target).await?;
        Ok(ClickOutcome { closed: true, opened: Some(target.to_string()) })
    }
}
