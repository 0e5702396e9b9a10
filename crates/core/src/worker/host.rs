//! The runtime the worker reports back to.
//!
//! In a browser these calls would be `skipWaiting()`, `clients.claim()`,
//! `showNotification()` and `clients.openWindow()`. Here they go through
//! [`ClientHost`] so the engine can run anywhere.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use url::Url;

use super::push::Notification;
use crate::Error;

#[async_trait]
pub trait ClientHost: Send + Sync {
    /// Activate the freshly installed generation without waiting for old
    /// clients to go away.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Start controlling every open client immediately.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn close_notification(&self) -> Result<(), Error>;

    /// Focus an existing client on `url`, or open a new one.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

/// A request the worker made of its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    SkipWaiting,
    ClaimClients,
    ShowNotification { notification: Notification },
    CloseNotification,
    OpenWindow { url: String },
}

/// Host that logs and records every action.
///
/// Callers that relay actions elsewhere (e.g. in a tool response) drain the
/// log after each event.
#[derive(Debug, Default)]
pub struct RecordingHost {
    actions: Mutex<Vec<HostAction>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions recorded so far, oldest first.
    pub async fn actions(&self) -> Vec<HostAction> {
        self.actions.lock().await.clone()
    }

    /// Take and clear the recorded actions.
    pub async fn drain(&self) -> Vec<HostAction> {
        std::mem::take(&mut *self.actions.lock().await)
    }

    async fn record(&self, action: HostAction) {
        self.actions.lock().await.push(action);
    }
}

#[async_trait]
impl ClientHost for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        tracing::info!("skip waiting requested");
        self.record(HostAction::SkipWaiting).await;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        tracing::info!("claiming clients");
        self.record(HostAction::ClaimClients).await;
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, "showing notification");
        self.record(HostAction::ShowNotification { notification: notification.clone() })
            .await;
        Ok(())
    }

    async fn close_notification(&self) -> Result<(), Error> {
        self.record(HostAction::CloseNotification).await;
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "opening client window");
        self.record(HostAction::OpenWindow { url: url.to_string() }).await;
        Ok(())
    }
}
