//! The offline cache worker.
//!
//! A [`Worker`] owns no mutable state: configuration is fixed at
//! construction and everything durable lives in [`CacheDb`]. It can be
//! dropped and rebuilt between events without losing anything, which is how
//! a browser treats service workers too.
//!
//! Events arrive through [`Worker::dispatch`], or through the individual
//! `on_*` handlers when the caller already knows the event kind.

mod fetch;
mod host;
mod lifecycle;
mod network;
mod push;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use bytes::Bytes;
use url::Url;

pub use fetch::{FetchOutcome, Responded, ResponseSource};
pub use host::{ClientHost, HostAction, RecordingHost};
pub use lifecycle::{ActivateOutcome, EvictionFailure, InstallOutcome};
pub use network::{Network, NetworkError};
pub use push::{ClickOutcome, Notification, NotificationAction, NotificationData};

use crate::cache::CacheDb;
use crate::config::{AppConfig, CachePolicyConfig, PushConfig};
use crate::manifest::AssetManifest;
use crate::request::{Request, RequestKey, StoredResponse, resolve};
use crate::routing::RouteTable;
use crate::Error;

/// An event delivered by the host runtime.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    /// Raw push payload, if the message carried one.
    Push(Option<Bytes>),
    NotificationClick { action: Option<String> },
}

/// Result of handling one [`WorkerEvent`].
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated(ActivateOutcome),
    Fetched(FetchOutcome),
    Notified(Notification),
    Clicked(ClickOutcome),
}

/// Offline asset cache manager.
pub struct Worker {
    origin: Url,
    policy: CachePolicyConfig,
    push: PushConfig,
    manifest: AssetManifest,
    routes: RouteTable,
    shell: RequestKey,
    cache: CacheDb,
    network: Arc<dyn Network>,
    host: Arc<dyn ClientHost>,
}

impl Worker {
    /// Build a worker from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, a manifest entry, or the
    /// shell path cannot be resolved.
    pub fn new(
        config: &AppConfig, cache: CacheDb, network: Arc<dyn Network>, host: Arc<dyn ClientHost>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = AssetManifest::resolve(&origin, &config.policy.manifest)?;
        let routes = RouteTable::from_policy(&config.policy, &manifest);
        let shell = resolve(&origin, &config.policy.shell_path)
            .map(RequestKey::get)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.policy.shell_path)))?;

        tracing::debug!(
            version = %config.policy.version,
            manifest = manifest.len(),
            rules = routes.rules().len(),
            "worker configured"
        );

        Ok(Self {
            origin,
            policy: config.policy.clone(),
            push: config.push.clone(),
            manifest,
            routes,
            shell,
            cache,
            network,
            host,
        })
    }

    /// Single entry point for host events.
    ///
    /// Fetch events never fail; see [`Worker::on_fetch`].
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => self.on_install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.on_activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch(request) => Ok(EventOutcome::Fetched(self.on_fetch(request).await)),
            WorkerEvent::Push(payload) => self.on_push(payload.as_deref()).await.map(EventOutcome::Notified),
            WorkerEvent::NotificationClick { action } => self
                .on_notification_click(action.as_deref())
                .await
                .map(EventOutcome::Clicked),
        }
    }

    /// Label of the generation this worker installs and serves.
    pub fn version(&self) -> &str {
        &self.policy.version
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    fn degraded_response(&self) -> StoredResponse {
        StoredResponse::degraded(self.policy.degraded.status, &self.policy.degraded.body)
    }
}
