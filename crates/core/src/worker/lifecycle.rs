//! Install and activate: creating, promoting, and sweeping generations.

use std::collections::HashSet;

use futures_util::future::try_join_all;
use serde::Serialize;

use super::Worker;
use crate::Error;
use crate::request::{Request, RequestKey, StoredResponse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstallOutcome {
    /// A generation was populated from the manifest and awaits activation
    /// (or already was current and got its manifest entries refreshed).
    Installed { label: String, entries: usize },
    /// The label is already current and holds every manifest entry.
    AlreadyCurrent { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvictionFailure {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateOutcome {
    pub label: String,
    pub evicted: Vec<String>,
    pub eviction_failures: Vec<EvictionFailure>,
    pub claimed: bool,
}

impl Worker {
    /// Populate the generation for this worker's version from the manifest.
    ///
    /// Every manifest entry is fetched before anything is written. A
    /// transport failure or a non-2xx status on any entry fails the whole
    /// install and leaves storage untouched.
    pub async fn on_install(&self) -> Result<InstallOutcome, Error> {
        let label = self.policy.version.clone();

        if let Some(generation) = self.cache.generation(&label).await?
            && generation.is_current()
        {
            let stored: HashSet<RequestKey> = self.cache.keys(&label).await?.into_iter().collect();
            if self.manifest.keys().iter().all(|key| stored.contains(key)) {
                tracing::info!(%label, "generation already current and complete; nothing to install");
                return Ok(InstallOutcome::AlreadyCurrent { label });
            }
        }

        tracing::info!(%label, assets = self.manifest.len(), "pre-caching manifest");

        let fetches = self.manifest.keys().iter().map(|key| self.fetch_manifest_entry(key));
        let entries = try_join_all(fetches).await.inspect_err(|e| {
            tracing::warn!(%label, error = %e, "install failed; generation not written");
        })?;

        let written = self.cache.install_generation(&label, entries).await?;
        tracing::info!(%label, entries = written, "generation installed");

        if self.policy.skip_waiting
            && let Err(e) = self.host.skip_waiting().await
        {
            tracing::warn!(error = %e, "host refused skip waiting");
        }

        Ok(InstallOutcome::Installed { label, entries: written })
    }

    async fn fetch_manifest_entry(&self, key: &RequestKey) -> Result<(RequestKey, StoredResponse), Error> {
        let request = Request::get(key.url().clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: key.url().to_string(), reason: e.to_string() })?;

        if !response.is_success() {
            return Err(Error::InstallFailed {
                url: key.url().to_string(),
                reason: format!("status {}", response.status),
            });
        }

        tracing::debug!(url = %key.url(), bytes = response.body.len(), "pre-cached");
        Ok((key.clone(), response))
    }

    /// Sweep every other generation and make this version current.
    ///
    /// Refuses to run when this version was never installed, so a failed
    /// install cannot wipe the generation that is still serving. Deleting a
    /// stale generation is best-effort: failures are logged, reported, and do
    /// not stop the sweep or the promotion.
    pub async fn on_activate(&self) -> Result<ActivateOutcome, Error> {
        let label = self.policy.version.clone();

        if self.cache.generation(&label).await?.is_none() {
            tracing::warn!(%label, "activate requested before a successful install");
            return Err(Error::NotInstalled(label));
        }

        let mut evicted = Vec::new();
        let mut eviction_failures = Vec::new();
        for generation in self.cache.generations().await? {
            if generation.label == label {
                continue;
            }
            match self.cache.delete_generation(&generation.label).await {
                Ok(_) => {
                    tracing::info!(stale = %generation.label, "evicted stale generation");
                    evicted.push(generation.label);
                }
                Err(e) => {
                    tracing::warn!(stale = %generation.label, error = %e, "failed to evict stale generation");
                    eviction_failures.push(EvictionFailure { label: generation.label, reason: e.to_string() });
                }
            }
        }

        self.cache.promote(&label).await?;
        tracing::info!(%label, evicted = evicted.len(), "generation activated");

        let claimed = if self.policy.claim_clients {
            match self.host.claim_clients().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "host refused client claim");
                    false
                }
            }
        } else {
            false
        };

        Ok(ActivateOutcome { label, evicted, eviction_failures, claimed })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{LOGO_BYTES, test_worker, worker_on};
    use super::super::{HostAction, NetworkError};
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_install_populates_generation() {
        let (worker, network, host) = test_worker(|_| {}).await;
        network.serve_manifest();

        let outcome = worker.on_install().await.unwrap();
        assert_eq!(outcome, InstallOutcome::Installed { label: "v1".into(), entries: 3 });

        let generation = worker.cache().generation("v1").await.unwrap().unwrap();
        assert_eq!(generation.entry_count, 3);
        assert!(!generation.is_current());
        assert_eq!(host.actions().await, vec![HostAction::SkipWaiting]);
    }

    #[tokio::test]
    async fn test_install_without_skip_waiting() {
        let (worker, network, host) = test_worker(|c| c.policy.skip_waiting = false).await;
        network.serve_manifest();

        worker.on_install().await.unwrap();
        assert!(host.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_install_is_idempotent_when_current() {
        let (worker, network, _host) = test_worker(|_| {}).await;
        network.serve_manifest();
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();

        let before = worker.cache().entries("v1").await.unwrap();
        let calls_before = network.calls();

        let outcome = worker.on_install().await.unwrap();
        assert_eq!(outcome, InstallOutcome::AlreadyCurrent { label: "v1".into() });

        let after = worker.cache().entries("v1").await.unwrap();
        let stamp = |records: &[crate::cache::EntryRecord]| {
            records
                .iter()
                .map(|r| (r.url.clone(), r.stored_at.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(stamp(&before), stamp(&after));
        assert_eq!(network.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_install_is_atomic_on_transport_failure() {
        let (worker, network, host) = test_worker(|_| {}).await;
        network.serve_manifest();
        network.fail("https://cdn.test/lib.js", NetworkError::Timeout("slow".into()));

        let result = worker.on_install().await;
        assert!(matches!(result, Err(Error::InstallFailed { ref url, .. }) if url == "https://cdn.test/lib.js"));
        assert!(worker.cache().generation("v1").await.unwrap().is_none());
        assert!(host.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let (worker, network, _host) = test_worker(|_| {}).await;
        network.serve_manifest();
        network.respond("https://app.test/logo.png", StoredResponse::new(404, "missing"));

        let result = worker.on_install().await;
        assert!(matches!(result, Err(Error::InstallFailed { ref reason, .. }) if reason == "status 404"));
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_generation_servable() {
        let (v1, network, _host) = test_worker(|_| {}).await;
        network.serve_manifest();
        v1.on_install().await.unwrap();
        v1.on_activate().await.unwrap();

        let (v2, network2, _host2) = worker_on(v1.cache().clone(), |c| c.policy.version = "v2".into());
        network2.serve_manifest();
        network2.fail("https://app.test/logo.png", NetworkError::Connect("offline".into()));

        assert!(v2.on_install().await.is_err());
        assert!(matches!(v2.on_activate().await, Err(Error::NotInstalled(_))));

        let current = v1.cache().current_generation().await.unwrap().unwrap();
        assert_eq!(current.label, "v1");
        assert_eq!(current.entry_count, 3);

        let key = RequestKey::get(url::Url::parse("https://app.test/logo.png").unwrap());
        let logo = v1.cache().match_current(&key).await.unwrap().unwrap();
        assert_eq!(logo.body, Bytes::from_static(LOGO_BYTES));
    }

    #[tokio::test]
    async fn test_activate_sweeps_every_other_generation() {
        for prior in 0..4 {
            let (worker, network, host) = test_worker(|c| c.policy.version = "v9".into()).await;
            for n in 0..prior {
                let label = format!("old-{n}");
                worker.cache().open_generation(&label).await.unwrap();
                if n == 0 {
                    worker.cache().promote(&label).await.unwrap();
                }
            }
            network.serve_manifest();
            worker.on_install().await.unwrap();

            let outcome = worker.on_activate().await.unwrap();
            assert_eq!(outcome.evicted.len(), prior);
            assert!(outcome.eviction_failures.is_empty());
            assert!(outcome.claimed);

            let generations = worker.cache().generations().await.unwrap();
            assert_eq!(generations.len(), 1);
            assert_eq!(generations[0].label, "v9");
            assert!(generations[0].is_current());
            assert!(host.actions().await.contains(&HostAction::ClaimClients));
        }
    }

    #[tokio::test]
    async fn test_activate_continues_past_failed_eviction() {
        let (worker, network, _host) = test_worker(|c| c.policy.version = "v9".into()).await;
        for label in ["a", "pinned", "c"] {
            worker.cache().open_generation(label).await.unwrap();
        }
        worker.cache().promote("pinned").await.unwrap();
        worker
            .cache()
            .conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER keep_pinned BEFORE DELETE ON generations
                     WHEN OLD.label = 'pinned'
                     BEGIN SELECT RAISE(ABORT, 'generation is pinned'); END;",
                )
            })
            .await
            .unwrap();
        network.serve_manifest();
        worker.on_install().await.unwrap();

        let outcome = worker.on_activate().await.unwrap();
        let mut evicted = outcome.evicted.clone();
        evicted.sort();
        assert_eq!(evicted, ["a", "c"]);
        assert_eq!(outcome.eviction_failures.len(), 1);
        assert_eq!(outcome.eviction_failures[0].label, "pinned");
        assert!(!outcome.eviction_failures[0].reason.is_empty());

        let generations = worker.cache().generations().await.unwrap();
        let current: Vec<_> = generations.iter().filter(|g| g.is_current()).map(|g| g.label.as_str()).collect();
        assert_eq!(current, ["v9"]);
        assert!(generations.iter().any(|g| g.label == "pinned" && !g.is_current()));
    }

    #[tokio::test]
    async fn test_activate_without_claim() {
        let (worker, network, host) = test_worker(|c| {
            c.policy.claim_clients = false;
            c.policy.skip_waiting = false;
        })
        .await;
        network.serve_manifest();
        worker.on_install().await.unwrap();

        let outcome = worker.on_activate().await.unwrap();
        assert!(!outcome.claimed);
        assert!(host.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_activate_before_install() {
        let (worker, _network, _host) = test_worker(|_| {}).await;
        let result = worker.on_activate().await;
        assert!(matches!(result, Err(Error::NotInstalled(label)) if label == "v1"));
    }
}
