//! Fetch interception: strategy execution and the fallback chain.

use serde::Serialize;
use tokio::task::JoinHandle;

use super::Worker;
use crate::cache::CacheDb;
use crate::request::{Request, RequestKey, StoredResponse};
use crate::routing::Strategy;

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// The cached shell document, served in place of an uncached navigation.
    Shell,
    /// Synthesized because nothing else could answer.
    Degraded,
}

/// A response chosen by the worker, plus any background work it started.
#[derive(Debug)]
pub struct Responded {
    pub response: StoredResponse,
    pub source: ResponseSource,
    pub strategy: Strategy,
    wait_until: Option<JoinHandle<()>>,
}

impl Responded {
    fn new(response: StoredResponse, source: ResponseSource, strategy: Strategy) -> Self {
        Self { response, source, strategy, wait_until: None }
    }

    fn waiting_on(mut self, task: Option<JoinHandle<()>>) -> Self {
        self.wait_until = task;
        self
    }

    /// Whether background work (a cache put or revalidation) is still owed.
    pub fn is_settled(&self) -> bool {
        self.wait_until.is_none()
    }

    /// Wait for background work to finish. The response is already final;
    /// this only keeps the event alive until the cache write lands.
    pub async fn settle(&mut self) {
        if let Some(task) = self.wait_until.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "background cache task aborted");
        }
    }
}

/// Result of a fetch event.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted: the caller should hit the network directly.
    Passthrough { rule: String },
    Responded(Responded),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&StoredResponse> {
        match self {
            FetchOutcome::Passthrough { .. } => None,
            FetchOutcome::Responded(responded) => Some(&responded.response),
        }
    }

    pub async fn settle(&mut self) {
        if let FetchOutcome::Responded(responded) = self {
            responded.settle().await;
        }
    }
}

impl Worker {
    /// Answer an intercepted request.
    ///
    /// Never fails: transport errors walk the fallback chain (cache, then
    /// shell document for navigations, then the degraded response) and
    /// storage errors count as cache misses.
    pub async fn on_fetch(&self, request: Request) -> FetchOutcome {
        let rule = self.routes.classify(&request);
        tracing::debug!(method = %request.method, url = %request.url, %rule, "routed request");

        let responded = match rule.strategy {
            Strategy::Bypass => return FetchOutcome::Passthrough { rule: rule.to_string() },
            Strategy::CacheFirst => self.cache_first(&request).await,
            Strategy::NetworkFirst => self.network_first(&request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(&request).await,
        };

        tracing::debug!(
            url = %request.url,
            status = responded.response.status,
            source = ?responded.source,
            "responded"
        );
        FetchOutcome::Responded(responded)
    }

    async fn cache_first(&self, request: &Request) -> Responded {
        let key = request.key();
        if let Some(cached) = self.lookup(&key).await {
            return Responded::new(cached, ResponseSource::Cache, Strategy::CacheFirst);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let task = response.is_success().then(|| self.store_in_background(key, response.clone()));
                Responded::new(response, ResponseSource::Network, Strategy::CacheFirst).waiting_on(task)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed on cache miss");
                self.fallback(request, Strategy::CacheFirst, false).await
            }
        }
    }

    async fn network_first(&self, request: &Request) -> Responded {
        match self.network.fetch(request).await {
            Ok(response) => {
                let task = (self.policy.refresh_on_network_first && response.is_success())
                    .then(|| self.store_in_background(request.key(), response.clone()));
                Responded::new(response, ResponseSource::Network, Strategy::NetworkFirst).waiting_on(task)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed; falling back");
                self.fallback(request, Strategy::NetworkFirst, true).await
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Responded {
        let key = request.key();
        if let Some(cached) = self.lookup(&key).await {
            let task = self.revalidate_in_background(request.clone());
            return Responded::new(cached, ResponseSource::Cache, Strategy::StaleWhileRevalidate).waiting_on(Some(task));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let task = response.is_success().then(|| self.store_in_background(key, response.clone()));
                Responded::new(response, ResponseSource::Network, Strategy::StaleWhileRevalidate).waiting_on(task)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed on cache miss");
                self.fallback(request, Strategy::StaleWhileRevalidate, false).await
            }
        }
    }

    /// Cache entry (when not already checked), then shell document for
    /// navigations, then the degraded response.
    async fn fallback(&self, request: &Request, strategy: Strategy, check_cache: bool) -> Responded {
        if check_cache && let Some(cached) = self.lookup(&request.key()).await {
            return Responded::new(cached, ResponseSource::Cache, strategy);
        }

        if request.is_navigation()
            && let Some(shell) = self.lookup(&self.shell).await
        {
            tracing::debug!(url = %request.url, shell = %self.shell.url(), "serving shell document");
            return Responded::new(shell, ResponseSource::Shell, strategy);
        }

        tracing::warn!(url = %request.url, "no cached response; serving degraded response");
        Responded::new(self.degraded_response(), ResponseSource::Degraded, strategy)
    }

    async fn lookup(&self, key: &RequestKey) -> Option<StoredResponse> {
        match self.cache.match_current(key).await {
            Ok(Some(response)) => {
                tracing::debug!(%key, "cache hit");
                Some(response)
            }
            Ok(None) => {
                tracing::debug!(%key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    fn store_in_background(&self, key: RequestKey, response: StoredResponse) -> JoinHandle<()> {
        let cache = self.cache.clone();
        tokio::spawn(async move { put_current(&cache, &key, &response).await })
    }

    fn revalidate_in_background(&self, request: Request) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let network = self.network.clone();
        tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_success() => put_current(&cache, &request.key(), &response).await,
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "revalidation not cacheable")
                }
                Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
            }
        })
    }
}

/// Write into whichever generation is current when the write happens.
async fn put_current(cache: &CacheDb, key: &RequestKey, response: &StoredResponse) {
    let label = match cache.current_generation().await {
        Ok(Some(generation)) => generation.label,
        Ok(None) => {
            tracing::debug!(%key, "no current generation; skipping cache put");
            return;
        }
        Err(e) => {
            tracing::warn!(%key, error = %e, "failed to read current generation");
            return;
        }
    };

    match cache.put_entry(&label, key, response).await {
        Ok(()) => tracing::debug!(%key, %label, "cached response"),
        Err(e) => tracing::warn!(%key, %label, error = %e, "failed to cache response"),
    }
}
