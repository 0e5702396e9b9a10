//! Test doubles for the worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Network, NetworkError, RecordingHost, Worker};
use crate::cache::CacheDb;
use crate::config::AppConfig;
use crate::request::{Request, StoredResponse};

pub(crate) const SHELL_BODY: &str = "<html>shell</html>";
pub(crate) const LOGO_BYTES: &[u8] = &[0x89, b'P', b'N', b'G'];

/// In-memory origin. Unscripted URLs fail with a connection error, so a
/// fresh `ScriptedNetwork` behaves like being offline.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Result<StoredResponse, NetworkError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, response: StoredResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), Ok(response));
    }

    pub(crate) fn fail(&self, url: &str, error: NetworkError) {
        self.routes.lock().unwrap().insert(url.to_string(), Err(error));
    }

    /// Drop every scripted response.
    pub(crate) fn go_offline(&self) {
        self.routes.lock().unwrap().clear();
    }

    /// Script the manifest used by [`test_worker`].
    pub(crate) fn serve_manifest(&self) {
        self.respond(
            "https://app.test/",
            StoredResponse::new(200, SHELL_BODY).with_header("content-type", "text/html"),
        );
        self.respond(
            "https://app.test/logo.png",
            StoredResponse::new(200, LOGO_BYTES.to_vec()).with_header("content-type", "image/png"),
        );
        self.respond("https://cdn.test/lib.js", StoredResponse::new(200, "lib()"));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, NetworkError> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        self.routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Err(NetworkError::Connect(format!("no route to {url}"))))
    }
}

/// Worker over an in-memory cache with origin `https://app.test`, version
/// `v1`, and manifest `/`, `/logo.png`, `https://cdn.test/lib.js`.
pub(crate) async fn test_worker(
    customize: impl FnOnce(&mut AppConfig),
) -> (Worker, Arc<ScriptedNetwork>, Arc<RecordingHost>) {
    let cache = CacheDb::open_in_memory().await.unwrap();
    worker_on(cache, customize)
}

/// Like [`test_worker`] but over an existing cache, to model a worker
/// restart or a new version sharing the same storage.
pub(crate) fn worker_on(
    cache: CacheDb, customize: impl FnOnce(&mut AppConfig),
) -> (Worker, Arc<ScriptedNetwork>, Arc<RecordingHost>) {
    let mut config = AppConfig { origin: "https://app.test".into(), ..Default::default() };
    config.policy.version = "v1".into();
    config.policy.manifest = vec!["/".into(), "/logo.png".into(), "https://cdn.test/lib.js".into()];
    customize(&mut config);

    let network = Arc::new(ScriptedNetwork::new());
    let host = Arc::new(RecordingHost::new());
    let worker = Worker::new(&config, cache, network.clone(), host.clone()).unwrap();
    (worker, network, host)
}
