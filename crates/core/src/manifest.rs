//! Pre-cache asset manifest.

use std::collections::HashSet;

use url::Url;

use crate::Error;
use crate::request::{RequestKey, resolve};

/// The fixed list of GET keys that must be cached before a generation can
/// become current. Entries are resolved against the worker origin and
/// de-duplicated in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    keys: Vec<RequestKey>,
}

impl AssetManifest {
    pub fn resolve(origin: &Url, entries: &[String]) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
            let key = RequestKey::get(url);
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[RequestKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `origin + path` of every entry, the form asset routing matches on.
    pub fn asset_paths(&self) -> HashSet<String> {
        self.keys.iter().map(|key| origin_and_path(key.url())).collect()
    }
}

/// `https://host:port/path` without query or fragment.
pub(crate) fn origin_and_path(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}
