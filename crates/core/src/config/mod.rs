//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*, nested keys split on `__`)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Everything the worker used to hard-code (cache name, pre-cache list,
//! exclusion rules) lives in [`CachePolicyConfig`], so two deployments differ
//! by configuration rather than by code.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache storage.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker is scoped to. Root-relative manifest entries and
    /// the shell document resolve against it.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to accept per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Versioned caching policy.
    #[serde(default)]
    pub policy: CachePolicyConfig,

    /// Push notification presentation.
    #[serde(default)]
    pub push: PushConfig,
}

/// The versioned cache policy: generation label, pre-cache manifest, and
/// routing rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicyConfig {
    /// Label of the generation this configuration installs and activates.
    #[serde(default = "default_version")]
    pub version: String,

    /// URLs that must be cached before a generation may become current.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served to navigations that cannot be answered otherwise.
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Ask the host to activate right after a successful install.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of open clients right after activation.
    #[serde(default = "default_true")]
    pub claim_clients: bool,

    /// Store successful network-first responses in the background.
    #[serde(default)]
    pub refresh_on_network_first: bool,

    /// Requests that are never intercepted.
    #[serde(default = "default_bypass")]
    pub bypass: RuleSet,

    /// Requests served from cache when present.
    #[serde(default = "default_cache_first")]
    pub cache_first: RuleSet,

    /// Requests served from cache and refreshed in the background.
    #[serde(default)]
    pub stale_while_revalidate: RuleSet,

    /// Response synthesized when neither network nor cache can answer.
    #[serde(default)]
    pub degraded: DegradedConfig,
}

/// Request predicates for one strategy. A request matches the set when it
/// matches any single predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub path_prefixes: Vec<String>,
    #[serde(default)]
    pub exact_paths: Vec<String>,
    #[serde(default)]
    pub host_suffixes: Vec<String>,
    /// File extensions without the leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedConfig {
    #[serde(default = "default_degraded_status")]
    pub status: u16,
    #[serde(default = "default_degraded_body")]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Title used when the payload is missing or unreadable.
    #[serde(default = "default_push_title")]
    pub default_title: String,

    /// Body used when the payload is missing or unreadable.
    #[serde(default = "default_push_body")]
    pub default_body: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_icon")]
    pub badge: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    #[serde(default = "default_actions")]
    pub actions: Vec<ActionConfig>,

    /// Action that opens a client window when clicked.
    #[serde(default = "default_open_action")]
    pub open_action: String,

    /// Where the open action navigates to, relative to the origin.
    #[serde(default = "default_shell_path")]
    pub open_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub action: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "shellcache-v1".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into()]
}

fn default_shell_path() -> String {
    "/".into()
}

fn default_bypass() -> RuleSet {
    RuleSet { path_prefixes: vec!["/api/".into()], exact_paths: vec!["/health".into()], ..Default::default() }
}

fn default_cache_first() -> RuleSet {
    RuleSet {
        host_suffixes: vec!["gstatic.com".into(), "googleapis.com".into(), "unpkg.com".into()],
        extensions: ["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf", "otf"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..Default::default()
    }
}

fn default_degraded_status() -> u16 {
    408
}

fn default_degraded_body() -> String {
    "Network error happened".into()
}

fn default_push_title() -> String {
    "New notification".into()
}

fn default_push_body() -> String {
    "You have a new message.".into()
}

fn default_icon() -> String {
    "/logo.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_actions() -> Vec<ActionConfig> {
    vec![
        ActionConfig { action: "explore".into(), title: "Open dashboard".into(), icon: Some(default_icon()) },
        ActionConfig { action: "close".into(), title: "Close".into(), icon: Some(default_icon()) },
    ]
}

fn default_open_action() -> String {
    "explore".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            policy: CachePolicyConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            manifest: default_manifest(),
            shell_path: default_shell_path(),
            skip_waiting: true,
            claim_clients: true,
            refresh_on_network_first: false,
            bypass: default_bypass(),
            cache_first: default_cache_first(),
            stale_while_revalidate: RuleSet::default(),
            degraded: DegradedConfig::default(),
        }
    }
}

impl Default for DegradedConfig {
    fn default() -> Self {
        Self { status: default_degraded_status(), body: default_degraded_body() }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            default_title: default_push_title(),
            default_body: default_push_body(),
            icon: default_icon(),
            badge: default_icon(),
            vibrate: default_vibrate(),
            actions: default_actions(),
            open_action: default_open_action(),
            open_url: default_shell_path(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed worker origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SHELLCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}
