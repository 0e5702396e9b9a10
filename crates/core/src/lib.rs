//! Core types and the offline cache engine for shellcache.
//!
//! This crate provides:
//! - Versioned cache storage with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - Request routing and the event-driven [`Worker`]

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod request;
pub mod routing;
pub mod worker;

pub use cache::{CacheDb, EntryRecord, Generation, GenerationState};
pub use config::{AppConfig, CachePolicyConfig, ConfigError, PushConfig, RuleSet};
pub use error::Error;
pub use manifest::AssetManifest;
pub use request::{Request, RequestKey, RequestMode, StoredResponse};
pub use routing::{Matcher, RouteTable, RoutingRule, Strategy};
pub use worker::{
    ActivateOutcome, ClickOutcome, ClientHost, EventOutcome, FetchOutcome, HostAction, InstallOutcome, Network,
    NetworkError, Notification, RecordingHost, Responded, ResponseSource, Worker, WorkerEvent,
};
