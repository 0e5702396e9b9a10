//! SQLite-backed cache storage for versioned generations.
//!
//! This module provides the durable request→response store the worker
//! arbitrates over, using SQLite with async access via tokio-rusqlite:
//!
//! - One row per generation, at most one of them `current`
//! - Entries keyed by a SHA-256 digest of method and canonical URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntryRecord;
pub use generations::{Generation, GenerationState};
