//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and pruning the generation
//! store without going through a fetch event.

pub mod delete;
pub mod get;
pub mod status;

pub use delete::{CacheDeleteParams, delete_impl};
pub use get::{CacheGetParams, get_impl};
pub use status::{CacheStatusParams, status_impl};
