//! Client code for shellcache.
//!
//! This crate provides the HTTP side of the worker: a reqwest-backed
//! [`Network`](shellcache_core::Network) that talks to the origin server.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork};
