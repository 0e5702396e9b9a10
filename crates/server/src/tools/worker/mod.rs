//! Worker event tools.
//!
//! Each tool delivers one event to the worker and reports the outcome along
//! with the host actions (skip waiting, notifications, windows) it caused.

pub mod fetch;
pub mod lifecycle;
pub mod push;

pub use fetch::{WorkerFetchParams, fetch_impl};
pub use lifecycle::{WorkerInstallParams, activate_impl, install_impl};
pub use push::{WorkerNotificationClickParams, WorkerPushParams, click_impl, push_impl};
