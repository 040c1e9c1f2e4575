//! `datadog-http` is an async HTTP client for the Datadog v1 API.
//!
//! The crate wraps the `/api/v1/events` endpoints with ergonomic methods:
//! - [`DatadogClient::post_event`]
//! - [`DatadogClient::get_event`]
//! - [`DatadogClient::event_stream`]
//!
//! Repeated request timeouts trip a [`BackoffTracker`] that suspends traffic
//! for a cooldown period instead of hammering a failing endpoint; whether the
//! resulting failures are returned or just logged is a [`ClientConfig`]
//! policy decision.
//!
//! The companion `dog` binary (feature `cli`, on by default) exposes the
//! event operations on the command line.

mod backoff;
mod client;
mod config;
mod error;
mod events;
mod host;

pub use backoff::BackoffTracker;
pub use client::DatadogClient;
pub use config::{ClientConfig, DEFAULT_API_HOST, HOST_ENV_VAR};
pub use error::DatadogError;
pub use events::{Event, EventPriority, EventQuery};
pub use host::resolve_host;
pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, DatadogError>;
