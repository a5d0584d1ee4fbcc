//! grafana-ntfy - relays Grafana alert webhooks to ntfy
//!
//! The pipeline per request: resolve the ntfy destination ([`endpoint`]),
//! map the alert group onto an ntfy message ([`formatting`]) and publish it
//! ([`notification`]). [`server`] and [`app`] wire these into an HTTP service.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod endpoint;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod server;

// Re-export core types for convenience
pub use crate::core::*;
