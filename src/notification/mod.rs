//! Outbound delivery of notifications.
//!
//! The HTTP layer only talks to the [`NotificationSender`] trait, so tests can
//! swap the real ntfy client for a recording mock.
pub mod ntfy;

pub use ntfy::{Authorization, Credentials, DeliveryError, NotificationSender, NtfyClient};
