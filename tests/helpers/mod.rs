#![allow(dead_code)]
//! Shared fixtures for the integration tests.

pub mod mock_ntfy;

use std::net::{SocketAddr, TcpListener};

/// A loopback address with nothing listening on it.
pub fn unused_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// The alert group from Grafana's documentation trimmed to what the relay reads.
pub const FIRING_ALERT_BODY: &str =
    r#"{"title":"T","message":"M","externalURL":"http://g/a","alerts":[{"silenceURL":"http://g/s"}]}"#;

/// A Grafana "Test" contact point notification without alerts.
pub const TEST_NOTIFICATION_BODY: &str =
    r#"{"title":"[FIRING:1] TestAlert","message":"This is a test","externalURL":"http://g/","alerts":[]}"#;
