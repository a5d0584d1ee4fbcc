//! Core domain types for grafana-ntfy
//!
//! The inbound side mirrors Grafana's webhook contact point payload, the
//! outbound side mirrors ntfy's JSON publish format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label used for the action button linking back to the alert source.
pub const OPEN_IN_GRAFANA_LABEL: &str = "Open in Grafana";
/// Label used for the action button linking to the silence page.
pub const SILENCE_LABEL: &str = "Silence";

/// A Grafana alert group as posted to a webhook contact point.
///
/// Every field defaults when missing so that partial payloads, like the one
/// produced by Grafana's "Test" button, still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertGroup {
    pub receiver: String,
    pub status: String,
    pub alerts: Vec<AlertItem>,
    pub group_labels: HashMap<String, String>,
    pub common_labels: HashMap<String, String>,
    pub common_annotations: HashMap<String, String>,
    #[serde(rename = "externalURL")]
    pub external_url: String,
    pub version: String,
    pub group_key: String,
    pub truncated_alerts: i64,
    pub org_id: i64,
    pub title: String,
    pub state: String,
    pub message: String,
}

/// A single alert occurrence inside an [`AlertGroup`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertItem {
    pub status: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub starts_at: String,
    pub ends_at: String,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
    #[serde(rename = "silenceURL")]
    pub silence_url: String,
    #[serde(rename = "dashboardURL")]
    pub dashboard_url: String,
    #[serde(rename = "panelURL")]
    pub panel_url: String,
    pub values: serde_json::Value,
    pub value_string: String,
}

/// A message in ntfy's JSON publish format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Notification {
    pub message: String,
    pub title: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// An ntfy action button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionButton {
    /// Always `"view"`; ntfy opens `url` when the button is tapped.
    pub action: String,
    pub label: String,
    pub url: String,
    /// Whether tapping the button dismisses the notification.
    pub clear: bool,
}

impl ActionButton {
    /// Creates a `view` action opening `url`.
    pub fn view(label: &str, url: &str, clear: bool) -> Self {
        Self {
            action: "view".to_string(),
            label: label.to_string(),
            url: url.to_string(),
            clear,
        }
    }
}
