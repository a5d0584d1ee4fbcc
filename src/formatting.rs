//! Maps Grafana alert groups onto ntfy notifications.

use crate::core::{ActionButton, AlertGroup, Notification, OPEN_IN_GRAFANA_LABEL, SILENCE_LABEL};

/// ntfy's "default" priority.
pub const DEFAULT_PRIORITY: u8 = 3;
const MIN_PRIORITY: u8 = 1;
const MAX_PRIORITY: u8 = 5;

/// Derives the ntfy priority from an optional request hint.
///
/// Values outside `1..=5` are discarded rather than clamped, so `"7"` yields
/// the default priority and not `5`.
pub fn priority_from_hint(hint: Option<&str>) -> u8 {
    hint.and_then(|raw| raw.trim().parse::<u8>().ok())
        .filter(|p| (MIN_PRIORITY..=MAX_PRIORITY).contains(p))
        .unwrap_or(DEFAULT_PRIORITY)
}

/// Builds the ntfy notification for an alert group.
///
/// A group with no alerts (Grafana's manual test notification) carries only
/// the message, title and topic. Otherwise the first alert stands in for the
/// whole group when building the silence link.
pub fn prepare_notification(group: &AlertGroup, topic: &str, priority: Option<u8>) -> Notification {
    let Some(first_alert) = group.alerts.first() else {
        return Notification {
            message: group.message.clone(),
            title: group.title.clone(),
            topic: topic.to_string(),
            ..Default::default()
        };
    };

    let actions = vec![
        ActionButton::view(OPEN_IN_GRAFANA_LABEL, &group.external_url, true),
        ActionButton::view(SILENCE_LABEL, &first_alert.silence_url, false),
    ];

    Notification {
        message: group.message.clone(),
        title: group.title.clone(),
        topic: topic.to_string(),
        actions,
        priority,
    }
}
