//! Dispatcher signals of a Bang & Olufsen device
//!
//! Signals are named `{device unique_id}_{suffix}`. The device client
//! publishes through the `send_*` helpers; entities connect to the names
//! built here.

use ha_dispatcher::Dispatcher;
use serde_json::json;
use tracing::trace;

use super::constants::{WebSocketNotification, CONNECTION_STATUS};
use super::models::{BatteryState, NotificationTag};

pub fn notification_signal(unique_id: &str, notification: WebSocketNotification) -> String {
    format!("{unique_id}_{notification}")
}

pub fn connection_status_signal(unique_id: &str) -> String {
    format!("{unique_id}_{CONNECTION_STATUS}")
}

/// Every signal a device's entities can subscribe to
pub fn device_signals(unique_id: &str) -> [String; 3] {
    [
        notification_signal(unique_id, WebSocketNotification::Battery),
        notification_signal(unique_id, WebSocketNotification::Proximity),
        connection_status_signal(unique_id),
    ]
}

/// Live subscriptions on one device's signals
///
/// Counts exact topics, so a device whose id extends this one
/// (`abc` and `abc_x`) is never included.
pub fn device_subscription_count(dispatcher: &Dispatcher, unique_id: &str) -> usize {
    device_signals(unique_id)
        .iter()
        .map(|signal| dispatcher.subscription_count(signal))
        .sum()
}

/// Publish a battery notification; returns the number of handlers reached
pub async fn send_battery_state(
    dispatcher: &Dispatcher,
    unique_id: &str,
    battery: &BatteryState,
) -> usize {
    let signal = notification_signal(unique_id, WebSocketNotification::Battery);
    trace!(signal = %signal, is_charging = battery.is_charging, "Sending battery state");
    dispatcher.send(&signal, json!(battery)).await
}

/// Publish a proximity notification
pub async fn send_proximity(dispatcher: &Dispatcher, unique_id: &str, tag: &NotificationTag) -> usize {
    let signal = notification_signal(unique_id, WebSocketNotification::Proximity);
    trace!(signal = %signal, value = %tag.value, "Sending proximity");
    dispatcher.send(&signal, json!(tag)).await
}

/// Publish whether the device is reachable
pub async fn send_connection_status(dispatcher: &Dispatcher, unique_id: &str, connected: bool) -> usize {
    let signal = connection_status_signal(unique_id);
    trace!(signal = %signal, connected, "Sending connection status");
    dispatcher.send(&signal, json!(connected)).await
}
