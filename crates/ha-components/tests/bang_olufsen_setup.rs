//! Config entry setup and unload of the Bang & Olufsen integration

mod common;

use common::{assert_state, mock_entry, SERIAL, TITLE};
use ha_components::bang_olufsen::signals::{device_subscription_count, send_battery_state, send_proximity};
use ha_components::bang_olufsen::{BangOlufsenData, BangOlufsenError, BatteryState, NotificationTag, DOMAIN};
use ha_components::BangOlufsenIntegration;
use ha_config_entries::{ConfigEntries, ConfigEntriesError, ConfigEntry, ConfigEntryState};
use ha_helpers::HomeAssistant;
use std::sync::Arc;

const BATTERY_ID: &str = "binary_sensor.living_room_battery_charging";
const PROXIMITY_ID: &str = "binary_sensor.living_room_proximity";

fn manager(hass: &HomeAssistant) -> (ConfigEntries, Arc<BangOlufsenIntegration>) {
    let entries = ConfigEntries::new();
    let integration = Arc::new(BangOlufsenIntegration::new(hass.clone()));
    entries.register_integration(DOMAIN, integration.clone());
    (entries, integration)
}

#[tokio::test]
async fn test_setup_entry_adds_sensors() {
    let hass = HomeAssistant::new();
    let (entries, integration) = manager(&hass);
    let entry = entries.add(mock_entry(SERIAL, TITLE, true, true)).unwrap();

    entries.setup(&entry.entry_id).await.unwrap();

    assert_eq!(entries.get(&entry.entry_id).unwrap().state, ConfigEntryState::Loaded);
    assert_state(&hass, BATTERY_ID, "unknown");
    assert_state(&hass, PROXIMITY_ID, "off");
    assert_eq!(device_subscription_count(&hass.dispatcher, SERIAL), 4);
    assert!(hass.data.get::<BangOlufsenData>(DOMAIN, SERIAL).is_some());

    let platform = integration.platform(&entry.entry_id).unwrap();
    assert_eq!(platform.len().await, 2);

    let registered = hass.entity_registry.entries_for_config_entry(&entry.entry_id);
    assert_eq!(registered.len(), 2);
    assert!(registered.iter().all(|e| e.platform == DOMAIN));
    assert!(registered
        .iter()
        .any(|e| e.unique_id == "30000001-battery-charging"
            && e.original_icon.as_deref() == Some("mdi:battery-charging")));
}

#[tokio::test]
async fn test_notifications_reach_added_sensors() {
    let hass = HomeAssistant::new();
    let (entries, _) = manager(&hass);
    let entry = entries.add(mock_entry(SERIAL, TITLE, true, true)).unwrap();
    entries.setup(&entry.entry_id).await.unwrap();

    let battery = BatteryState {
        is_charging: true,
        ..Default::default()
    };
    send_battery_state(&hass.dispatcher, SERIAL, &battery).await;
    send_proximity(&hass.dispatcher, SERIAL, &NotificationTag::new("proximityPresenceDetected")).await;

    assert_state(&hass, BATTERY_ID, "on");
    assert_state(&hass, PROXIMITY_ID, "on");
}

#[tokio::test]
async fn test_capabilities_select_sensors() {
    let hass = HomeAssistant::new();
    let integration = BangOlufsenIntegration::new(hass.clone());

    let added = integration
        .async_setup_entry(&mock_entry(SERIAL, TITLE, false, true))
        .await
        .unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].to_string(), PROXIMITY_ID);

    let added = integration
        .async_setup_entry(&mock_entry("30000002", "Kitchen", false, false))
        .await
        .unwrap();
    assert!(added.is_empty());
}

#[tokio::test]
async fn test_unload_entry_removes_everything() {
    let hass = HomeAssistant::new();
    let (entries, integration) = manager(&hass);
    let entry = entries.add(mock_entry(SERIAL, TITLE, true, true)).unwrap();
    entries.setup(&entry.entry_id).await.unwrap();

    entries.unload(&entry.entry_id).await.unwrap();

    assert_eq!(entries.get(&entry.entry_id).unwrap().state, ConfigEntryState::NotLoaded);
    assert!(hass.states.get(BATTERY_ID).is_none());
    assert!(hass.states.get(PROXIMITY_ID).is_none());
    assert_eq!(device_subscription_count(&hass.dispatcher, SERIAL), 0);
    assert!(hass.data.get::<BangOlufsenData>(DOMAIN, SERIAL).is_none());
    assert!(integration.platform(&entry.entry_id).is_none());
}

#[tokio::test]
async fn test_reload_keeps_entity_ids() {
    let hass = HomeAssistant::new();
    let (entries, _) = manager(&hass);
    let entry = entries.add(mock_entry(SERIAL, TITLE, true, true)).unwrap();
    entries.setup(&entry.entry_id).await.unwrap();

    entries.reload(&entry.entry_id).await.unwrap();

    assert_state(&hass, BATTERY_ID, "unknown");
    assert_state(&hass, PROXIMITY_ID, "off");
    assert_eq!(hass.entity_registry.len(), 2);
    assert_eq!(device_subscription_count(&hass.dispatcher, SERIAL), 4);
}

#[tokio::test]
async fn test_two_devices_with_same_name() {
    let hass = HomeAssistant::new();
    let (entries, _) = manager(&hass);
    entries.add(mock_entry(SERIAL, TITLE, true, false)).unwrap();
    entries.add(mock_entry("30000002", TITLE, true, false)).unwrap();

    let results = entries.setup_all().await;
    assert!(results.iter().all(|(_, r)| r.is_ok()));

    let mut ids = hass.states.entity_ids("binary_sensor");
    ids.sort();
    assert_eq!(
        ids,
        vec![
            BATTERY_ID.to_string(),
            format!("{BATTERY_ID}_2"),
        ]
    );

    let battery = BatteryState {
        is_charging: true,
        ..Default::default()
    };
    send_battery_state(&hass.dispatcher, "30000002", &battery).await;
    let on: Vec<String> = ids
        .into_iter()
        .filter(|id| hass.states.is_state(id, "on"))
        .collect();
    assert_eq!(on.len(), 1);
}

#[tokio::test]
async fn test_entry_without_unique_id_fails_setup() {
    let hass = HomeAssistant::new();
    let (entries, _) = manager(&hass);
    let entry = entries.add(ConfigEntry::new(DOMAIN, TITLE)).unwrap();

    let result = entries.setup(&entry.entry_id).await;

    assert!(matches!(result, Err(ConfigEntriesError::SetupFailed(_))));
    assert_eq!(entries.get(&entry.entry_id).unwrap().state, ConfigEntryState::SetupError);
    assert_eq!(hass.states.entity_count(), 0);
}

#[tokio::test]
async fn test_platform_setup_without_data() {
    let hass = HomeAssistant::new();
    let platform = ha_helpers::EntityPlatform::new(hass.clone(), "binary_sensor", DOMAIN, None);

    let result = ha_components::bang_olufsen::binary_sensor::async_setup_entry(
        &hass,
        &mock_entry(SERIAL, TITLE, true, true),
        &platform,
    )
    .await;

    assert!(matches!(
        result,
        Err(BangOlufsenError::Entity(ha_helpers::EntityError::MissingData { .. }))
    ));
}

#[tokio::test]
async fn test_unload_unknown_entry() {
    let hass = HomeAssistant::new();
    let integration = BangOlufsenIntegration::new(hass);

    let result = integration
        .async_unload_entry(&mock_entry(SERIAL, TITLE, true, true))
        .await;

    assert!(matches!(result, Err(BangOlufsenError::NotSetUp(_))));
}

#[tokio::test]
async fn test_danish_names_are_transliterated() {
    let hass = HomeAssistant::new();
    let integration = BangOlufsenIntegration::new(hass.clone());

    let added = integration
        .async_setup_entry(&mock_entry(SERIAL, "Køkken Højttaler", true, true))
        .await
        .unwrap();

    let ids: Vec<String> = added.iter().map(ToString::to_string).collect();
    assert_eq!(
        ids,
        [
            "binary_sensor.kokken_hojttaler_battery_charging",
            "binary_sensor.kokken_hojttaler_proximity",
        ]
    );
}

#[tokio::test]
async fn test_unload_counts_only_own_device() {
    let hass = HomeAssistant::new();
    let (entries, _) = manager(&hass);
    let abc = entries.add(mock_entry("abc", "Office", true, false)).unwrap();
    entries.add(mock_entry("abc_x", "Office X", true, false)).unwrap();
    entries.setup_all().await;

    assert_eq!(device_subscription_count(&hass.dispatcher, "abc"), 2);
    assert_eq!(device_subscription_count(&hass.dispatcher, "abc_x"), 2);

    entries.unload(&abc.entry_id).await.unwrap();

    assert_eq!(device_subscription_count(&hass.dispatcher, "abc"), 0);
    assert_eq!(device_subscription_count(&hass.dispatcher, "abc_x"), 2);
}
