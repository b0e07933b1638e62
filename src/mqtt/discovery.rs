//! Home Assistant MQTT discovery documents.

use serde_json::{json, Map, Value};

use crate::temperature::{Temperature, Unit};

use super::publisher::MqttThermostat;

fn device_block(thermostat: &MqttThermostat) -> Value {
    let identity = &thermostat.identity;
    let mut device = Map::new();

    if let Some(mac) = &identity.mac_id {
        device.insert("connections".to_string(), json!([["mac", mac]]));
    }
    device.insert(
        "identifiers".to_string(),
        json!([format!("tcc2mqtt_{}", identity.id)]),
    );
    device.insert("name".to_string(), json!(identity.name));
    device.insert("model".to_string(), json!(identity.model));
    device.insert("manufacturer".to_string(), json!("Honeywell"));
    device.insert("via_device".to_string(), json!(identity.via_device));

    Value::Object(device)
}

/// Climate entity for the thermostat itself. Topics are relative to `~`.
pub fn climate_config(thermostat: &MqttThermostat) -> Value {
    let topics = &thermostat.topics;
    let prefix = &topics.prefix;
    let relative = |topic: &str| topic.replacen(prefix.as_str(), "~", 1);

    let precision = match thermostat.unit {
        Unit::F => 1.0,
        Unit::C => 0.5,
    };
    let modes: Vec<&str> = thermostat.modes.iter().map(|m| m.as_str()).collect();
    let initial = Temperature::new(68.0, Unit::F)
        .map(|t| thermostat.temperature_to_mqtt(&t))
        .ok();

    let mut config = json!({
        "~": prefix,
        "name": thermostat.identity.name,
        "unique_id": thermostat.identity.id,
        "device": device_block(thermostat),
        "temperature_unit": thermostat.unit.to_string(),
        "precision": precision,
        "modes": modes,
        "mode_state_topic": relative(&topics.mode_state),
        "mode_command_topic": relative(&topics.mode_command),
        "action_topic": relative(&topics.action),
        "temperature_state_topic": relative(&topics.target_temp_state),
        "temperature_command_topic": relative(&topics.target_temp_command),
        "current_temperature_topic": relative(&topics.current_temp),
        "preset_modes": thermostat.hold_modes,
        "preset_mode_state_topic": relative(&topics.hold_state),
        "preset_mode_command_topic": relative(&topics.hold_command),
        "json_attributes_topic": relative(&topics.json_attributes),
        "availability_mode": "all",
        "availability": [
            {"topic": relative(&topics.availability)},
            {"topic": topics.status_availability},
        ],
    });

    if let Value::Object(config) = &mut config {
        if let Some(initial) = initial {
            config.insert("initial".to_string(), json!(initial));
        }
        if let Some(min) = thermostat.min_temp {
            config.insert("min_temp".to_string(), json!(min));
        }
        if let Some(max) = thermostat.max_temp {
            config.insert("max_temp".to_string(), json!(max));
        }
    }

    config
}

/// Sensor entity carrying the alert summary, available whenever the bridge
/// connection is up.
pub fn status_config(thermostat: &MqttThermostat) -> Value {
    let topics = &thermostat.topics;

    json!({
        "~": topics.status_prefix,
        "name": "Status",
        "unique_id": format!("{}_status", thermostat.identity.id),
        "device": device_block(thermostat),
        "icon": "mdi:thermostat",
        "state_topic": topics.status.replacen(topics.status_prefix.as_str(), "~", 1),
        "json_attributes_topic": topics
            .status_json_attributes
            .replacen(topics.status_prefix.as_str(), "~", 1),
        "availability_topic": topics
            .status_availability
            .replacen(topics.status_prefix.as_str(), "~", 1),
    })
}
