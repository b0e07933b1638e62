use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    settings::ThermostatSettings,
    temperature::{Temperature, Unit},
    thermostat::state::{HoldMode, TargetMode, ThermostatState},
};

use super::{
    diff::{diff, BusState},
    topics::ThermostatTopics,
    BusClient,
};

pub const AWAY_HOLD: &str = "Away";
pub const UNAVAILABLE_STATUS: &str = "unavailable";

/// Sink for canonical snapshots.
#[async_trait]
pub trait StatePublisher: Send + Sync {
    async fn update_status(&self, state: &ThermostatState, force: bool) -> Result<()>;

    async fn set_unavailable(&self, message: &str) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AwayPreset {
    pub temperature: Temperature,
    pub mode: TargetMode,
}

/// Identity of the device as advertised in discovery documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceIdentity {
    pub id: u64,
    pub name: String,
    pub model: String,
    pub mac_id: Option<String>,
    /// Bridge the device is reached through, `tcc2_mqtt@<host>`.
    pub via_device: String,
}

fn via_device() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("tcc2_mqtt@{host}")
}

#[derive(Default)]
struct Published {
    baseline: Option<BusState>,
    available: Option<bool>,
    status_data: Map<String, Value>,
}

/// Presents one thermostat on the bus and only publishes what changed since
/// the last successful publish.
pub struct MqttThermostat {
    pub topics: ThermostatTopics,
    pub identity: DeviceIdentity,
    pub unit: Unit,
    pub modes: Vec<TargetMode>,
    pub hold_modes: Vec<String>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub auto_for_schedule_mode: Option<TargetMode>,
    pub away: Option<AwayPreset>,
    pub discovery: bool,
    bus: Arc<dyn BusClient>,
    published: Mutex<Published>,
}

fn auto_for_schedule_mode(modes: &[TargetMode]) -> Result<TargetMode> {
    if modes.contains(&TargetMode::Auto) {
        return Err(Error::Validation(
            "cannot use auto for schedules if auto is enabled on thermostat".to_string(),
        ));
    }

    match (
        modes.contains(&TargetMode::Heat),
        modes.contains(&TargetMode::Cool),
    ) {
        (true, false) => Ok(TargetMode::Heat),
        (_, true) => Ok(TargetMode::Cool),
        _ => Err(Error::Validation(
            "unsupported modes for auto-schedule mode".to_string(),
        )),
    }
}

fn payload_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl MqttThermostat {
    pub fn new(
        settings: &ThermostatSettings,
        topics: ThermostatTopics,
        state: &ThermostatState,
        bus: Arc<dyn BusClient>,
    ) -> Result<Self> {
        let unit = settings.temperature_unit;
        let mut modes = state.valid_modes.clone();

        let auto_for_schedule_mode = if settings.use_auto_for_schedule {
            let mode = auto_for_schedule_mode(&modes)?;
            modes.push(TargetMode::Auto);
            Some(mode)
        } else {
            None
        };

        let mut hold_modes: Vec<String> =
            HoldMode::ALL.iter().map(|h| h.label().to_string()).collect();
        let away = if settings.use_away_mode {
            hold_modes.push(AWAY_HOLD.to_string());
            Some(AwayPreset {
                temperature: Temperature::new(settings.away_temperature, unit)?,
                mode: settings.away_heat_cool_mode,
            })
        } else {
            None
        };

        Ok(MqttThermostat {
            identity: DeviceIdentity {
                id: state.id,
                name: state.name.clone(),
                model: state.model.clone(),
                mac_id: state.device.mac_id().map(str::to_string),
                via_device: via_device(),
            },
            unit,
            modes,
            hold_modes,
            min_temp: settings
                .min_temp
                .or_else(|| state.min_temperature.map(|t| t.rounded(unit))),
            max_temp: settings
                .max_temp
                .or_else(|| state.max_temperature.map(|t| t.rounded(unit))),
            auto_for_schedule_mode,
            away,
            discovery: settings.homeassistant_discovery,
            topics,
            bus,
            published: Mutex::new(Published::default()),
        })
    }

    pub fn bus(&self) -> &Arc<dyn BusClient> {
        &self.bus
    }

    pub fn temperature_to_mqtt(&self, temperature: &Temperature) -> String {
        temperature.to_display(self.unit)
    }

    /// Mode as consumers see it. With auto-for-schedule the proxied mode
    /// reads "auto" unless a permanent hold is in effect.
    pub fn state_mode(&self, state: &ThermostatState) -> &'static str {
        let mapped = state.target_mode;

        match self.auto_for_schedule_mode {
            Some(mode) if mode == mapped && state.hold_mode() != HoldMode::PermanentHold => {
                TargetMode::Auto.as_str()
            }
            _ => mapped.as_str(),
        }
    }

    fn hold_label(&self, state: &ThermostatState, mode: &str, target: Option<&str>) -> String {
        let hold = state.hold_mode();

        if let Some(away) = &self.away {
            let away_target = self.temperature_to_mqtt(&away.temperature);
            if mode == away.mode.as_str()
                && target == Some(away_target.as_str())
                && hold == HoldMode::PermanentHold
            {
                return AWAY_HOLD.to_string();
            }
        }

        hold.label().to_string()
    }

    fn candidate(&self, state: &ThermostatState, status_data: &Map<String, Value>) -> BusState {
        let topics = &self.topics;
        let mut candidate = Map::new();

        candidate.insert(topics.status.clone(), json!(state.alerts.status));
        candidate.insert(
            topics.status_json_attributes.clone(),
            Value::Object(status_data.clone()),
        );

        if !state.alerts.available {
            return candidate;
        }

        let mode = self.state_mode(state);
        let target = state
            .target_temperature
            .as_ref()
            .map(|t| self.temperature_to_mqtt(t));

        candidate.insert(topics.mode_state.clone(), json!(mode));
        candidate.insert(topics.action.clone(), json!(state.current_action.as_str()));
        if let Some(target) = &target {
            candidate.insert(topics.target_temp_state.clone(), json!(target));
        }
        if let Some(current) = &state.current_temperature {
            candidate.insert(
                topics.current_temp.clone(),
                json!(self.temperature_to_mqtt(current)),
            );
        }

        let mut attributes = Map::new();
        attributes.insert("hold_heat".to_string(), json!(state.status_heat.label()));
        attributes.insert("hold_cool".to_string(), json!(state.status_cool.label()));
        if let Some(t) = &state.cooling_threshold {
            attributes.insert("cooling_threshold".to_string(), json!(self.temperature_to_mqtt(t)));
        }
        if let Some(t) = &state.heating_threshold {
            attributes.insert("heating_threshold".to_string(), json!(self.temperature_to_mqtt(t)));
        }
        candidate.insert(topics.json_attributes.clone(), Value::Object(attributes));

        candidate.insert(
            topics.hold_state.clone(),
            json!(self.hold_label(state, mode, target.as_deref())),
        );

        candidate
    }

    async fn set_availability(&self, published: &mut Published, online: bool, force: bool) -> Result<()> {
        if published.available != Some(online) || force {
            let payload = if online { "online" } else { "offline" };
            debug!("{}: setting availability to {}", self.identity.name, payload);
            self.bus
                .publish(&self.topics.availability, payload.to_string(), true)
                .await?;
        }
        published.available = Some(online);

        Ok(())
    }

    async fn publish_state(
        &self,
        published: &mut Published,
        candidate: BusState,
        force: bool,
    ) -> Result<()> {
        let empty = Map::new();
        let changed = diff(published.baseline.as_ref().unwrap_or(&empty), &candidate);

        if changed.is_empty() && !force {
            return Ok(());
        }

        for (topic, value) in &candidate {
            if force || changed.contains_key(topic) {
                let payload = payload_text(value);
                debug!("Publishing {} -> {}", topic, payload);
                self.bus.publish(topic, payload, true).await?;
            }
        }

        published.baseline = Some(candidate);

        Ok(())
    }
}

#[async_trait]
impl StatePublisher for MqttThermostat {
    async fn update_status(&self, state: &ThermostatState, force: bool) -> Result<()> {
        let mut published = self.published.lock().await;

        if !state.alerts.available || state.alerts.status != "Okay" {
            debug!(
                "{}: alerts {} ({})",
                self.identity.name, state.alerts.status, state.alerts.details
            );
        }

        published
            .status_data
            .insert("error_details".to_string(), json!(state.alerts.details));
        published
            .status_data
            .insert("unavailable_details".to_string(), json!(""));

        let candidate = self.candidate(state, &published.status_data);

        self.set_availability(&mut published, state.alerts.available, force)
            .await?;
        self.publish_state(&mut published, candidate, force).await
    }

    async fn set_unavailable(&self, message: &str) -> Result<()> {
        let mut published = self.published.lock().await;

        published
            .status_data
            .insert("unavailable_details".to_string(), json!(message));

        let mut candidate = Map::new();
        candidate.insert(self.topics.status.clone(), json!(UNAVAILABLE_STATUS));
        candidate.insert(
            self.topics.status_json_attributes.clone(),
            Value::Object(published.status_data.clone()),
        );

        self.set_availability(&mut published, false, false).await?;
        self.publish_state(&mut published, candidate, false).await
    }
}
