use serde::Serialize;

use super::thermostat_info::ThermostatId;

/// `ChangeThermostatUI` request body. Each concern is a `changeX = 1` flag
/// followed by its value, absent concerns are left out entirely.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeThermostat {
    #[serde(rename = "thermostatID")]
    pub thermostat_id: ThermostatId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_system_switch: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_switch: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_heat_setpoint: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_setpoint: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_cool_setpoint: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cool_setpoint: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_heat_next_period: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_next_period: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_cool_next_period: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cool_next_period: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_status_heat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_heat: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_status_cool: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_cool: Option<u8>,
}

impl ChangeThermostat {
    pub fn new(thermostat_id: ThermostatId) -> Self {
        Self {
            thermostat_id,
            ..Default::default()
        }
    }

    pub fn set_system_switch(&mut self, position: u8) {
        self.change_system_switch = Some(1);
        self.system_switch = Some(position);
    }

    pub fn set_heat_setpoint(&mut self, value: f64) {
        self.change_heat_setpoint = Some(1);
        self.heat_setpoint = Some(value);
    }

    pub fn set_cool_setpoint(&mut self, value: f64) {
        self.change_cool_setpoint = Some(1);
        self.cool_setpoint = Some(value);
    }

    pub fn set_heat_next_period(&mut self, period: u32) {
        self.change_heat_next_period = Some(1);
        self.heat_next_period = Some(period);
    }

    pub fn set_cool_next_period(&mut self, period: u32) {
        self.change_cool_next_period = Some(1);
        self.cool_next_period = Some(period);
    }

    pub fn set_status_heat(&mut self, status: u8) {
        self.change_status_heat = Some(1);
        self.status_heat = Some(status);
    }

    pub fn set_status_cool(&mut self, status: u8) {
        self.change_status_cool = Some(1);
        self.status_cool = Some(status);
    }

    /// True when the command carries nothing but the thermostat id.
    pub fn is_empty(&self) -> bool {
        *self == Self::new(self.thermostat_id)
    }
}
