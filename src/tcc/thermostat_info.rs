use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::temperature::{Temperature, Unit};

pub type ThermostatId = u64;

/// Raw `ThermostatInfo` record as returned by the TCC service.
///
/// The record is kept as JSON and read through lenient accessors: a missing or
/// mistyped field reads as `None` instead of failing the whole poll.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ThermostatInfo(Value);

impl ThermostatInfo {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn id(&self) -> Option<ThermostatId> {
        as_u64(self.0.get("ThermostatID")?)
    }

    pub fn name(&self) -> Option<&str> {
        self.0
            .get("UserDefinedDeviceName")
            .or_else(|| self.0.get("DeviceName"))
            .and_then(Value::as_str)
    }

    pub fn mac_id(&self) -> Option<&str> {
        self.0.get("MacID").and_then(Value::as_str)
    }

    pub fn model(&self) -> Option<String> {
        let name = self.0.get("ModelTypeName").and_then(Value::as_str)?;

        match self.0.get("ModelTypeID").and_then(as_u64) {
            Some(id) => Some(format!("{name}-{id}")),
            None => Some(name.to_string()),
        }
    }

    pub fn equipment_status(&self) -> Option<&str> {
        self.0.get("EquipmentStatus").and_then(Value::as_str)
    }

    pub fn alerts(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get("ThermostatsAlerts").and_then(Value::as_object)
    }

    pub fn displayed_units(&self) -> Unit {
        self.ui("DisplayedUnits")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn ui(&self, field: &str) -> Option<&Value> {
        self.0.get("UI")?.get(field)
    }

    pub fn ui_f64(&self, field: &str) -> Option<f64> {
        as_f64(self.ui(field)?)
    }

    /// Reads a small enumerated UI field. Fractional or out-of-range values
    /// read as `None`.
    pub fn ui_u8(&self, field: &str) -> Option<u8> {
        u8::try_from(as_u64(self.ui(field)?)?).ok()
    }

    pub fn ui_bool(&self, field: &str) -> bool {
        match self.ui(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Reads a UI temperature in the displayed unit. Zero reads as unset, the
    /// service uses it for setpoints it does not report.
    pub fn ui_temperature(&self, field: &str) -> Option<Temperature> {
        let value = self.ui_f64(field).filter(|v| *v != 0.0)?;
        Temperature::new(value, self.displayed_units()).ok()
    }

    pub fn system_switch_position(&self) -> Option<u8> {
        self.ui_u8("SystemSwitchPosition")
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
