use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    tcc::thermostat_info::{ThermostatId, ThermostatInfo},
    temperature::{Temperature, Unit},
};

/// What the HVAC equipment is doing right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum HvacAction {
    #[default]
    Off = 0,
    Heating = 1,
    Cooling = 2,
}

impl HvacAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacAction::Off => "idle",
            HvacAction::Heating => "heating",
            HvacAction::Cooling => "cooling",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    #[default]
    Off = 0,
    Heat = 1,
    Cool = 2,
    Auto = 3,
}

impl TargetMode {
    pub const ALL: [TargetMode; 4] = [
        TargetMode::Off,
        TargetMode::Heat,
        TargetMode::Cool,
        TargetMode::Auto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetMode::Off => "off",
            TargetMode::Heat => "heat",
            TargetMode::Cool => "cool",
            TargetMode::Auto => "auto",
        }
    }
}

impl FromStr for TargetMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TargetMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown mode: {s}")))
    }
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schedule status of one setpoint (`StatusHeat` / `StatusCool`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum HoldMode {
    #[default]
    FollowSchedule = 0,
    TemporaryHold = 1,
    PermanentHold = 2,
}

impl HoldMode {
    pub const ALL: [HoldMode; 3] = [
        HoldMode::FollowSchedule,
        HoldMode::TemporaryHold,
        HoldMode::PermanentHold,
    ];

    pub fn from_status(status: u8) -> Option<Self> {
        HoldMode::ALL.into_iter().find(|h| *h as u8 == status)
    }

    pub fn label(&self) -> &'static str {
        match self {
            HoldMode::FollowSchedule => "Follow Schedule",
            HoldMode::TemporaryHold => "Temporary Hold",
            HoldMode::PermanentHold => "Permanent Hold",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        HoldMode::ALL.into_iter().find(|h| h.label() == label)
    }

    pub fn is_hold(&self) -> bool {
        *self != HoldMode::FollowSchedule
    }
}

/// Fault summary derived from `ThermostatsAlerts`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlertSummary {
    pub status: String,
    pub details: String,
    pub available: bool,
}

impl Default for AlertSummary {
    fn default() -> Self {
        AlertSummary {
            status: "Okay".to_string(),
            details: String::new(),
            available: true,
        }
    }
}

/// Settable limits for one setpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SetpointRange {
    pub min: Option<Temperature>,
    pub max: Option<Temperature>,
}

/// Canonical snapshot of a thermostat, rebuilt from scratch on every poll.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThermostatState {
    pub id: ThermostatId,
    pub name: String,
    pub model: String,
    pub unit: Unit,
    pub current_temperature: Option<Temperature>,
    pub target_temperature: Option<Temperature>,
    pub heating_threshold: Option<Temperature>,
    pub cooling_threshold: Option<Temperature>,
    pub current_action: HvacAction,
    pub target_mode: TargetMode,
    pub valid_modes: Vec<TargetMode>,
    pub heat_range: SetpointRange,
    pub cool_range: SetpointRange,
    pub min_temperature: Option<Temperature>,
    pub max_temperature: Option<Temperature>,
    pub status_heat: HoldMode,
    pub status_cool: HoldMode,
    pub heat_next_period: u32,
    pub cool_next_period: u32,
    pub alerts: AlertSummary,
    #[serde(skip)]
    pub device: ThermostatInfo,
}

impl ThermostatState {
    /// Hold status of the setpoint the current mode is driving.
    pub fn hold_mode(&self) -> HoldMode {
        match self.target_mode {
            TargetMode::Heat => self.status_heat,
            TargetMode::Cool => self.status_cool,
            _ => HoldMode::FollowSchedule,
        }
    }

    pub fn supports(&self, mode: TargetMode) -> bool {
        self.valid_modes.contains(&mode)
    }
}
