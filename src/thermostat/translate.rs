//! Mapping between the TCC wire representation and [`ThermostatState`].

use serde_json::Value;

use crate::{
    tcc::{change::ChangeThermostat, thermostat_info::ThermostatInfo},
    temperature::Temperature,
};

use super::{
    desired::DesiredState,
    state::{AlertSummary, HoldMode, HvacAction, SetpointRange, TargetMode, ThermostatState},
};

// SystemSwitchPosition values
const SWITCH_HEAT: u8 = 1;
const SWITCH_OFF: u8 = 2;
const SWITCH_COOL: u8 = 3;
const SWITCH_AUTO: u8 = 4;

pub fn target_mode_from_switch(position: Option<u8>) -> TargetMode {
    match position {
        Some(SWITCH_HEAT) => TargetMode::Heat,
        Some(SWITCH_COOL) => TargetMode::Cool,
        Some(SWITCH_AUTO) => TargetMode::Auto,
        // 2 (off), 5 (off on auto-only thermostats) and anything unknown
        _ => TargetMode::Off,
    }
}

pub fn switch_from_target_mode(mode: TargetMode) -> u8 {
    match mode {
        TargetMode::Off => SWITCH_OFF,
        TargetMode::Heat => SWITCH_HEAT,
        TargetMode::Cool => SWITCH_COOL,
        TargetMode::Auto => SWITCH_AUTO,
    }
}

fn current_action(info: &ThermostatInfo) -> HvacAction {
    match info.equipment_status() {
        Some("Heating") => HvacAction::Heating,
        Some("Cooling") => HvacAction::Cooling,
        _ => HvacAction::Off,
    }
}

fn target_temperature(info: &ThermostatInfo) -> Option<Temperature> {
    match info.system_switch_position() {
        Some(SWITCH_OFF) | Some(SWITCH_HEAT) | Some(SWITCH_AUTO) => {
            info.ui_temperature("HeatSetpoint")
        }
        Some(SWITCH_COOL) => info.ui_temperature("CoolSetpoint"),
        _ => info.ui_temperature("DispTemperature"),
    }
}

fn valid_modes(info: &ThermostatInfo) -> Vec<TargetMode> {
    [
        ("CanSetSwitchOff", TargetMode::Off),
        ("CanSetSwitchHeat", TargetMode::Heat),
        ("CanSetSwitchCool", TargetMode::Cool),
        ("CanSetSwitchAuto", TargetMode::Auto),
    ]
    .into_iter()
    .filter(|(flag, _)| info.ui_bool(flag))
    .map(|(_, mode)| mode)
    .collect()
}

/// Picks the combined limit: both sides when the device can heat and cool,
/// otherwise the side it can drive.
fn combined_limit(
    modes: &[TargetMode],
    heat: Option<Temperature>,
    cool: Option<Temperature>,
    pick: fn(f64, f64) -> f64,
) -> Option<Temperature> {
    let heats = modes.contains(&TargetMode::Heat);
    let cools = modes.contains(&TargetMode::Cool);

    match (heats, cools) {
        (true, true) => match (heat, cool) {
            (Some(h), Some(c)) => Some(if pick(h.f(), c.f()) == h.f() { h } else { c }),
            (h, c) => h.or(c),
        },
        (true, false) => heat,
        _ => cool,
    }
}

const LOW_TEMP_ALERT: &str = "lower than the alert setting of";
const HIGH_TEMP_ALERT: &str = "higher than the alert setting of";
const CHANGE_NOT_ACKNOWLEDGED: &str = "The thermostat did not acknowledge the changes submitted";
const CONNECTION_LOST: &str = "The internet connection to this thermostat was lost";

pub fn alert_summary(info: &ThermostatInfo) -> AlertSummary {
    let alerts = match info.alerts() {
        Some(alerts) if !alerts.is_empty() => alerts,
        _ => return AlertSummary::default(),
    };

    let long_text = match alerts.get("ThermostatsAlert") {
        Some(alert) if alerts.len() == 1 => alert.get("LongText").and_then(Value::as_str),
        _ => None,
    };

    let Some(long_text) = long_text else {
        return AlertSummary {
            status: "Multiple / Unknown Errors".to_string(),
            details: Value::Object(alerts.clone()).to_string(),
            available: false,
        };
    };

    let (status, available) = if long_text.contains(LOW_TEMP_ALERT) {
        ("Low Temp", true)
    } else if long_text.contains(HIGH_TEMP_ALERT) {
        ("High Temp", true)
    } else if long_text.starts_with(CHANGE_NOT_ACKNOWLEDGED) {
        ("Change not received", true)
    } else if long_text.starts_with(CONNECTION_LOST) {
        ("Internet Connection Error", false)
    } else {
        ("Error", false)
    };

    AlertSummary {
        status: status.to_string(),
        details: long_text.to_string(),
        available,
    }
}

/// Builds the canonical snapshot for a raw record. Never fails: fields the
/// record does not carry come out as `None` or their default.
pub fn to_canonical(info: ThermostatInfo) -> ThermostatState {
    let valid_modes = valid_modes(&info);
    let heat_range = SetpointRange {
        min: info.ui_temperature("HeatLowerSetptLimit"),
        max: info.ui_temperature("HeatUpperSetptLimit"),
    };
    let cool_range = SetpointRange {
        min: info.ui_temperature("CoolLowerSetptLimit"),
        max: info.ui_temperature("CoolUpperSetptLimit"),
    };

    ThermostatState {
        id: info.id().unwrap_or_default(),
        name: info.name().unwrap_or_default().to_string(),
        model: info.model().unwrap_or_default(),
        unit: info.displayed_units(),
        current_temperature: info.ui_temperature("DispTemperature"),
        target_temperature: target_temperature(&info),
        heating_threshold: info.ui_temperature("HeatSetpoint"),
        cooling_threshold: info.ui_temperature("CoolSetpoint"),
        current_action: current_action(&info),
        target_mode: target_mode_from_switch(info.system_switch_position()),
        min_temperature: combined_limit(&valid_modes, heat_range.min, cool_range.min, f64::min),
        max_temperature: combined_limit(&valid_modes, heat_range.max, cool_range.max, f64::max),
        valid_modes,
        heat_range,
        cool_range,
        status_heat: info
            .ui_u8("StatusHeat")
            .and_then(HoldMode::from_status)
            .unwrap_or_default(),
        status_cool: info
            .ui_u8("StatusCool")
            .and_then(HoldMode::from_status)
            .unwrap_or_default(),
        heat_next_period: info.ui_f64("HeatNextPeriod").unwrap_or_default() as u32,
        cool_next_period: info.ui_f64("CoolNextPeriod").unwrap_or_default() as u32,
        alerts: alert_summary(&info),
        device: info,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Heat,
    Cool,
}

/// Resolves a single target temperature under Auto to one setpoint.
fn auto_side(requested: f64, heat: Option<f64>, cool: Option<f64>) -> Side {
    match (heat, cool) {
        (Some(heat), _) if requested < heat => Side::Heat,
        (_, Some(cool)) if requested > cool => Side::Cool,
        (Some(heat), Some(cool)) => {
            if (requested - heat).abs() < (cool - requested).abs() {
                Side::Heat
            } else {
                Side::Cool
            }
        }
        (Some(_), None) => Side::Heat,
        _ => Side::Cool,
    }
}

/// Temperature the post-switch mode assigns to `side`, if any.
fn requested_setpoint(
    side: Side,
    desired: &DesiredState,
    position: Option<u8>,
    state: &ThermostatState,
) -> Option<Temperature> {
    let threshold = match side {
        Side::Heat => desired.heating_threshold,
        Side::Cool => desired.cooling_threshold,
    };

    match position {
        Some(SWITCH_HEAT) if side == Side::Heat => desired.target_temperature.or(threshold),
        Some(SWITCH_COOL) if side == Side::Cool => desired.target_temperature.or(threshold),
        Some(SWITCH_AUTO) => match desired.target_temperature {
            Some(target) => {
                let unit = state.unit;
                let chosen = auto_side(
                    target.value(unit),
                    state.heating_threshold.map(|t| t.value(unit)),
                    state.cooling_threshold.map(|t| t.value(unit)),
                );
                if chosen == side {
                    Some(target)
                } else {
                    threshold
                }
            }
            None => threshold,
        },
        _ => None,
    }
}

fn setpoint_value(
    side: Side,
    desired: &DesiredState,
    position: Option<u8>,
    state: &ThermostatState,
) -> Option<f64> {
    let (status, existing) = match side {
        Side::Heat => (desired.status_heat, state.heating_threshold),
        Side::Cool => (desired.status_cool, state.cooling_threshold),
    };

    let mut value = match status {
        Some(hold) if hold.is_hold() => existing.map(|t| t.rounded(state.unit)),
        _ => None,
    };

    if desired.requests_temperature() {
        if let Some(requested) = requested_setpoint(side, desired, position, state) {
            value = Some(requested.rounded(state.unit));
        }
    }

    value
}

/// An explicit status wins. Otherwise a temperature request promotes a side
/// the device reports as following its schedule to a temporary hold. A missing
/// or unreadable status is left alone.
fn status_value(
    explicit: Option<HoldMode>,
    reported: Option<u8>,
    desired: &DesiredState,
) -> Option<HoldMode> {
    explicit.or_else(|| {
        let scheduled = reported == Some(HoldMode::FollowSchedule as u8);
        (desired.requests_temperature() && scheduled).then_some(HoldMode::TemporaryHold)
    })
}

fn next_period_value(
    explicit_period: Option<u32>,
    explicit_status: Option<HoldMode>,
    current_period: u32,
) -> Option<u32> {
    match (explicit_status, explicit_period) {
        (None, None) => None,
        (Some(HoldMode::FollowSchedule | HoldMode::PermanentHold), _) => Some(0),
        (Some(HoldMode::TemporaryHold), None) => Some(current_period),
        (_, period) => period,
    }
}

/// Builds the upstream command for `desired` against the latest snapshot.
pub fn build_command(desired: &DesiredState, state: &ThermostatState) -> ChangeThermostat {
    let mut change = ChangeThermostat::new(state.id);

    // The switch position the rest of the rules see is the requested one.
    let mut position = state.device.system_switch_position();
    if let Some(mode) = desired.target_mode {
        let switch = switch_from_target_mode(mode);
        change.set_system_switch(switch);
        position = Some(switch);
    }

    if let Some(value) = setpoint_value(Side::Heat, desired, position, state) {
        change.set_heat_setpoint(value);
    }
    if let Some(value) = setpoint_value(Side::Cool, desired, position, state) {
        change.set_cool_setpoint(value);
    }

    if let Some(period) =
        next_period_value(desired.heat_next_period, desired.status_heat, state.heat_next_period)
    {
        change.set_heat_next_period(period);
    }
    if let Some(period) =
        next_period_value(desired.cool_next_period, desired.status_cool, state.cool_next_period)
    {
        change.set_cool_next_period(period);
    }

    let device = &state.device;
    if let Some(status) = status_value(desired.status_heat, device.ui_u8("StatusHeat"), desired) {
        change.set_status_heat(status as u8);
    }
    if let Some(status) = status_value(desired.status_cool, device.ui_u8("StatusCool"), desired) {
        change.set_status_cool(status as u8);
    }

    change
}
