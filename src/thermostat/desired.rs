use derive_builder::Builder;

use crate::temperature::Temperature;

use super::state::{HoldMode, TargetMode};

/// Partial set of canonical fields a caller wants changed.
#[derive(Builder, Clone, Debug, Default, PartialEq)]
#[builder(
    setter(into, strip_option),
    default,
    build_fn(error = "crate::error::Error")
)]
pub struct DesiredState {
    pub target_temperature: Option<Temperature>,
    pub heating_threshold: Option<Temperature>,
    pub cooling_threshold: Option<Temperature>,
    pub target_mode: Option<TargetMode>,
    pub status_heat: Option<HoldMode>,
    pub status_cool: Option<HoldMode>,
    pub heat_next_period: Option<u32>,
    pub cool_next_period: Option<u32>,
}

fn merge_field<T>(current: &mut Option<T>, incoming: Option<T>, low_priority: bool) {
    if incoming.is_none() || (low_priority && current.is_some()) {
        return;
    }
    *current = incoming;
}

impl DesiredState {
    /// Same hold status for both setpoints.
    pub fn hold(hold: HoldMode) -> Self {
        DesiredState {
            status_heat: Some(hold),
            status_cool: Some(hold),
            ..Default::default()
        }
    }

    /// Folds `other` into `self`. Later values win unless `low_priority` is set,
    /// in which case fields already present are kept.
    pub fn merge(&mut self, other: DesiredState, low_priority: bool) {
        merge_field(&mut self.target_temperature, other.target_temperature, low_priority);
        merge_field(&mut self.heating_threshold, other.heating_threshold, low_priority);
        merge_field(&mut self.cooling_threshold, other.cooling_threshold, low_priority);
        merge_field(&mut self.target_mode, other.target_mode, low_priority);
        merge_field(&mut self.status_heat, other.status_heat, low_priority);
        merge_field(&mut self.status_cool, other.status_cool, low_priority);
        merge_field(&mut self.heat_next_period, other.heat_next_period, low_priority);
        merge_field(&mut self.cool_next_period, other.cool_next_period, low_priority);
    }

    pub fn requests_temperature(&self) -> bool {
        self.target_temperature.is_some()
            || self.heating_threshold.is_some()
            || self.cooling_threshold.is_some()
    }
}
