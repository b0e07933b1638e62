use serde::Deserialize;

use crate::{tcc::thermostat_info::ThermostatId, temperature::Unit, thermostat::state::TargetMode};

fn default_port() -> u16 {
    1883
}

fn default_topic_root() -> String {
    "tcc2mqtt".to_string()
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

fn default_refresh_seconds() -> u64 {
    300
}

fn default_change_window_ms() -> u64 {
    500
}

fn default_away_temperature() -> f64 {
    50.0
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Clone, Deserialize, Debug)]
pub struct MqttSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_topic_root")]
    pub topic_root: String,
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

#[derive(Clone, Deserialize, Debug)]
pub struct TccSettings {
    pub username: String,
    pub password: String,
    /// Only bridge these thermostats, all of them when unset.
    pub devices: Option<Vec<ThermostatId>>,
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,
    #[serde(default = "default_change_window_ms")]
    pub change_window_ms: u64,
}

#[derive(Clone, Deserialize, Debug)]
pub struct ThermostatSettings {
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    #[serde(default)]
    pub temperature_unit: Unit,
    #[serde(default)]
    pub homeassistant_discovery: bool,
    #[serde(default)]
    pub use_away_mode: bool,
    #[serde(default = "default_away_temperature")]
    pub away_temperature: f64,
    #[serde(default = "default_away_mode")]
    pub away_heat_cool_mode: TargetMode,
    /// Present "auto" as "follow the schedule" to consumers that cannot
    /// manage holds directly.
    #[serde(default)]
    pub use_auto_for_schedule: bool,
}

fn default_away_mode() -> TargetMode {
    TargetMode::Heat
}

impl Default for ThermostatSettings {
    fn default() -> Self {
        ThermostatSettings {
            min_temp: None,
            max_temp: None,
            temperature_unit: Unit::F,
            homeassistant_discovery: false,
            use_away_mode: false,
            away_temperature: default_away_temperature(),
            away_heat_cool_mode: default_away_mode(),
            use_auto_for_schedule: false,
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub tcc: TccSettings,
    #[serde(default)]
    pub thermostat: ThermostatSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub debug: bool,
}

pub fn read_settings() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("Settings"))
        .add_source(
            config::Environment::with_prefix("TCC2MQTT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Settings>()
}
