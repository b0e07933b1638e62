use crate::tcc::thermostat_info::ThermostatId;

/// Topic layout for one thermostat.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermostatTopics {
    pub prefix: String,
    pub status_prefix: String,

    pub mode_state: String,
    pub mode_command: String,
    pub action: String,
    pub target_temp_state: String,
    pub target_temp_command: String,
    pub current_temp: String,
    pub hold_state: String,
    pub hold_command: String,
    pub json_attributes: String,
    pub availability: String,

    pub status: String,
    pub status_json_attributes: String,
    pub status_availability: String,

    pub climate_discovery: String,
    pub sensor_discovery: String,
}

/// Bus-safe device name: lower case, first space and first slash replaced by
/// `_`, first apostrophe dropped.
pub fn mqtt_name(name: &str) -> String {
    name.replacen(' ', "_", 1)
        .replacen('\'', "", 1)
        .replacen('/', "_", 1)
        .to_lowercase()
}

impl ThermostatTopics {
    pub fn new(root: &str, discovery_prefix: &str, id: ThermostatId, name: &str) -> Self {
        let mqtt_name = mqtt_name(name);
        let prefix = format!("{root}/{mqtt_name}");
        let status_prefix = format!("{root}/{mqtt_name}_status");

        ThermostatTopics {
            mode_state: format!("{prefix}/mode"),
            mode_command: format!("{prefix}/mode/set"),
            action: format!("{prefix}/action"),
            target_temp_state: format!("{prefix}/temperature"),
            target_temp_command: format!("{prefix}/temperature/set"),
            current_temp: format!("{prefix}/current"),
            hold_state: format!("{prefix}/hold"),
            hold_command: format!("{prefix}/hold/set"),
            json_attributes: format!("{prefix}/attributes"),
            availability: format!("{prefix}/availability"),

            status: format!("{status_prefix}/state"),
            status_json_attributes: format!("{status_prefix}/attributes"),
            status_availability: format!("{status_prefix}/availability"),

            climate_discovery: format!("{discovery_prefix}/climate/{root}/{id}/config"),
            sensor_discovery: format!("{discovery_prefix}/sensor/{root}/{id}/config"),

            prefix,
            status_prefix,
        }
    }

    /// Filter matching every command topic of this thermostat.
    pub fn command_filter(&self) -> String {
        format!("{}/+/set", self.prefix)
    }
}
