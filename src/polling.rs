use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};

use crate::{
    error::{Error, Result},
    mqtt::{
        events::start_bus_events_loop, publisher::MqttThermostat, topics::ThermostatTopics,
        BusConnector, LastWill,
    },
    settings::Settings,
    tcc::SessionProvider,
    thermostat::{translate::to_canonical, Thermostat},
};

pub const STATUS_MISSING: &str = "Status missing";

/// Polls the account once and sets up a bus presence for every thermostat
/// found, honouring the `tcc.devices` allow-list.
pub async fn discover_thermostats(
    settings: &Settings,
    sessions: &SessionProvider,
    connector: &dyn BusConnector,
) -> Result<Vec<Arc<Thermostat>>> {
    let devices = sessions
        .current()
        .await
        .poll()
        .await
        .map_err(|e| Error::Bootstrap(format!("initial poll failed: {e}")))?;

    let mut thermostats = vec![];

    for info in devices {
        let state = to_canonical(info);

        if let Some(allowed) = &settings.tcc.devices {
            if !allowed.contains(&state.id) {
                debug!("Skipping thermostat {} ({})", state.name, state.id);
                continue;
            }
        }

        let topics = ThermostatTopics::new(
            &settings.mqtt.topic_root,
            &settings.mqtt.discovery_prefix,
            state.id,
            &state.name,
        );
        let will = LastWill {
            topic: topics.status_availability.clone(),
            payload: "offline".to_string(),
        };
        let (bus, rx) = connector.connect(&format!("tcc2mqtt_{}", state.id), will)?;

        info!("Found thermostat {} ({}), model {}", state.name, state.id, state.model);

        let publisher = MqttThermostat::new(&settings.thermostat, topics, &state, bus)?;
        let thermostat = Arc::new(Thermostat::new(
            Duration::from_millis(settings.tcc.change_window_ms),
            sessions.clone(),
            state,
            publisher,
        ));

        start_bus_events_loop(rx, thermostat.clone());
        thermostats.push(thermostat);
    }

    if thermostats.is_empty() {
        return Err(Error::Bootstrap("no thermostats found".to_string()));
    }

    Ok(thermostats)
}

async fn mark_all_unavailable(thermostats: &[Arc<Thermostat>], message: &str) {
    for thermostat in thermostats {
        if let Err(e) = thermostat.set_unavailable(message).await {
            error!("{}: {}", thermostat.name, e);
        }
    }
}

/// One poll cycle: publish every tracked thermostat the account reports and
/// mark the missing ones unavailable.
pub async fn poll_thermostats(sessions: &SessionProvider, thermostats: &[Arc<Thermostat>]) {
    let devices = match sessions.current().await.poll().await {
        Ok(devices) => devices,
        Err(e) if e.is_invalid_session() => {
            info!("TCC session expired, logging in again");
            if let Err(e) = sessions.renew().await {
                warn!("{}", e);
            }
            return;
        }
        Err(e) => {
            error!("Polling TCC failed: {}", e);
            mark_all_unavailable(thermostats, &e.to_string()).await;
            return;
        }
    };

    for thermostat in thermostats {
        let info = devices.iter().find(|info| info.id() == Some(thermostat.id));

        let result = match info {
            Some(info) => thermostat.update_status(to_canonical(info.clone())).await,
            None => {
                warn!("{}: missing from poll results", thermostat.name);
                thermostat.set_unavailable(STATUS_MISSING).await
            }
        };

        if let Err(e) = result {
            error!("{}: {}", thermostat.name, e);
        }
    }
}

/// Periodically poll TCC and publish to MQTT.
pub fn start_poll_loop(
    settings: &Settings,
    sessions: &SessionProvider,
    thermostats: Vec<Arc<Thermostat>>,
) {
    let refresh = Duration::from_secs(settings.tcc.refresh_seconds);
    let sessions = sessions.clone();

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(refresh).await;
            poll_thermostats(&sessions, &thermostats).await;
        }
    });
}
