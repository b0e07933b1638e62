use std::{sync::Arc, time::Duration};

use log::{debug, error, warn};
use tokio::{sync::mpsc::Receiver, time::Instant};

use crate::{
    error::{Error, Result},
    temperature::Temperature,
    thermostat::{
        desired::{DesiredState, DesiredStateBuilder},
        state::{HoldMode, TargetMode},
        Thermostat,
    },
};

use super::{publisher::AWAY_HOLD, BusEvent};

// Consumers echo a preset change back as a hold change right after "Away".
const AWAY_DEBOUNCE: Duration = Duration::from_millis(100);

pub async fn handle_bus_event(event: BusEvent, thermostat: &Arc<Thermostat>) -> Result<()> {
    match event {
        BusEvent::Connected => thermostat.on_connect().await,
        BusEvent::Message { topic, payload } => route_command(thermostat, &topic, &payload).await,
    }
}

pub fn start_bus_events_loop(mut rx: Receiver<BusEvent>, thermostat: Arc<Thermostat>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = handle_bus_event(event, &thermostat).await {
                error!("{}: error while handling MQTT event: {}", thermostat.name, e);
            }
        }

        debug!("{}: MQTT event channel closed", thermostat.name);
    });
}

/// Queues `desired` and logs the outcome of its batch in the background.
async fn apply(
    thermostat: &Arc<Thermostat>,
    what: &'static str,
    desired: DesiredState,
    low_priority: bool,
) {
    let ticket = thermostat.request(desired, low_priority).await;
    let name = thermostat.name.clone();

    tokio::spawn(async move {
        match ticket.wait().await {
            Ok(_) => debug!("{}: {} applied", name, what),
            Err(e) => error!("{}: failed to set {}: {}", name, what, e),
        }
    });
}

async fn route_command(thermostat: &Arc<Thermostat>, topic: &str, payload: &str) -> Result<()> {
    let publisher = &thermostat.publisher;
    let topics = &publisher.topics;
    debug!("{}: received {} on {}", thermostat.name, payload, topic);

    if topic == topics.target_temp_command {
        let temperature = Temperature::parse(payload, publisher.unit)?;
        let desired = DesiredStateBuilder::default()
            .target_temperature(temperature)
            .build()?;
        apply(thermostat, "temperature", desired, false).await;
    } else if topic == topics.mode_command {
        let mode: TargetMode = payload.trim().parse()?;

        match publisher.auto_for_schedule_mode {
            Some(_) if mode == TargetMode::Auto => {
                apply(thermostat, "hold", DesiredState::hold(HoldMode::FollowSchedule), false)
                    .await;
            }
            Some(proxied) if mode == proxied => {
                let desired = DesiredStateBuilder::default().target_mode(mode).build()?;
                apply(thermostat, "mode", desired, false).await;
                apply(thermostat, "hold", DesiredState::hold(HoldMode::TemporaryHold), true).await;
            }
            _ => {
                let desired = DesiredStateBuilder::default().target_mode(mode).build()?;
                apply(thermostat, "mode", desired, false).await;
            }
        }
    } else if topic == topics.hold_command {
        let mut away_requested = thermostat.away_requested.lock().await;
        if let Some(at) = *away_requested {
            if at.elapsed() < AWAY_DEBOUNCE {
                debug!("{}: ignoring hold {} right after away", thermostat.name, payload);
                return Ok(());
            }
        }

        let hold = match payload.trim() {
            "None" | "off" => HoldMode::FollowSchedule,
            AWAY_HOLD if publisher.away.is_some() => {
                *away_requested = Some(Instant::now());
                let thermostat = thermostat.clone();
                tokio::spawn(async move {
                    if let Err(e) = thermostat.set_away().await {
                        error!("{}: failed to set away: {}", thermostat.name, e);
                    }
                });
                return Ok(());
            }
            label => HoldMode::from_label(label)
                .ok_or_else(|| Error::Validation(format!("unknown hold mode: {label}")))?,
        };
        drop(away_requested);

        apply(thermostat, "hold", DesiredState::hold(hold), false).await;
    } else {
        warn!("{}: ignoring message on unknown topic {}", thermostat.name, topic);
    }

    Ok(())
}
