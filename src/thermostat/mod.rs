use std::{sync::Arc, time::Duration};

use futures::try_join;
use log::{debug, info};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};

use crate::{
    error::{Error, Result},
    mqtt::{
        discovery::{climate_config, status_config},
        publisher::{MqttThermostat, StatePublisher},
    },
    tcc::{thermostat_info::ThermostatId, SessionProvider},
    temperature::Temperature,
};

use self::{
    change_buffer::{ChangeBuffer, ChangeTicket},
    desired::{DesiredState, DesiredStateBuilder},
    state::{HoldMode, TargetMode, ThermostatState},
};

pub mod change_buffer;
pub mod desired;
pub mod state;
pub mod translate;

/// Latest canonical snapshot of a thermostat, shared by the poll loop and the
/// change buffer.
pub type StateCell = Arc<RwLock<Arc<ThermostatState>>>;

// Gives consumers time to process discovery documents before state arrives.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

pub struct Thermostat {
    pub id: ThermostatId,
    pub name: String,
    pub publisher: Arc<MqttThermostat>,
    state: StateCell,
    buffer: Arc<ChangeBuffer>,
    pub(crate) away_requested: Mutex<Option<Instant>>,
}

impl Thermostat {
    pub fn new(
        window: Duration,
        sessions: SessionProvider,
        state: ThermostatState,
        publisher: MqttThermostat,
    ) -> Self {
        let id = state.id;
        let name = state.name.clone();
        let publisher = Arc::new(publisher);
        let state: StateCell = Arc::new(RwLock::new(Arc::new(state)));

        debug!("{}: bridging as {}", name, publisher.topics.prefix);

        let buffer = Arc::new(ChangeBuffer::new(
            id,
            &name,
            window,
            sessions,
            state.clone(),
            publisher.clone(),
        ));

        Thermostat {
            id,
            name,
            publisher,
            state,
            buffer,
            away_requested: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> Arc<ThermostatState> {
        self.state.read().await.clone()
    }

    /// Stores a freshly polled snapshot and publishes whatever changed.
    pub async fn update_status(&self, state: ThermostatState) -> Result<()> {
        let state = Arc::new(state);
        *self.state.write().await = state.clone();
        self.publisher.update_status(&state, false).await
    }

    pub async fn set_unavailable(&self, message: &str) -> Result<()> {
        self.publisher.set_unavailable(message).await
    }

    /// (Re)announces the thermostat after the bus connection came up.
    pub async fn on_connect(&self) -> Result<()> {
        let publisher = &self.publisher;
        let topics = &publisher.topics;
        let bus = publisher.bus();

        bus.subscribe(&topics.command_filter()).await?;

        if publisher.discovery {
            info!("{}: publishing discovery documents", self.name);
            bus.publish(
                &topics.climate_discovery,
                climate_config(publisher).to_string(),
                true,
            )
            .await?;
            bus.publish(
                &topics.sensor_discovery,
                status_config(publisher).to_string(),
                true,
            )
            .await?;
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        bus.publish(&topics.status_availability, "online".to_string(), true)
            .await?;
        tokio::time::sleep(SETTLE_DELAY).await;

        let state = self.state().await;
        publisher.update_status(&state, true).await
    }

    pub async fn request(&self, desired: DesiredState, low_priority: bool) -> ChangeTicket {
        self.buffer.put(desired, low_priority).await
    }

    pub async fn set_temperature(&self, temperature: Temperature) -> Result<Arc<ThermostatState>> {
        let desired = DesiredStateBuilder::default()
            .target_temperature(temperature)
            .build()?;
        self.buffer.submit(desired, false).await
    }

    pub async fn set_mode(&self, mode: TargetMode) -> Result<Arc<ThermostatState>> {
        let desired = DesiredStateBuilder::default().target_mode(mode).build()?;
        self.buffer.submit(desired, false).await
    }

    pub async fn set_hold(&self, hold: HoldMode, low_priority: bool) -> Result<Arc<ThermostatState>> {
        self.buffer.submit(DesiredState::hold(hold), low_priority).await
    }

    /// Applies the away temperature under a permanent hold in one batch. The
    /// system mode is left alone.
    pub async fn set_away(&self) -> Result<Arc<ThermostatState>> {
        let Some(away) = self.publisher.away else {
            return Err(Error::Validation("away mode is not enabled".to_string()));
        };

        let (state, _) = try_join!(
            self.set_temperature(away.temperature),
            self.set_hold(HoldMode::PermanentHold, false),
        )?;

        Ok(state)
    }
}
