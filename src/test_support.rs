//! Fakes shared by the unit tests.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::{
    error::{Error, Result},
    mqtt::{
        publisher::{MqttThermostat, StatePublisher},
        topics::ThermostatTopics,
        BusClient, BusConnector, BusEvent, LastWill,
    },
    settings::ThermostatSettings,
    tcc::{
        change::ChangeThermostat,
        thermostat_info::{ThermostatId, ThermostatInfo},
        SessionProvider, TaskId, TccApi, TccSession,
    },
    thermostat::{state::ThermostatState, translate::to_canonical, Thermostat},
};

/// Heat-only thermostat on a permanent hold at 50F, reading 60F.
pub fn master_room() -> Value {
    json!({
        "ThermostatID": 1234555,
        "MacID": "00D02DD4825E",
        "DomainID": 44449,
        "Instance": 0,
        "DeviceName": "MASTER ROOM",
        "UserDefinedDeviceName": "MASTER ROOM",
        "Upgrading": false,
        "ThermostatsAlerts": {},
        "UI": {
            "Created": "2022-09-24T12:29:39",
            "ThermostatLocked": false,
            "OutdoorTemp": 58,
            "DispTemperature": 60,
            "HeatSetpoint": 50,
            "CoolSetpoint": 50,
            "DisplayedUnits": "F",
            "StatusHeat": 2,
            "StatusCool": 2,
            "HoldUntilCapable": true,
            "ScheduleCapable": true,
            "VacationHold": 0,
            "DualSetpointStatus": false,
            "HeatNextPeriod": 30,
            "CoolNextPeriod": 30,
            "HeatLowerSetptLimit": 40,
            "HeatUpperSetptLimit": 90,
            "CoolLowerSetptLimit": 50,
            "CoolUpperSetptLimit": 99,
            "SchedHeatSp": 55,
            "SchedCoolSp": 82,
            "SystemSwitchPosition": 1,
            "CanSetSwitchAuto": false,
            "CanSetSwitchCool": false,
            "CanSetSwitchOff": true,
            "CanSetSwitchHeat": true,
            "CanSetSwitchEmergencyHeat": false,
            "CanSetSwitchSouthernAway": false,
            "Deadband": 0,
            "OutdoorHumidity": 48,
            "IndoorHumidity": 31,
            "Commercial": false
        },
        "EquipmentStatus": "Off",
        "CanControlSchedule": true,
        "WillSupportSchedule": false,
        "ModelTypeID": 21,
        "ModelTypeName": "Saratoga"
    })
}

/// Hands out the scripted sessions in order, repeating the last one.
pub struct FakeApi {
    sessions: Vec<Arc<FakeSession>>,
    logins: AtomicUsize,
}

impl FakeApi {
    pub fn new(sessions: Vec<Arc<FakeSession>>) -> Self {
        FakeApi {
            sessions,
            logins: AtomicUsize::new(0),
        }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TccApi for FakeApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<Arc<dyn TccSession>> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst);
        let session: Arc<dyn TccSession> = self
            .sessions
            .get(n)
            .or(self.sessions.last())
            .ok_or_else(|| Error::Transport("login refused".to_string()))?
            .clone();

        Ok(session)
    }
}

/// In-memory account. Accepted changes are applied to the stored records.
#[derive(Default)]
pub struct FakeSession {
    devices: Mutex<Vec<Value>>,
    poll_error: Mutex<Option<Error>>,
    change_error: Mutex<Option<Error>>,
    change_delay: Mutex<Duration>,
    changes: Mutex<Vec<ChangeThermostat>>,
    polls: AtomicUsize,
}

impl FakeSession {
    pub fn with_devices(devices: Vec<Value>) -> Self {
        FakeSession {
            devices: Mutex::new(devices),
            ..Default::default()
        }
    }

    pub fn set_devices(&self, devices: Vec<Value>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn set_poll_error(&self, error: Option<Error>) {
        *self.poll_error.lock().unwrap() = error;
    }

    pub fn fail_changes(&self, error: Error) {
        *self.change_error.lock().unwrap() = Some(error);
    }

    pub fn set_change_delay(&self, delay: Duration) {
        *self.change_delay.lock().unwrap() = delay;
    }

    pub fn changes(&self) -> Vec<ChangeThermostat> {
        self.changes.lock().unwrap().clone()
    }

    pub fn change_calls(&self) -> usize {
        self.changes.lock().unwrap().len()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

fn apply_change(device: &mut Value, change: &ChangeThermostat) {
    let ui = &mut device["UI"];

    if let Some(v) = change.system_switch {
        ui["SystemSwitchPosition"] = json!(v);
    }
    if let Some(v) = change.heat_setpoint {
        ui["HeatSetpoint"] = json!(v);
    }
    if let Some(v) = change.cool_setpoint {
        ui["CoolSetpoint"] = json!(v);
    }
    if let Some(v) = change.heat_next_period {
        ui["HeatNextPeriod"] = json!(v);
    }
    if let Some(v) = change.cool_next_period {
        ui["CoolNextPeriod"] = json!(v);
    }
    if let Some(v) = change.status_heat {
        ui["StatusHeat"] = json!(v);
    }
    if let Some(v) = change.status_cool {
        ui["StatusCool"] = json!(v);
    }
}

#[async_trait]
impl TccSession for FakeSession {
    async fn poll(&self) -> Result<Vec<ThermostatInfo>> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        if let Some(e) = self.poll_error.lock().unwrap().clone() {
            return Err(e);
        }

        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(ThermostatInfo::new)
            .collect())
    }

    async fn get_thermostat(&self, id: ThermostatId) -> Result<ThermostatInfo> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d["ThermostatID"] == json!(id))
            .cloned()
            .map(ThermostatInfo::new)
            .ok_or_else(|| Error::Transport(format!("no thermostat {id}")))
    }

    async fn change_thermostat(&self, change: &ChangeThermostat) -> Result<TaskId> {
        let task = {
            let mut changes = self.changes.lock().unwrap();
            changes.push(change.clone());
            changes.len()
        };

        let delay = *self.change_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        if let Some(e) = self.change_error.lock().unwrap().clone() {
            return Err(e);
        }

        for device in self.devices.lock().unwrap().iter_mut() {
            if device["ThermostatID"] == json!(change.thermostat_id) {
                apply_change(device, change);
            }
        }

        Ok(format!("task-{task}"))
    }
}

/// Bus that remembers every publish and subscription.
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, String, bool)>>,
    subscriptions: Mutex<Vec<String>>,
}

impl RecordingBus {
    /// Last payload published on `topic`.
    pub fn last(&self, topic: &str) -> Option<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _, _)| t == topic)
            .map(|(_, payload, _)| payload.clone())
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _, _)| t.clone())
            .collect()
    }

    pub fn all_retained(&self) -> bool {
        self.published.lock().unwrap().iter().all(|(_, _, r)| *r)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl BusClient for RecordingBus {
    async fn subscribe(&self, topic_filter: &str) -> Result<()> {
        self.subscriptions
            .lock()
            .unwrap()
            .push(topic_filter.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload, retain));
        Ok(())
    }
}

/// Counts snapshots handed to it.
#[derive(Default)]
pub struct RecordingPublisher {
    updates: AtomicUsize,
}

impl RecordingPublisher {
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatePublisher for RecordingPublisher {
    async fn update_status(&self, _state: &ThermostatState, _force: bool) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_unavailable(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}

pub struct FakeConnection {
    pub client_id: String,
    pub will: LastWill,
    pub bus: Arc<RecordingBus>,
    // Keeps the thermostat's event loop running.
    _events: Sender<BusEvent>,
}

/// Hands out a [`RecordingBus`] per connection.
#[derive(Default)]
pub struct FakeConnector {
    connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeConnector {
    pub fn connections(&self) -> Vec<Arc<FakeConnection>> {
        self.connections.lock().unwrap().clone()
    }
}

impl BusConnector for FakeConnector {
    fn connect(
        &self,
        client_id: &str,
        will: LastWill,
    ) -> Result<(Arc<dyn BusClient>, Receiver<BusEvent>)> {
        let (tx, rx) = mpsc::channel(16);
        let bus = Arc::new(RecordingBus::default());
        let client: Arc<dyn BusClient> = bus.clone();

        self.connections.lock().unwrap().push(Arc::new(FakeConnection {
            client_id: client_id.to_string(),
            will,
            bus: bus.clone(),
            _events: tx,
        }));

        Ok((client, rx))
    }
}

pub struct ThermostatFixture {
    pub thermostat: Arc<Thermostat>,
    pub session: Arc<FakeSession>,
    pub bus: Arc<RecordingBus>,
}

/// MASTER ROOM wired to a fake account and a recording bus.
pub async fn master_room_thermostat(settings: ThermostatSettings) -> ThermostatFixture {
    let session = Arc::new(FakeSession::with_devices(vec![master_room()]));
    let api = Arc::new(FakeApi::new(vec![session.clone()]));
    let sessions = SessionProvider::login(api, "user", "pass").await.unwrap();
    let state = to_canonical(ThermostatInfo::new(master_room()));
    let topics = ThermostatTopics::new("tcc2mqtt", "homeassistant", state.id, &state.name);
    let bus = Arc::new(RecordingBus::default());
    let publisher = MqttThermostat::new(&settings, topics, &state, bus.clone()).unwrap();
    let thermostat = Arc::new(Thermostat::new(
        Duration::from_millis(500),
        sessions,
        state,
        publisher,
    ));

    ThermostatFixture {
        thermostat,
        session,
        bus,
    }
}
