use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use tokio::sync::{oneshot, Mutex};

use crate::{
    error::{Error, Result},
    mqtt::publisher::StatePublisher,
    tcc::{thermostat_info::ThermostatId, SessionProvider},
};

use super::{
    desired::DesiredState,
    state::ThermostatState,
    translate::{build_command, to_canonical},
    StateCell,
};

type Waiter = oneshot::Sender<Result<Arc<ThermostatState>>>;

#[derive(Default)]
struct PendingChanges {
    desired: DesiredState,
    waiters: Vec<Waiter>,
    armed: bool,
}

/// Resolves once the batch a change was folded into has been applied.
pub struct ChangeTicket(oneshot::Receiver<Result<Arc<ThermostatState>>>);

impl ChangeTicket {
    pub async fn wait(self) -> Result<Arc<ThermostatState>> {
        self.0
            .await
            .map_err(|_| Error::Command("change batch was dropped".to_string()))?
    }
}

/// Coalesces requested changes for one thermostat into a single upstream
/// command per window.
pub struct ChangeBuffer {
    id: ThermostatId,
    name: String,
    window: Duration,
    sessions: SessionProvider,
    state: StateCell,
    publisher: Arc<dyn StatePublisher>,
    pending: Mutex<PendingChanges>,
}

impl ChangeBuffer {
    pub fn new(
        id: ThermostatId,
        name: &str,
        window: Duration,
        sessions: SessionProvider,
        state: StateCell,
        publisher: Arc<dyn StatePublisher>,
    ) -> Self {
        ChangeBuffer {
            id,
            name: name.to_string(),
            window,
            sessions,
            state,
            publisher,
            pending: Mutex::new(PendingChanges::default()),
        }
    }

    /// Folds `desired` into the pending batch. The first change after a flush
    /// arms the timer, later ones ride along without extending it.
    pub async fn put(self: &Arc<Self>, desired: DesiredState, low_priority: bool) -> ChangeTicket {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;

        debug!("{}: queueing {:?}", self.name, desired);
        pending.desired.merge(desired, low_priority);
        pending.waiters.push(tx);

        if !pending.armed {
            pending.armed = true;
            let buffer = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(buffer.window).await;
                buffer.flush().await;
            });
        }

        ChangeTicket(rx)
    }

    pub async fn submit(
        self: &Arc<Self>,
        desired: DesiredState,
        low_priority: bool,
    ) -> Result<Arc<ThermostatState>> {
        self.put(desired, low_priority).await.wait().await
    }

    async fn flush(&self) {
        let (desired, waiters) = {
            let mut pending = self.pending.lock().await;
            pending.armed = false;
            (
                std::mem::take(&mut pending.desired),
                std::mem::take(&mut pending.waiters),
            )
        };

        let result = self.dispatch(&desired).await;

        match &result {
            Ok(_) => info!("{}: applied {:?}", self.name, desired),
            Err(e) => error!("{}: change failed: {}", self.name, e),
        }

        if let Err(e) = &result {
            if e.is_invalid_session() {
                if let Err(e) = self.sessions.renew().await {
                    warn!("{}: session renewal failed: {}", self.name, e);
                }
            }
        }

        for waiter in waiters {
            // The requester may have stopped waiting.
            let _ = waiter.send(result.clone());
        }
    }

    async fn dispatch(&self, desired: &DesiredState) -> Result<Arc<ThermostatState>> {
        let current = self.state.read().await.clone();
        let change = build_command(desired, &current);
        let session = self.sessions.current().await;

        if change.is_empty() {
            debug!("{}: batch changes nothing on the device", self.name);
        }
        let task_id = session.change_thermostat(&change).await?;
        debug!("{}: change accepted as task {}", self.name, task_id);

        let refreshed = Arc::new(to_canonical(session.get_thermostat(self.id).await?));
        *self.state.write().await = refreshed.clone();

        if let Err(e) = self.publisher.update_status(&refreshed, false).await {
            warn!("{}: publishing refreshed state failed: {}", self.name, e);
        }

        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tcc::thermostat_info::ThermostatInfo,
        temperature::{Temperature, Unit},
        test_support::{master_room, FakeApi, FakeSession, RecordingPublisher},
        thermostat::{desired::DesiredStateBuilder, state::TargetMode},
    };
    use tokio::sync::RwLock;

    struct Fixture {
        api: Arc<FakeApi>,
        session: Arc<FakeSession>,
        publisher: Arc<RecordingPublisher>,
        buffer: Arc<ChangeBuffer>,
        state: StateCell,
    }

    async fn fixture(session: FakeSession) -> Fixture {
        let session = Arc::new(session);
        let api = Arc::new(FakeApi::new(vec![session.clone(), session.clone()]));
        let sessions = SessionProvider::login(api.clone(), "user", "pass").await.unwrap();
        let state: StateCell = Arc::new(RwLock::new(Arc::new(to_canonical(
            ThermostatInfo::new(master_room()),
        ))));
        let publisher = Arc::new(RecordingPublisher::default());
        let buffer = Arc::new(ChangeBuffer::new(
            1234555,
            "MASTER ROOM",
            Duration::from_millis(500),
            sessions,
            state.clone(),
            publisher.clone(),
        ));

        Fixture {
            api,
            session,
            publisher,
            buffer,
            state,
        }
    }

    fn temperature(f: f64) -> DesiredState {
        DesiredStateBuilder::default()
            .target_temperature(Temperature::new(f, Unit::F).unwrap())
            .build()
            .unwrap()
    }

    fn mode(mode: TargetMode) -> DesiredState {
        DesiredStateBuilder::default().target_mode(mode).build().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn submissions_in_one_window_share_a_command() {
        let f = fixture(FakeSession::with_devices(vec![master_room()])).await;

        let a = f.buffer.put(temperature(55.0), false).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let b = f.buffer.put(mode(TargetMode::Off), false).await;

        let (a, b) = (a.wait().await.unwrap(), b.wait().await.unwrap());

        let changes = f.session.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].system_switch, Some(2));
        assert_eq!(changes[0].heat_setpoint, None);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.target_mode, TargetMode::Off);
        assert_eq!(f.state.read().await.target_mode, TargetMode::Off);
        assert_eq!(f.publisher.updates(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn later_value_wins_within_window() {
        let f = fixture(FakeSession::with_devices(vec![master_room()])).await;

        let a = f.buffer.put(temperature(55.0), false).await;
        let b = f.buffer.put(temperature(57.0), false).await;
        a.wait().await.unwrap();
        let state = b.wait().await.unwrap();

        let changes = f.session.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].heat_setpoint, Some(57.0));
        assert_eq!(state.target_temperature, Some(Temperature::new(57.0, Unit::F).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_is_not_extended_by_later_submissions() {
        let f = fixture(FakeSession::with_devices(vec![master_room()])).await;

        let start = tokio::time::Instant::now();
        let _a = f.buffer.put(temperature(55.0), false).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        let b = f.buffer.put(temperature(56.0), false).await;
        b.wait().await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rejects_every_waiter() {
        let session = FakeSession::with_devices(vec![master_room()]);
        session.fail_changes(Error::Command("rejected".to_string()));
        let f = fixture(session).await;

        let a = f.buffer.put(temperature(55.0), false).await;
        let b = f.buffer.put(mode(TargetMode::Off), false).await;

        assert_eq!(a.wait().await, Err(Error::Command("rejected".to_string())));
        assert_eq!(b.wait().await, Err(Error::Command("rejected".to_string())));
        assert_eq!(f.publisher.updates(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_during_flight_starts_new_batch() {
        let session = FakeSession::with_devices(vec![master_room()]);
        session.set_change_delay(Duration::from_secs(1));
        let f = fixture(session).await;

        let a = f.buffer.put(temperature(55.0), false).await;
        // First batch is dispatched at 500ms and in flight until 1500ms.
        tokio::time::sleep(Duration::from_millis(700)).await;
        let b = f.buffer.put(mode(TargetMode::Off), false).await;

        a.wait().await.unwrap();
        b.wait().await.unwrap();

        let changes = f.session.changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].heat_setpoint, Some(55.0));
        assert_eq!(changes[0].system_switch, None);
        assert_eq!(changes[1].system_switch, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn no_op_batch_still_sends_one_command() {
        let f = fixture(FakeSession::with_devices(vec![master_room()])).await;
        let mut raw = master_room();
        raw["UI"]["SystemSwitchPosition"] = serde_json::json!(2);
        *f.state.write().await = Arc::new(to_canonical(ThermostatInfo::new(raw)));

        // Off drives no setpoint and both sides already hold.
        let state = f.buffer.submit(temperature(60.0), false).await.unwrap();

        let changes = f.session.changes();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_empty());
        assert_eq!(state.target_mode, TargetMode::Heat);
        assert_eq!(f.publisher.updates(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_session_renews() {
        let session = FakeSession::with_devices(vec![master_room()]);
        session.fail_changes(Error::InvalidSession("expired".to_string()));
        let f = fixture(session).await;

        let result = f.buffer.submit(temperature(55.0), false).await;
        assert!(matches!(result, Err(Error::InvalidSession(_))));
        assert_eq!(f.session.change_calls(), 1);
        assert_eq!(f.api.logins(), 2);
    }
}
