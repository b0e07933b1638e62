use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::RwLock;

use crate::error::Result;

use self::{
    change::ChangeThermostat,
    thermostat_info::{ThermostatId, ThermostatInfo},
};

pub mod change;
pub mod thermostat_info;

pub type TaskId = String;

/// Entry point to the TCC service: exchanges credentials for a session.
#[async_trait]
pub trait TccApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Arc<dyn TccSession>>;
}

/// An authenticated TCC session.
///
/// Implementations report an expired or revoked session id as
/// [`crate::error::Error::InvalidSession`].
#[async_trait]
pub trait TccSession: Send + Sync {
    /// Every thermostat of every location on the account.
    async fn poll(&self) -> Result<Vec<ThermostatInfo>>;

    async fn get_thermostat(&self, id: ThermostatId) -> Result<ThermostatInfo>;

    async fn change_thermostat(&self, change: &ChangeThermostat) -> Result<TaskId>;
}

/// Shares one session between the poll loop and every change buffer.
///
/// Renewal replaces the whole `Arc`, callers holding the previous session keep
/// using it until their call completes.
#[derive(Clone)]
pub struct SessionProvider {
    api: Arc<dyn TccApi>,
    username: String,
    password: String,
    current: Arc<RwLock<Arc<dyn TccSession>>>,
}

impl SessionProvider {
    pub async fn login(api: Arc<dyn TccApi>, username: &str, password: &str) -> Result<Self> {
        let session = api.login(username, password).await?;
        info!("Logged into TCC as {}", username);

        Ok(SessionProvider {
            api,
            username: username.to_string(),
            password: password.to_string(),
            current: Arc::new(RwLock::new(session)),
        })
    }

    pub async fn current(&self) -> Arc<dyn TccSession> {
        self.current.read().await.clone()
    }

    pub async fn renew(&self) -> Result<()> {
        let session = self
            .api
            .login(&self.username, &self.password)
            .await
            .map_err(|e| {
                warn!("TCC login failed while renewing session: {}", e);
                e
            })?;

        *self.current.write().await = session;
        info!("Renewed TCC session for {}", self.username);

        Ok(())
    }
}
