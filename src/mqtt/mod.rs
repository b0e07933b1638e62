use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

use crate::error::Result;

pub mod diff;
pub mod discovery;
pub mod events;
pub mod publisher;
pub mod topics;

/// Outbound half of a bus connection.
#[async_trait]
pub trait BusClient: Send + Sync {
    async fn subscribe(&self, topic_filter: &str) -> Result<()>;

    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<()>;
}

/// Inbound notifications from a bus connection.
#[derive(Clone, Debug, PartialEq)]
pub enum BusEvent {
    /// The broker acknowledged a (re)connect. Subscriptions must be renewed.
    Connected,
    Message { topic: String, payload: String },
}

/// Message the broker publishes on our behalf when the connection drops.
#[derive(Clone, Debug, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub payload: String,
}

/// Opens one bus connection per thermostat.
pub trait BusConnector: Send + Sync {
    fn connect(
        &self,
        client_id: &str,
        will: LastWill,
    ) -> Result<(Arc<dyn BusClient>, Receiver<BusEvent>)>;
}
