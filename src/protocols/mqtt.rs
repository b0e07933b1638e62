use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::{
    sync::mpsc::{self, Receiver},
    task,
};

use crate::{
    error::Result,
    mqtt::{BusClient, BusConnector, BusEvent, LastWill},
    settings::MqttSettings,
};

#[derive(Clone)]
pub struct MqttClient {
    pub client: AsyncClient,
}

#[async_trait]
impl BusClient for MqttClient {
    async fn subscribe(&self, topic_filter: &str) -> Result<()> {
        self.client.subscribe(topic_filter, QoS::AtMostOnce).await?;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await?;
        Ok(())
    }
}

/// Opens rumqttc connections to the configured broker.
#[derive(Clone)]
pub struct MqttConnector {
    settings: MqttSettings,
}

impl MqttConnector {
    pub fn new(settings: &MqttSettings) -> Self {
        MqttConnector {
            settings: settings.clone(),
        }
    }
}

pub fn mk_mqtt_options(settings: &MqttSettings, client_id: &str, will: LastWill) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, settings.host.clone(), settings.port);
    options.set_keep_alive(Duration::from_secs(5));

    if let Some(username) = &settings.username {
        options.set_credentials(username, settings.password.clone().unwrap_or_default());
    }

    options.set_last_will(rumqttc::LastWill::new(
        will.topic,
        will.payload,
        QoS::AtLeastOnce,
        true,
    ));

    options
}

impl BusConnector for MqttConnector {
    fn connect(
        &self,
        client_id: &str,
        will: LastWill,
    ) -> Result<(Arc<dyn BusClient>, Receiver<BusEvent>)> {
        let options = mk_mqtt_options(&self.settings, client_id, will);
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let (tx, rx) = mpsc::channel(100);
        let client_id = client_id.to_string();

        task::spawn(async move {
            loop {
                while let Ok(notification) = eventloop.poll().await {
                    let event = match notification {
                        rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
                            info!("{}: connected to MQTT broker", client_id);
                            BusEvent::Connected
                        }
                        rumqttc::Event::Incoming(rumqttc::Packet::Publish(msg)) => {
                            BusEvent::Message {
                                topic: msg.topic,
                                payload: String::from_utf8_lossy(&msg.payload).into_owned(),
                            }
                        }
                        _ => continue,
                    };

                    if tx.send(event).await.is_err() {
                        debug!("{}: nobody listening for MQTT events, disconnecting", client_id);
                        return;
                    }
                }

                warn!("{}: MQTT connection lost, reconnecting", client_id);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });

        let client: Arc<dyn BusClient> = Arc::new(MqttClient { client });
        Ok((client, rx))
    }
}
