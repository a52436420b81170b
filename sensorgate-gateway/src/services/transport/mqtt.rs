use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS, Transport};
use tokio::sync::mpsc;

use crate::configs;
use crate::errors::BusError;
use crate::services::{PRESENCE_OFFLINE, PRESENCE_ONLINE, Topics};

const TLS_PORT: u16 = 8883;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Outbound side of the message bus.
///
/// Publishing never blocks the loop: a disconnected bus reports
/// [`BusError::Disconnected`] and the caller drops the message.
pub trait MessageBus: Send + Sync {
    fn is_connected(&self) -> bool;

    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BusError>;
}

pub struct MqttBus {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttBus {
    /// Starts the client and the task polling its event loop. The command
    /// topic is subscribed and presence announced on every (re)connect;
    /// inbound publishes arrive on the returned receiver.
    pub fn start(
        settings: &configs::Bus,
        mqtt: &configs::Mqtt,
        client_id: &str,
        topics: &Topics,
    ) -> (Self, mpsc::Receiver<InboundMessage>) {
        let mut options = MqttOptions::new(client_id, &mqtt.broker, mqtt.port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs.max(5)));
        options.set_last_will(LastWill::new(&topics.status, PRESENCE_OFFLINE, QoS::AtLeastOnce, true));

        if !mqtt.user.is_empty() {
            options.set_credentials(&mqtt.user, &mqtt.password);
        }

        if mqtt.port == TLS_PORT {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, mut event_loop) = AsyncClient::new(options, settings.capacity.max(1));
        let (tx, rx) = mpsc::channel(settings.capacity.max(1));
        let connected = Arc::new(AtomicBool::new(false));

        let poll_client = client.clone();
        let poll_connected = Arc::clone(&connected);
        let commands = topics.commands.clone();
        let status = topics.status.clone();
        let broker = format!("{}:{}", mqtt.broker, mqtt.port);
        let reconnect = Duration::from_secs(settings.reconnect_secs);

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        poll_connected.store(true, Ordering::Relaxed);
                        tracing::info!("MQTT connected to {}", broker);

                        if let Err(e) = poll_client.try_subscribe(commands.as_str(), QoS::AtLeastOnce) {
                            tracing::error!("MQTT subscribe to {} failed: {}", commands, e);
                        }
                        if let Err(e) = poll_client.try_publish(status.as_str(), QoS::AtLeastOnce, true, PRESENCE_ONLINE) {
                            tracing::error!("MQTT presence publish failed: {}", e);
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = InboundMessage {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                        };
                        if tx.send(message).await.is_err() {
                            tracing::debug!("MQTT inbound channel closed, stopping event loop");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        poll_connected.store(false, Ordering::Relaxed);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        poll_connected.store(false, Ordering::Relaxed);
                        tracing::warn!("MQTT error: {}, retrying in {:?}", e, reconnect);
                        tokio::time::sleep(reconnect).await;
                    }
                }
            }
        });

        (Self { client, connected }, rx)
    }
}

impl MessageBus for MqttBus {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Disconnected);
        }

        self.client.try_publish(topic, QoS::AtMostOnce, retain, payload)?;

        Ok(())
    }
}
