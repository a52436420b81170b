#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Message bus is disconnected")]
    Disconnected,
}
