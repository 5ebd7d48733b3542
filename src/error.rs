use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum PanelError {
    #[error("timed out waiting for MQTT broker connection")]
    ConnectTimeout,

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PanelError>;
