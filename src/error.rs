use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("No ambient light sensor available on this device")]
    SensorUnavailable,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Sensor registration failed: {0}")]
    Registration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
