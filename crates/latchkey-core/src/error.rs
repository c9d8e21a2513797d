use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Credential errors
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Invalid tag identifier: {0}")]
    InvalidTag(String),

    // Actuator errors
    #[error("Servo position {position} outside range {min}-{max}")]
    PositionOutOfRange { position: f64, min: f64, max: f64 },

    #[error("Invalid lock state flag: {0}")]
    InvalidLockFlag(u8),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
