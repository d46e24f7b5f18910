use thiserror::Error;

use crate::bus::PublishError;

/// Failure of a single consumption. Reported to the receive endpoint, which
/// discards the outbox and moves the message to the error queue.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("step {step} failed: {reason}")]
    Step { step: u8, reason: String },

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("wrong message type: expected {expected}, got {actual}")]
    WrongMessageType { expected: String, actual: String },

    #[error("{0}")]
    Other(String),
}

impl From<bitcode::Error> for ConsumeError {
    fn from(err: bitcode::Error) -> Self {
        ConsumeError::Decode(err.to_string())
    }
}

/// Errors raised while configuring, starting or driving the bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no endpoint mapped for message type {0}")]
    EndpointNotMapped(String),

    #[error("consumer for {message_type} already registered on {queue}")]
    DuplicateConsumer { queue: String, message_type: String },

    #[error("receive endpoint {0} already configured")]
    DuplicateEndpoint(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("failed to spawn endpoint listener: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
