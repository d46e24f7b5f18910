//! Core publisher trait for the bus.

use std::error::Error;

use thiserror::Error;

use super::Message;

/// Error type for publish and send operations.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A transport lock was poisoned by a panicking thread
    #[error("transport lock poisoned during {0}")]
    LockPoisoned(&'static str),
    /// Serialization of the message failed
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// The transport rejected the message
    #[error("message rejected: {0}")]
    Rejected(String),
    #[error("publish error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl From<bitcode::Error> for PublishError {
    fn from(err: bitcode::Error) -> Self {
        PublishError::Serialization(err.to_string())
    }
}

/// Trait for publishing messages (fan-out to every subscriber and bound queue).
pub trait Publisher: Send + Sync {
    /// Publish a single message.
    fn publish(&self, message: Message) -> Result<(), PublishError>;

    /// Publish multiple messages.
    ///
    /// Default implementation publishes sequentially. Transports that can make
    /// a batch visible atomically should override it.
    fn publish_batch(&self, messages: Vec<Message>) -> Result<(), PublishError> {
        for message in messages {
            self.publish(message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    impl Publisher for Recording {
        fn publish(&self, message: Message) -> Result<(), PublishError> {
            self.0
                .lock()
                .map_err(|_| PublishError::LockPoisoned("publish"))?
                .push(message.message_type);
            Ok(())
        }
    }

    #[test]
    fn default_batch_publishes_in_order() {
        let publisher = Recording(Mutex::new(Vec::new()));
        publisher
            .publish_batch(vec![Message::new("A", Vec::new()), Message::new("B", Vec::new())])
            .unwrap();
        assert_eq!(*publisher.0.lock().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            PublishError::LockPoisoned("publish").to_string(),
            "transport lock poisoned during publish"
        );
        assert_eq!(PublishError::Rejected("full".into()).to_string(), "message rejected: full");
    }
}
