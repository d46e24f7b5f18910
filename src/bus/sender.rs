//! Point-to-point traits: sending to and listening on named queues.

use super::publisher::PublishError;
use super::Message;

/// Trait for sending messages to a named queue (point-to-point).
///
/// Unlike `Publisher` (fan-out), each sent message is consumed by exactly
/// one listener of the destination queue.
pub trait Sender: Send + Sync {
    /// Send a message to a named queue.
    fn send(&self, queue: &str, message: Message) -> Result<(), PublishError>;

    /// Send several messages, in order. Default implementation is sequential.
    fn send_batch(&self, messages: Vec<(String, Message)>) -> Result<(), PublishError> {
        for (queue, message) in messages {
            self.send(&queue, message)?;
        }
        Ok(())
    }
}

/// Trait for listening on a named queue (competing consumers).
pub trait Listener: Send + Sync {
    /// Take the next message from a named queue, blocking until one is
    /// available or the timeout expires.
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Message>, PublishError>;
}
