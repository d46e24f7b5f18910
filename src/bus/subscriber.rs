//! Core subscriber trait for the bus.

use super::publisher::PublishError;
use super::Message;

/// Trait for subscribing to published messages.
///
/// This is a pull-based interface: each subscriber keeps its own read
/// position over the published log.
pub trait Subscriber: Send + Sync {
    /// Poll for the next message, blocking until one is available or timeout.
    fn poll(&self, timeout_ms: u64) -> Result<Option<Message>, PublishError>;

    /// Acknowledge that a message has been processed.
    fn ack(&self, message_id: &str) -> Result<(), PublishError>;

    /// Reject a message.
    fn nack(&self, message_id: &str, reason: &str) -> Result<(), PublishError>;
}
