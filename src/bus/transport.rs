//! Combined transport traits used by the bus runtime.

use super::in_memory_queue::InMemoryQueue;
use super::publisher::{PublishError, Publisher};
use super::sender::{Listener, Sender};
use super::Message;

/// Trait for transports that can route published messages to queues.
pub trait Topology: Send + Sync {
    /// Deliver a copy of every published `message_type` to `queue`.
    fn bind(&self, message_type: &str, queue: &str) -> Result<(), PublishError>;
}

impl Topology for InMemoryQueue {
    fn bind(&self, message_type: &str, queue: &str) -> Result<(), PublishError> {
        InMemoryQueue::bind(self, message_type, queue)
    }
}

/// Trait for transports that can flush the output of a unit of work at once.
///
/// There is no default implementation: chaining `publish_batch` and
/// `send_batch` could leave the first batch visible when the second fails.
pub trait BatchCommit: Publisher + Sender {
    /// Make every published and sent message visible together, or none of
    /// them. Publishes are sequenced before sends.
    fn commit_batch(
        &self,
        published: Vec<Message>,
        sent: Vec<(String, Message)>,
    ) -> Result<(), PublishError>;
}

/// Everything the bus runtime needs from a transport.
pub trait Transport: BatchCommit + Listener + Topology + Clone + 'static {}

// Blanket implementation
impl<T: BatchCommit + Listener + Topology + Clone + 'static> Transport for T {}
