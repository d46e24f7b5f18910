use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::bus::{BatchCommit, Message, PublishError, Publisher, Sender};

/// Result of committing an outbox.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutboxFlush {
    pub published: usize,
    pub sent: usize,
}

/// Transactional publish channel for one unit of work.
///
/// Publishes and sends made through the outbox are buffered. `commit` hands
/// them to the transport once the consumer has succeeded; `discard` drops
/// them when it failed. An outbox belongs to a single delivery.
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    published: Mutex<Vec<Message>>,
    sent: Mutex<Vec<(String, Message)>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered messages (publishes and sends).
    pub fn len(&self) -> usize {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            + self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Message types currently buffered for publish, in order.
    pub fn pending_types(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.message_type.clone())
            .collect()
    }

    /// Flush the buffer to the transport.
    ///
    /// Buffered publishes and sends go out in a single `commit_batch`:
    /// either all of them become visible or none do.
    pub fn commit<T>(self, transport: &T) -> Result<OutboxFlush, PublishError>
    where
        T: BatchCommit + ?Sized,
    {
        let published = self
            .published
            .into_inner()
            .map_err(|_| PublishError::LockPoisoned("outbox commit"))?;
        let sent = self
            .sent
            .into_inner()
            .map_err(|_| PublishError::LockPoisoned("outbox commit"))?;

        let flush = OutboxFlush {
            published: published.len(),
            sent: sent.len(),
        };
        if !published.is_empty() || !sent.is_empty() {
            transport.commit_batch(published, sent)?;
        }
        debug!(published = flush.published, sent = flush.sent, "outbox committed");
        Ok(flush)
    }

    /// Drop everything buffered. Returns the number of dropped messages.
    pub fn discard(self) -> usize {
        let dropped = self.len();
        debug!(dropped, "outbox discarded");
        dropped
    }
}

impl Publisher for InMemoryOutbox {
    fn publish(&self, message: Message) -> Result<(), PublishError> {
        self.published
            .lock()
            .map_err(|_| PublishError::LockPoisoned("outbox publish"))?
            .push(message);
        Ok(())
    }
}

impl Sender for InMemoryOutbox {
    fn send(&self, queue: &str, message: Message) -> Result<(), PublishError> {
        self.sent
            .lock()
            .map_err(|_| PublishError::LockPoisoned("outbox send"))?
            .push((queue.to_string(), message));
        Ok(())
    }
}
