//! In-memory transport for single-process buses and tests.
//!
//! `InMemoryQueue` implements every transport trait of the bus:
//! - `Publisher`: fan-out into an append-only log, plus a copy routed to each
//!   queue bound to the message type
//! - `Subscriber`: independent read positions over the published log
//! - `Sender` / `Listener`: named FIFO queues with competing consumers
//! - `BatchCommit`: publishes and sends from one unit of work, all or none

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::{BatchCommit, Listener, Message, PublishError, Publisher, Sender, Subscriber};

/// In-memory transport.
///
/// Features:
/// - Thread-safe (clones share the same state)
/// - Supports multiple subscribers via `new_subscriber()`
/// - Published messages are stored in an append-only log
/// - Every message gets a transport-wide sequence number when it becomes
///   observable, so observers can order publishes and sends
///
/// ## Example
///
/// ```
/// use outbox_probe::bus::{InMemoryQueue, Message, Publisher, Subscriber};
///
/// let queue = InMemoryQueue::new();
/// queue.publish(Message::new("OrderCreated", Vec::new())).unwrap();
///
/// let message = queue.poll(100).unwrap().unwrap();
/// assert_eq!(message.message_type, "OrderCreated");
/// assert_eq!(message.sequence, 1);
/// ```
#[derive(Clone)]
pub struct InMemoryQueue {
    /// Shared published log
    log: Arc<RwLock<Vec<Message>>>,
    /// Named point-to-point queues
    queues: Arc<Mutex<HashMap<String, VecDeque<Message>>>>,
    /// Message type -> queues receiving a copy of each publish
    bindings: Arc<RwLock<HashMap<String, Vec<String>>>>,
    sequence: Arc<AtomicU64>,
    /// Per-subscriber read position
    position: Arc<Mutex<usize>>,
    /// Per-subscriber acknowledged message IDs
    acked: Arc<Mutex<Vec<String>>>,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            log: Arc::new(RwLock::new(Vec::new())),
            queues: Arc::new(Mutex::new(HashMap::new())),
            bindings: Arc::new(RwLock::new(HashMap::new())),
            sequence: Arc::new(AtomicU64::new(0)),
            position: Arc::new(Mutex::new(0)),
            acked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a new subscriber that shares the transport but has its own
    /// read position over the published log, starting at the beginning.
    pub fn new_subscriber(&self) -> Self {
        Self {
            position: Arc::new(Mutex::new(0)),
            acked: Arc::new(Mutex::new(Vec::new())),
            ..self.clone()
        }
    }

    /// Route every future publish of `message_type` to `queue` as well.
    pub fn bind(&self, message_type: &str, queue: &str) -> Result<(), PublishError> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| PublishError::LockPoisoned("bind"))?;
        let queues = bindings.entry(message_type.to_string()).or_default();
        if !queues.iter().any(|q| q == queue) {
            queues.push(queue.to_string());
        }
        Ok(())
    }

    /// Queues bound to a message type.
    pub fn bound_queues(&self, message_type: &str) -> Vec<String> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Get all published messages.
    pub fn events(&self) -> Vec<Message> {
        self.log.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Get all published message types in order.
    pub fn event_types(&self) -> Vec<String> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.message_type.clone())
            .collect()
    }

    /// Number of published messages.
    pub fn len(&self) -> usize {
        self.log.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the first published message of a type.
    pub fn find_by_type(&self, message_type: &str) -> Option<Message> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.message_type == message_type)
            .cloned()
    }

    /// Find all published messages of a type.
    pub fn find_all_by_type(&self, message_type: &str) -> Vec<Message> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.message_type == message_type)
            .cloned()
            .collect()
    }

    /// Number of messages waiting on a named queue.
    pub fn queue_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    /// Snapshot of the messages waiting on a named queue.
    pub fn queue_messages(&self, queue: &str) -> Vec<Message> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Highest sequence number handed out so far.
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Reset this subscriber's position to the beginning.
    pub fn reset_position(&self) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = 0;
    }

    pub fn current_position(&self) -> usize {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Message IDs acknowledged by this subscriber.
    pub fn acknowledged(&self) -> Vec<String> {
        self.acked.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clear the log, every queue and this subscriber's state. Bindings and
    /// the sequence counter are kept.
    pub fn clear(&self) {
        self.log.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.queues.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.reset_position();
        self.acked.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Poison the queue lock, as a panicking listener would.
    #[cfg(test)]
    pub(crate) fn poison_queues(&self) {
        let queues = Arc::clone(&self.queues);
        let _ = std::thread::spawn(move || {
            let _guard = queues.lock().unwrap_or_else(PoisonError::into_inner);
            panic!("poisoning queue lock");
        })
        .join();
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Publisher for InMemoryQueue {
    fn publish(&self, message: Message) -> Result<(), PublishError> {
        self.publish_batch(vec![message])
    }

    /// The whole batch becomes visible under a single lock acquisition.
    fn publish_batch(&self, messages: Vec<Message>) -> Result<(), PublishError> {
        self.commit_batch(messages, Vec::new())
    }
}

impl Sender for InMemoryQueue {
    fn send(&self, queue: &str, message: Message) -> Result<(), PublishError> {
        self.send_batch(vec![(queue.to_string(), message)])
    }

    fn send_batch(&self, messages: Vec<(String, Message)>) -> Result<(), PublishError> {
        self.commit_batch(Vec::new(), messages)
    }
}

impl BatchCommit for InMemoryQueue {
    /// Every lock is taken before anything is written, so a poisoned lock
    /// leaves the log and the queues untouched.
    fn commit_batch(
        &self,
        published: Vec<Message>,
        sent: Vec<(String, Message)>,
    ) -> Result<(), PublishError> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| PublishError::LockPoisoned("commit"))?;
        let mut log = self
            .log
            .write()
            .map_err(|_| PublishError::LockPoisoned("commit"))?;
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| PublishError::LockPoisoned("commit"))?;

        for mut message in published {
            message.sequence = self.next_sequence();
            if let Some(bound) = bindings.get(&message.message_type) {
                for queue in bound {
                    let copy = message.clone().with_destination(queue.clone());
                    queues.entry(queue.clone()).or_default().push_back(copy);
                }
            }
            log.push(message);
        }
        for (queue, mut message) in sent {
            message.sequence = self.next_sequence();
            let message = message.with_destination(queue.clone());
            queues.entry(queue).or_default().push_back(message);
        }
        Ok(())
    }
}

impl Listener for InMemoryQueue {
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Message>, PublishError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            {
                let mut queues = self
                    .queues
                    .lock()
                    .map_err(|_| PublishError::LockPoisoned("listen"))?;
                if let Some(message) = queues.get_mut(queue).and_then(VecDeque::pop_front) {
                    return Ok(Some(message));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Subscriber for InMemoryQueue {
    fn poll(&self, timeout_ms: u64) -> Result<Option<Message>, PublishError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            {
                let log = self
                    .log
                    .read()
                    .map_err(|_| PublishError::LockPoisoned("poll"))?;
                let mut pos = self
                    .position
                    .lock()
                    .map_err(|_| PublishError::LockPoisoned("poll"))?;

                if *pos < log.len() {
                    let message = log[*pos].clone();
                    *pos += 1;
                    return Ok(Some(message));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ack(&self, message_id: &str) -> Result<(), PublishError> {
        self.acked
            .lock()
            .map_err(|_| PublishError::LockPoisoned("ack"))?
            .push(message_id.to_string());
        Ok(())
    }

    fn nack(&self, _message_id: &str, _reason: &str) -> Result<(), PublishError> {
        // No redelivery: the message stays in the log
        Ok(())
    }
}
