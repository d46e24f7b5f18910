//! Bus runtime: receive endpoints, send conventions and listener threads.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::endpoint::{Delivery, ReceiveEndpoint};
use super::{Message, PublishEndpoint, Transport};
use crate::config::{BusConfig, MAX_POLL_INTERVAL_MS};
use crate::consume::ConsumeObserver;
use crate::contracts::Contract;
use crate::error::BusError;

/// Statistics from the endpoint listener threads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusStats {
    /// Messages whose unit of work completed.
    pub consumed: usize,
    /// Messages moved to an error queue.
    pub faulted: usize,
    /// Messages moved to a skipped queue.
    pub skipped: usize,
    /// Poll cycles completed.
    pub polls: usize,
}

impl BusStats {
    fn merge(mut self, other: BusStats) -> Self {
        self.consumed += other.consumed;
        self.faulted += other.faulted;
        self.skipped += other.skipped;
        self.polls += other.polls;
        self
    }
}

/// A configured, not yet started bus.
///
/// ## Example
///
/// ```ignore
/// let bus = Bus::new(InMemoryQueue::new(), BusConfig::default());
/// let publish_endpoint = bus.publish_endpoint();
///
/// let handle = bus
///     .receive_endpoint(
///         ReceiveEndpoint::new("test-queue")
///             .use_in_memory_outbox(true)
///             .consumer::<DoWork, _>(DoWorkConsumer::new(publish_endpoint)),
///     )?
///     .start()?;
///
/// handle.send(&DoWork)?;
/// let stats = handle.stop();
/// ```
pub struct Bus<T: Transport> {
    transport: T,
    config: BusConfig,
    endpoints: Vec<ReceiveEndpoint>,
    conventions: BTreeMap<String, String>,
    observers: Vec<Arc<dyn ConsumeObserver>>,
}

impl<T: Transport> Bus<T> {
    /// Create a bus over a transport. Send conventions from the
    /// configuration are applied.
    pub fn new(transport: T, config: BusConfig) -> Self {
        let conventions = config.send_conventions.clone();
        Self {
            transport,
            config,
            endpoints: Vec::new(),
            conventions,
            observers: Vec::new(),
        }
    }

    /// Add a receive endpoint and bind its message types to its queue.
    pub fn receive_endpoint(mut self, mut endpoint: ReceiveEndpoint) -> Result<Self, BusError> {
        if self.endpoints.iter().any(|e| e.queue() == endpoint.queue()) {
            return Err(BusError::DuplicateEndpoint(endpoint.queue().to_string()));
        }
        if let Some(message_type) = endpoint.duplicates().first() {
            return Err(BusError::DuplicateConsumer {
                queue: endpoint.queue().to_string(),
                message_type: message_type.clone(),
            });
        }

        for message_type in endpoint.message_types() {
            self.transport.bind(message_type, endpoint.queue())?;
        }
        endpoint.set_address(self.config.address(endpoint.queue()));
        debug!(
            queue = %endpoint.queue(),
            outbox = endpoint.uses_outbox(),
            "receive endpoint configured"
        );
        self.endpoints.push(endpoint);
        Ok(self)
    }

    /// Send every `C` to `queue` when no destination is given.
    pub fn map_endpoint<C: Contract>(mut self, queue: impl Into<String>) -> Self {
        self.conventions.insert(C::MESSAGE_TYPE.to_string(), queue.into());
        self
    }

    pub fn connect_consume_observer(mut self, observer: Arc<dyn ConsumeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Immediate publish channel over this bus's transport.
    pub fn publish_endpoint(&self) -> PublishEndpoint {
        PublishEndpoint::new(self.transport.clone(), self.config.address("bus"))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Start one listener thread per receive endpoint.
    pub fn start(self) -> Result<BusHandle<T>, BusError> {
        let publish_endpoint = self.publish_endpoint();
        let observers: Arc<[Arc<dyn ConsumeObserver>]> = self.observers.into();
        let mut workers = Vec::with_capacity(self.endpoints.len());

        for endpoint in self.endpoints {
            let queue = endpoint.queue().to_string();
            let (stop_tx, stop_rx) = mpsc::channel();
            let receiver = Receiver {
                transport: self.transport.clone(),
                error_queue: self.config.error_queue(&queue),
                skipped_queue: self.config.skipped_queue(&queue),
                observers: Arc::clone(&observers),
                endpoint,
            };
            let poll_ms = self.config.poll_interval_ms.min(MAX_POLL_INTERVAL_MS);

            let handle = thread::Builder::new()
                .name(format!("endpoint-{queue}"))
                .spawn(move || {
                    let mut stats = BusStats::default();

                    loop {
                        match stop_rx.try_recv() {
                            Ok(()) | Err(TryRecvError::Disconnected) => break,
                            Err(TryRecvError::Empty) => {}
                        }

                        stats.polls += 1;

                        match receiver.transport.listen(receiver.endpoint.queue(), poll_ms) {
                            Ok(Some(message)) => receiver.receive(&message, &mut stats),
                            Ok(None) => {}
                            Err(err) => warn!(queue = %receiver.endpoint.queue(), error = %err, "listen failed"),
                        }
                    }

                    stats
                })?;

            info!(queue = %queue, "receive endpoint started");
            workers.push(Worker {
                stop_tx,
                handle: Some(handle),
            });
        }

        Ok(BusHandle {
            transport: self.transport,
            conventions: self.conventions,
            publish_endpoint,
            workers,
        })
    }
}

/// State owned by one endpoint listener thread.
struct Receiver<T> {
    transport: T,
    endpoint: ReceiveEndpoint,
    error_queue: String,
    skipped_queue: String,
    observers: Arc<[Arc<dyn ConsumeObserver>]>,
}

impl<T: Transport> Receiver<T> {
    fn receive(&self, message: &Message, stats: &mut BusStats) {
        let queue = self.endpoint.queue();
        for observer in self.observers.iter() {
            observer.pre_consume(queue, message);
        }

        debug!(queue, message_type = %message.message_type, message_id = %message.id, "received");

        match self.endpoint.deliver(message, &self.transport) {
            Delivery::Consumed(flush) => {
                stats.consumed += 1;
                debug!(queue, message_id = %message.id, ?flush, "consumed");
                for observer in self.observers.iter() {
                    observer.post_consume(queue, message);
                }
            }
            Delivery::Skipped => {
                stats.skipped += 1;
                warn!(queue, message_type = %message.message_type, "no consumer, moving to {}", self.skipped_queue);
                if let Err(err) = self.transport.send(&self.skipped_queue, message.clone()) {
                    warn!(queue, error = %err, "failed to move skipped message");
                }
            }
            Delivery::Faulted(error) => {
                stats.faulted += 1;
                warn!(queue, message_id = %message.id, %error, "consume faulted, moving to {}", self.error_queue);
                let faulted = message.clone().with_header("fault-reason", error.to_string());
                if let Err(err) = self.transport.send(&self.error_queue, faulted) {
                    warn!(queue, error = %err, "failed to move faulted message");
                }
                for observer in self.observers.iter() {
                    observer.consume_fault(queue, message, &error);
                }
            }
        }
    }
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<BusStats>>,
}

/// Handle to a started bus. Drop or call `stop()` to shut it down.
pub struct BusHandle<T: Transport> {
    transport: T,
    conventions: BTreeMap<String, String>,
    publish_endpoint: PublishEndpoint,
    workers: Vec<Worker>,
}

impl<T: Transport> BusHandle<T> {
    /// Send a message to the queue its send convention names.
    pub fn send<C: Contract>(&self, message: &C) -> Result<(), BusError> {
        let queue = self
            .conventions
            .get(C::MESSAGE_TYPE)
            .ok_or_else(|| BusError::EndpointNotMapped(C::MESSAGE_TYPE.to_string()))?;
        self.send_to(queue, message)
    }

    /// Send a message to an explicit queue.
    pub fn send_to<C: Contract>(&self, queue: &str, message: &C) -> Result<(), BusError> {
        let message = Message::encode(message)
            .map_err(crate::bus::PublishError::from)?
            .with_source(self.publish_endpoint.address().to_string());
        debug!(queue, message_type = %message.message_type, message_id = %message.id, "sending");
        self.transport.send(queue, message)?;
        Ok(())
    }

    /// Publish immediately.
    pub fn publish<C: Contract>(&self, message: &C) -> Result<(), BusError> {
        self.publish_endpoint.publish(message)?;
        Ok(())
    }

    pub fn publish_endpoint(&self) -> PublishEndpoint {
        self.publish_endpoint.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Queues with a send convention, by message type.
    pub fn conventions(&self) -> &BTreeMap<String, String> {
        &self.conventions
    }

    /// Stop every listener and wait for them. Returns combined stats.
    pub fn stop(mut self) -> BusStats {
        for worker in &self.workers {
            let _ = worker.stop_tx.send(());
        }

        let mut stats = BusStats::default();
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                match handle.join() {
                    Ok(worker_stats) => stats = stats.merge(worker_stats),
                    Err(_) => warn!("receive endpoint thread panicked, its stats are lost"),
                }
            }
        }
        info!(
            consumed = stats.consumed,
            faulted = stats.faulted,
            skipped = stats.skipped,
            "bus stopped"
        );
        stats
    }
}

impl<T: Transport> Drop for BusHandle<T> {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.stop_tx.send(());
        }
    }
}
