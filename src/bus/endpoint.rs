//! Receive endpoints: a named queue plus the consumers attached to it.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use super::{BatchCommit, Message, Publisher, Sender};
use crate::consume::{ConsumeContext, Consumer};
use crate::contracts::Contract;
use crate::error::ConsumeError;
use crate::outbox::{InMemoryOutbox, OutboxFlush};

type Handler =
    Box<dyn Fn(&Message, &dyn Publisher, &dyn Sender, &str) -> Result<(), ConsumeError> + Send + Sync>;

/// Outcome of delivering one message to an endpoint.
#[derive(Debug)]
pub enum Delivery {
    /// The consumer succeeded and the unit of work completed.
    Consumed(Option<OutboxFlush>),
    /// No consumer on this endpoint handles the message type.
    Skipped,
    /// The consumer failed or panicked, or the outbox commit failed.
    Faulted(ConsumeError),
}

/// A receive endpoint: one queue, one consumer per message type, and an
/// optional in-memory outbox wrapping every delivery.
///
/// ## Example
///
/// ```ignore
/// let endpoint = ReceiveEndpoint::new("test-queue")
///     .use_in_memory_outbox(true)
///     .consumer::<DoWork, _>(DoWorkConsumer::new(bus.publish_endpoint()));
/// ```
pub struct ReceiveEndpoint {
    queue: String,
    address: String,
    use_outbox: bool,
    handlers: HashMap<String, Handler>,
    duplicates: Vec<String>,
}

impl ReceiveEndpoint {
    pub fn new(queue: impl Into<String>) -> Self {
        let queue = queue.into();
        Self {
            address: queue.clone(),
            queue,
            use_outbox: false,
            handlers: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Buffer context publishes and sends until each consumer succeeds.
    pub fn use_in_memory_outbox(mut self, enabled: bool) -> Self {
        self.use_outbox = enabled;
        self
    }

    /// Attach a consumer for contract `C`.
    pub fn consumer<C, T>(self, consumer: T) -> Self
    where
        C: Contract,
        T: Consumer<C>,
    {
        self.register(
            C::MESSAGE_TYPE,
            Box::new(move |message, publisher, sender, address| {
                let contract = message.decode::<C>()?;
                let ctx = ConsumeContext::new(contract, message, publisher, sender, address);
                consumer.consume(&ctx)
            }),
        )
    }

    /// Attach a closure as the consumer for contract `C`.
    pub fn handler<C, F>(self, handler: F) -> Self
    where
        C: Contract,
        F: Fn(&ConsumeContext<'_, C>) -> Result<(), ConsumeError> + Send + Sync + 'static,
    {
        self.register(
            C::MESSAGE_TYPE,
            Box::new(move |message, publisher, sender, address| {
                let contract = message.decode::<C>()?;
                let ctx = ConsumeContext::new(contract, message, publisher, sender, address);
                handler(&ctx)
            }),
        )
    }

    fn register(mut self, message_type: &str, handler: Handler) -> Self {
        if self.handlers.insert(message_type.to_string(), handler).is_some() {
            self.duplicates.push(message_type.to_string());
        }
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn uses_outbox(&self) -> bool {
        self.use_outbox
    }

    /// Message types with a consumer on this endpoint.
    pub fn message_types(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn set_address(&mut self, address: String) {
        self.address = address;
    }

    pub(crate) fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Run one message through its consumer as a single unit of work.
    ///
    /// A panicking consumer is reported as a fault, like a returned error.
    pub fn deliver<T>(&self, message: &Message, transport: &T) -> Delivery
    where
        T: BatchCommit,
    {
        let Some(handler) = self.handlers.get(&message.message_type) else {
            return Delivery::Skipped;
        };

        if !self.use_outbox {
            return match self.run(handler, message, transport, transport) {
                Ok(()) => Delivery::Consumed(None),
                Err(err) => Delivery::Faulted(err),
            };
        }

        let outbox = InMemoryOutbox::new();
        match self.run(handler, message, &outbox, &outbox) {
            Ok(()) => match outbox.commit(transport) {
                Ok(flush) => Delivery::Consumed(Some(flush)),
                Err(err) => Delivery::Faulted(err.into()),
            },
            Err(err) => {
                let dropped = outbox.discard();
                debug!(queue = %self.queue, dropped, "unit of work failed");
                Delivery::Faulted(err)
            }
        }
    }

    fn run(
        &self,
        handler: &Handler,
        message: &Message,
        publisher: &dyn Publisher,
        sender: &dyn Sender,
    ) -> Result<(), ConsumeError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            handler(message, publisher, sender, &self.address)
        }))
        .unwrap_or_else(|payload| {
            let reason = panic_reason(payload.as_ref());
            warn!(queue = %self.queue, message_id = %message.id, %reason, "consumer panicked");
            Err(ConsumeError::Other(format!("consumer panicked: {reason}")))
        })
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "unknown panic".to_string()
    }
}
