//! Process bootstrap: the bus, its work endpoint and the consumer, wired
//! from a `BusConfig`.

use std::sync::Arc;

use crate::bus::{Bus, ReceiveEndpoint, Transport};
use crate::config::BusConfig;
use crate::consume::ConsumeObserver;
use crate::consumers::DoWorkConsumer;
use crate::contracts::DoWork;
use crate::error::BusError;

/// Options that shape the demo beyond the bus configuration.
#[derive(Default, Clone)]
pub struct ProbeOptions {
    /// Make the consumer fail right after this step.
    pub fail_after_step: Option<u8>,
    pub observers: Vec<Arc<dyn ConsumeObserver>>,
}

/// Build the demo bus: one receive endpoint on `config.queue_name` with the
/// `DoWork` consumer, which gets the bus's publish endpoint injected.
pub fn configure<T: Transport>(
    transport: T,
    config: BusConfig,
    options: ProbeOptions,
) -> Result<Bus<T>, BusError> {
    let queue = config.queue_name.clone();
    let use_outbox = config.use_in_memory_outbox;

    let mut bus = Bus::new(transport, config).map_endpoint::<DoWork>(queue.clone());
    for observer in options.observers {
        bus = bus.connect_consume_observer(observer);
    }

    let mut consumer = DoWorkConsumer::new(bus.publish_endpoint());
    if let Some(step) = options.fail_after_step {
        consumer = consumer.fail_after_step(step)?;
    }

    bus.receive_endpoint(
        ReceiveEndpoint::new(queue)
            .use_in_memory_outbox(use_outbox)
            .consumer::<DoWork, _>(consumer),
    )
}
