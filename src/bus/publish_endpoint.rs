//! Immediate publish channel.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Message, PublishError, Publisher};
use crate::contracts::Contract;

/// A cloneable handle that publishes straight to the transport.
///
/// Messages published through it are observable as soon as `publish`
/// returns, whatever happens to the unit of work that is running at the
/// time. Consumers receive it at construction time; contrast with
/// `ConsumeContext::publish`, which goes through the endpoint's outbox.
#[derive(Clone)]
pub struct PublishEndpoint {
    publisher: Arc<dyn Publisher>,
    address: String,
}

impl PublishEndpoint {
    pub fn new<P: Publisher + 'static>(publisher: P, address: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(publisher), address)
    }

    pub fn from_shared(publisher: Arc<dyn Publisher>, address: impl Into<String>) -> Self {
        Self {
            publisher,
            address: address.into(),
        }
    }

    /// Encode and publish a contract now.
    pub fn publish<C: Contract>(&self, contract: &C) -> Result<(), PublishError> {
        let message = Message::encode(contract)?;
        self.publish_message(message)
    }

    /// Publish a prepared message now, stamping this endpoint as the source.
    pub fn publish_message(&self, message: Message) -> Result<(), PublishError> {
        let message = message.with_source(self.address.clone());
        debug!(
            message_type = %message.message_type,
            message_id = %message.id,
            "publishing immediately"
        );
        self.publisher.publish(message)
    }

    /// Source address stamped on published messages.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Debug for PublishEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishEndpoint")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Publisher for PublishEndpoint {
    fn publish(&self, message: Message) -> Result<(), PublishError> {
        self.publish_message(message)
    }
}
