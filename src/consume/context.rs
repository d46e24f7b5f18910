//! Context passed to consumers.

use crate::bus::{Message, PublishError, Publisher, Sender};
use crate::contracts::Contract;

/// The context passed to every consumer.
///
/// Carries the decoded message, its envelope, and the publish and send
/// channels of the current unit of work. When the receive endpoint uses the
/// in-memory outbox, both channels buffer until the consumer has returned
/// successfully.
///
/// ## Example
///
/// ```ignore
/// fn consume(&self, ctx: &ConsumeContext<'_, OrderPlaced>) -> Result<(), ConsumeError> {
///     ctx.publish(&OrderAccepted { id: ctx.message().id })?;
///     Ok(())
/// }
/// ```
pub struct ConsumeContext<'a, C> {
    message: C,
    envelope: &'a Message,
    publisher: &'a dyn Publisher,
    sender: &'a dyn Sender,
    /// Address of the receive endpoint handling the message.
    address: &'a str,
}

impl<'a, C: Contract> ConsumeContext<'a, C> {
    pub fn new(
        message: C,
        envelope: &'a Message,
        publisher: &'a dyn Publisher,
        sender: &'a dyn Sender,
        address: &'a str,
    ) -> Self {
        Self {
            message,
            envelope,
            publisher,
            sender,
            address,
        }
    }

    /// The decoded message.
    pub fn message(&self) -> &C {
        &self.message
    }

    /// The raw envelope the message arrived in.
    pub fn envelope(&self) -> &Message {
        self.envelope
    }

    pub fn message_id(&self) -> &str {
        &self.envelope.id
    }

    pub fn conversation_id(&self) -> &str {
        self.envelope.conversation_id()
    }

    /// Address of the receive endpoint.
    pub fn address(&self) -> &str {
        self.address
    }

    /// Publish an event within the unit of work.
    pub fn publish<E: Contract>(&self, event: &E) -> Result<(), PublishError> {
        let message = self.stamp(Message::encode(event)?);
        self.publisher.publish(message)
    }

    /// Send a message to a named queue within the unit of work.
    pub fn send<E: Contract>(&self, queue: &str, message: &E) -> Result<(), PublishError> {
        let message = self.stamp(Message::encode(message)?);
        self.sender.send(queue, message)
    }

    fn stamp(&self, message: Message) -> Message {
        message
            .caused_by(self.envelope)
            .with_source(self.address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryQueue;
    use crate::contracts::{DoWork, SomeEvent2, SomeEvent3};

    #[test]
    fn publish_inherits_conversation() {
        let transport = InMemoryQueue::new();
        let envelope = Message::encode(&DoWork).unwrap();
        let ctx = ConsumeContext::new(DoWork, &envelope, &transport, &transport, "loopback://localhost/q");

        ctx.publish(&SomeEvent2).unwrap();

        let published = transport.find_by_type("SomeEvent2").unwrap();
        assert_eq!(published.conversation_id(), envelope.id);
        assert_eq!(published.headers.initiator_id.as_deref(), Some(envelope.id.as_str()));
        assert_eq!(
            published.headers.source_address.as_deref(),
            Some("loopback://localhost/q")
        );
    }

    #[test]
    fn send_goes_to_named_queue() {
        let transport = InMemoryQueue::new();
        let envelope = Message::encode(&DoWork).unwrap();
        let ctx = ConsumeContext::new(DoWork, &envelope, &transport, &transport, "q");

        ctx.send("audit", &SomeEvent3).unwrap();

        assert!(transport.is_empty());
        let sent = transport.queue_messages("audit");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_type, "SomeEvent3");
        assert_eq!(ctx.message_id(), envelope.id);
        assert_eq!(ctx.conversation_id(), envelope.id);
        assert_eq!(*ctx.message(), DoWork);
    }
}
