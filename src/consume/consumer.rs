use super::ConsumeContext;
use crate::bus::Message;
use crate::contracts::Contract;
use crate::error::ConsumeError;

/// A consumer of one message contract.
///
/// Returning an error fails the unit of work: the endpoint discards its
/// outbox and moves the message to the error queue.
pub trait Consumer<C: Contract>: Send + Sync + 'static {
    fn consume(&self, ctx: &ConsumeContext<'_, C>) -> Result<(), ConsumeError>;
}

/// Hooks around every delivery made by a receive endpoint.
///
/// `post_consume` runs once the unit of work has completed, i.e. after the
/// outbox (if any) has been committed.
pub trait ConsumeObserver: Send + Sync {
    fn pre_consume(&self, _queue: &str, _message: &Message) {}

    fn post_consume(&self, _queue: &str, _message: &Message) {}

    fn consume_fault(&self, _queue: &str, _message: &Message, _error: &ConsumeError) {}
}
