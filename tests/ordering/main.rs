//! Ordering of context publishes versus publish-endpoint publishes,
//! observed from outside the consumer.

mod support;
mod end_to_end;
mod failure;
mod immediate_vs_outbox;
mod routing;
