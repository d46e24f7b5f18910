//! Consumers and the context they run in.

mod consumer;
mod context;

pub use consumer::{ConsumeObserver, Consumer};
pub use context::ConsumeContext;
