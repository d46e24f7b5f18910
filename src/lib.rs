pub mod bus;
pub mod config;
pub mod consume;
pub mod consumers;
pub mod contracts;
mod error;
pub mod outbox;
pub mod probe;
pub mod telemetry;

pub use bus::{Bus, BusHandle, BusStats, InMemoryQueue, Message, PublishEndpoint, ReceiveEndpoint};
pub use config::BusConfig;
pub use consume::{ConsumeContext, ConsumeObserver, Consumer};
pub use contracts::{Contract, DoWork, SomeEvent1, SomeEvent2, SomeEvent3};
pub use error::{BusError, ConfigError, ConsumeError};
pub use outbox::{InMemoryOutbox, OutboxFlush};
