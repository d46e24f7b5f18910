//! Message bus: transport traits, the in-memory transport, receive
//! endpoints and the bus runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Bus / BusHandle (per process)                │
//! │  - receive endpoints, send conventions, listener threads    │
//! │  - send() / publish() / publish_endpoint() / stop()         │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transport traits                        │
//! │  Publisher: publish / publish_batch     (fan-out)           │
//! │  Subscriber: poll / ack / nack          (observers)         │
//! │  Sender / Listener: send / listen       (point-to-point)    │
//! │  Topology: bind(message type, queue)                        │
//! │  BatchCommit: commit_batch(publishes, sends) (all or none)  │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                    ┌───────────────┐
//!                    │ InMemoryQueue │
//!                    └───────────────┘
//! ```
//!
//! A receive endpoint may wrap each delivery in an in-memory outbox (see
//! [`crate::outbox`]): publishes made through the consume context are then
//! held back until the consumer returns successfully, while publishes made
//! through a [`PublishEndpoint`] are visible immediately.

mod bus;
mod endpoint;
mod in_memory_queue;
mod message;
mod publish_endpoint;
mod publisher;
mod sender;
mod subscriber;
mod transport;

pub use bus::{Bus, BusHandle, BusStats};
pub use endpoint::{Delivery, ReceiveEndpoint};
pub use in_memory_queue::InMemoryQueue;
pub use message::{Headers, Message};
pub use publish_endpoint::PublishEndpoint;
pub use publisher::{PublishError, Publisher};
pub use sender::{Listener, Sender};
pub use subscriber::Subscriber;
pub use transport::{BatchCommit, Topology, Transport};
