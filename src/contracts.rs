//! Message contracts.
//!
//! A contract is a serializable type with a stable string tag used for
//! routing. The demo's contracts carry no payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A message type the bus can route.
pub trait Contract: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Routing tag, unique per contract.
    const MESSAGE_TYPE: &'static str;
}

/// Implement [`Contract`] for a type using its name as the tag.
#[macro_export]
macro_rules! contract {
    ($ty:ident) => {
        impl $crate::contracts::Contract for $ty {
            const MESSAGE_TYPE: &'static str = stringify!($ty);
        }
    };
}

/// Work item sent to the demo queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoWork;

/// Published through the publish endpoint: visible right away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SomeEvent1;

/// Published through the consume context: visible once the outbox commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SomeEvent2;

/// Declared but never produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SomeEvent3;

contract!(DoWork);
contract!(SomeEvent1);
contract!(SomeEvent2);
contract!(SomeEvent3);
