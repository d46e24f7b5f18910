//! Message envelope carried by the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contracts::Contract;
use crate::error::ConsumeError;

/// Routing and causality headers stamped on every message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers {
    /// Shared by every message caused (directly or not) by the same trigger.
    pub conversation_id: Option<String>,
    /// Id of the consumed message that caused this one.
    pub initiator_id: Option<String>,
    /// Address of the endpoint that produced the message.
    pub source_address: Option<String>,
    /// Queue the message was sent to, for point-to-point delivery.
    pub destination_address: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Free-form headers (fault reasons, correlation keys, etc.).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

/// A message travelling through the bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message
    pub id: String,
    /// Contract tag (e.g., "DoWork", "SomeEvent1")
    pub message_type: String,
    /// bitcode-serialized contract
    pub payload: Vec<u8>,
    pub headers: Headers,
    /// Position at which the transport made the message observable. Zero
    /// until the message has been published or sent.
    pub sequence: u64,
}

impl Message {
    /// Create a new message with a fresh id and the given type and payload.
    pub fn new(message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: message_type.into(),
            payload,
            headers: Headers {
                sent_at: Some(Utc::now()),
                ..Headers::default()
            },
            sequence: 0,
        }
    }

    /// Encode a contract into a new message.
    pub fn encode<C: Contract>(contract: &C) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(contract)?;
        Ok(Self::new(C::MESSAGE_TYPE, bytes))
    }

    /// Decode the payload as the given contract, checking the type tag first.
    pub fn decode<C: Contract>(&self) -> Result<C, ConsumeError> {
        if self.message_type != C::MESSAGE_TYPE {
            return Err(ConsumeError::WrongMessageType {
                expected: C::MESSAGE_TYPE.to_string(),
                actual: self.message_type.clone(),
            });
        }
        Ok(bitcode::deserialize(&self.payload)?)
    }

    /// Whether this message carries the given contract.
    pub fn is<C: Contract>(&self) -> bool {
        self.message_type == C::MESSAGE_TYPE
    }

    /// Mark this message as caused by `cause`, joining its conversation.
    pub fn caused_by(mut self, cause: &Message) -> Self {
        let conversation = cause
            .headers
            .conversation_id
            .clone()
            .unwrap_or_else(|| cause.id.clone());
        self.headers.conversation_id = Some(conversation);
        self.headers.initiator_id = Some(cause.id.clone());
        self
    }

    pub fn with_source(mut self, address: impl Into<String>) -> Self {
        self.headers.source_address = Some(address.into());
        self
    }

    pub fn with_destination(mut self, address: impl Into<String>) -> Self {
        self.headers.destination_address = Some(address.into());
        self
    }

    /// Add a free-form header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.extra.push((key.into(), value.into()));
        self
    }

    /// Look up a free-form header.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .extra
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Conversation id, falling back to the message's own id for a root message.
    pub fn conversation_id(&self) -> &str {
        self.headers.conversation_id.as_deref().unwrap_or(&self.id)
    }
}
