//! In-memory outbox: the transactional publish channel of a receive endpoint.
//!
//! ```text
//!  consumer ── ctx.publish ──▶ InMemoryOutbox ──(commit on success)──▶ transport
//!           └─ endpoint.publish ─────────────────────────────────────▶ transport
//! ```
//!
//! The bus creates one outbox per delivery when the endpoint enables it.

mod in_memory;

pub use in_memory::{InMemoryOutbox, OutboxFlush};
