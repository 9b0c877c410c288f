//! Agent 间通信协议

pub mod envelope;

pub use envelope::{
    AgentId, EnvelopeMeta, MessageEnvelope, Payload, PayloadType, DEFAULT_CONFIDENCE,
    DEFAULT_TTL_SECS,
};
