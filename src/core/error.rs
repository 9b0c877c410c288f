//! 错误类型
//!
//! 业务上的降级结果（地点无法解析、时间戳无效、地址缺失、空结果）不是错误，
//! 只有数据加载失败与 Agent 间消息不合法才走 ReliefError。

use thiserror::Error;

use crate::protocol::{AgentId, PayloadType};

/// 数据加载与 Agent 间消息传递中可能出现的错误
#[derive(Error, Debug)]
pub enum ReliefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    /// 数据文件内容不合法（如坐标不是数字）
    #[error("Invalid data in {source_name}: {detail}")]
    InvalidData { source_name: String, detail: String },

    /// 消息投递给了错误的 Agent
    #[error("Envelope {message_id} addressed to {found}, expected {expected}")]
    Misrouted {
        message_id: String,
        expected: AgentId,
        found: AgentId,
    },

    /// 接收方收到了不认识的 payload 类型
    #[error("Envelope {message_id} carries {found} payload, expected {expected}")]
    UnexpectedPayload {
        message_id: String,
        expected: PayloadType,
        found: PayloadType,
    },

    #[error("Envelope {message_id} expired ({age_secs}s old, ttl {ttl_secs}s)")]
    EnvelopeExpired {
        message_id: String,
        age_secs: i64,
        ttl_secs: u64,
    },

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ReliefError {
    fn from(e: config::ConfigError) -> Self {
        ReliefError::ConfigError(e.to_string())
    }
}
