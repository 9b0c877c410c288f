//! Agent 间消息信封
//!
//! 统一的消息格式，Planner -> Worker -> Evaluator -> Ui 之间都用它传递 payload。
//! 构造不做任何校验；接收方通过 open_* 检查收件人、存活时间和 payload 类型后再使用。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{CandidatesPayload, Evaluation, Plan};
use crate::core::ReliefError;

/// 默认置信度
pub const DEFAULT_CONFIDENCE: f64 = 1.0;
/// 默认存活时间（秒）
pub const DEFAULT_TTL_SECS: u64 = 30;

/// 逻辑 Agent 名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Planner,
    Worker,
    Evaluator,
    /// 面向用户的一端（Orchestrator）
    Ui,
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentId::Planner => write!(f, "planner"),
            AgentId::Worker => write!(f, "worker"),
            AgentId::Evaluator => write!(f, "evaluator"),
            AgentId::Ui => write!(f, "ui"),
        }
    }
}

/// payload 类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    Plan,
    Candidates,
    Evaluation,
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadType::Plan => write!(f, "plan"),
            PayloadType::Candidates => write!(f, "candidates"),
            PayloadType::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// 按 payload_type 区分的 payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "payload_type", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    Plan(Plan),
    Candidates(CandidatesPayload),
    Evaluation(Evaluation),
}

impl Payload {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Plan(_) => PayloadType::Plan,
            Payload::Candidates(_) => PayloadType::Candidates,
            Payload::Evaluation(_) => PayloadType::Evaluation,
        }
    }
}

/// 元信息：置信度与存活时间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub confidence: f64,
    /// 秒
    pub ttl: u64,
}

impl Default for EnvelopeMeta {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            ttl: DEFAULT_TTL_SECS,
        }
    }
}

/// 消息信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message_id: String,
    pub from_agent: AgentId,
    pub to_agent: AgentId,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
    pub meta: EnvelopeMeta,
}

impl MessageEnvelope {
    pub fn new(
        from_agent: AgentId,
        to_agent: AgentId,
        session_id: Option<String>,
        payload: Payload,
    ) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            from_agent,
            to_agent,
            timestamp: Utc::now(),
            session_id,
            payload,
            meta: EnvelopeMeta::default(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.meta.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.meta.ttl = ttl_secs;
        self
    }

    /// 超过 ttl 即过期；ttl 当秒处理，按毫秒比较
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.timestamp).num_milliseconds();
        age_ms > (self.meta.ttl as i64).saturating_mul(1000)
    }

    /// 接收方入口：收件人、存活时间检查通过后交出 payload
    pub fn open(self, receiver: AgentId, now: DateTime<Utc>) -> Result<Payload, ReliefError> {
        if self.to_agent != receiver {
            return Err(ReliefError::Misrouted {
                message_id: self.message_id,
                expected: receiver,
                found: self.to_agent,
            });
        }
        if self.is_expired(now) {
            return Err(ReliefError::EnvelopeExpired {
                age_secs: (now - self.timestamp).num_seconds(),
                ttl_secs: self.meta.ttl,
                message_id: self.message_id,
            });
        }
        Ok(self.payload)
    }

    pub fn open_plan(self, receiver: AgentId, now: DateTime<Utc>) -> Result<Plan, ReliefError> {
        let message_id = self.message_id.clone();
        match self.open(receiver, now)? {
            Payload::Plan(plan) => Ok(plan),
            other => Err(unexpected(message_id, PayloadType::Plan, &other)),
        }
    }

    pub fn open_candidates(
        self,
        receiver: AgentId,
        now: DateTime<Utc>,
    ) -> Result<CandidatesPayload, ReliefError> {
        let message_id = self.message_id.clone();
        match self.open(receiver, now)? {
            Payload::Candidates(candidates) => Ok(candidates),
            other => Err(unexpected(message_id, PayloadType::Candidates, &other)),
        }
    }

    pub fn open_evaluation(
        self,
        receiver: AgentId,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, ReliefError> {
        let message_id = self.message_id.clone();
        match self.open(receiver, now)? {
            Payload::Evaluation(evaluation) => Ok(evaluation),
            other => Err(unexpected(message_id, PayloadType::Evaluation, &other)),
        }
    }
}

fn unexpected(message_id: String, expected: PayloadType, found: &Payload) -> ReliefError {
    ReliefError::UnexpectedPayload {
        message_id,
        expected,
        found: found.payload_type(),
    }
}
