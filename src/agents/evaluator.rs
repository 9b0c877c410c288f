//! Evaluator：验证与安全策略
//!
//! 按顺序执行：
//! 1. 丢弃无地址的候选并记录问题
//! 2. 未验证的候选标注 "unverified"，置信度每个扣 0.1（不低于 0）
//! 3. 剩余为空：accepted=false，置信度强制为 0.2，记录 "No verified resources found"
//! 4. 医疗类且未验证：accepted=false，记录 "Medical resource not verified"
//!
//! 本阶段不返回错误，也不重试。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::worker::{Candidate, CandidatesPayload};
use crate::core::ReliefError;
use crate::protocol::{AgentId, MessageEnvelope, Payload, DEFAULT_TTL_SECS};

pub const UNVERIFIED_NOTE: &str = "unverified";
pub const NO_VERIFIED_ISSUE: &str = "No verified resources found";
pub const MEDICAL_UNVERIFIED_ISSUE: &str = "Medical resource not verified";

/// 医疗安全检查看的是哪条资源的类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyScope {
    /// 每个候选检查自己的资源类型
    #[default]
    PerCandidate,
    /// 旧行为：所有候选都拿地址过滤循环最后看过的那条资源的类型来判断。
    /// 仅作为对照基线保留，可能漏报或误报。
    LastInspected,
}

/// 评估结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: String,
    pub accepted: bool,
    /// [0, 1]
    pub confidence: f64,
    pub issues: Vec<String>,
    pub final_list: Vec<Candidate>,
}

#[derive(Debug, Clone)]
pub struct EvaluatorOutput {
    pub evaluation: Evaluation,
    pub message: MessageEnvelope,
}

pub struct Evaluator {
    scope: SafetyScope,
    unverified_penalty: f64,
    empty_confidence: f64,
    envelope_ttl: u64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            scope: SafetyScope::default(),
            unverified_penalty: 0.1,
            empty_confidence: 0.2,
            envelope_ttl: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_scope(mut self, scope: SafetyScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_unverified_penalty(mut self, penalty: f64) -> Self {
        self.unverified_penalty = penalty;
        self
    }

    pub fn with_empty_confidence(mut self, confidence: f64) -> Self {
        self.empty_confidence = confidence;
        self
    }

    pub fn with_envelope_ttl(mut self, ttl_secs: u64) -> Self {
        self.envelope_ttl = ttl_secs;
        self
    }

    pub fn evaluate(&self, candidates: Vec<Candidate>) -> Evaluation {
        let mut issues = Vec::new();
        let mut accepted = true;
        let mut confidence: f64 = 1.0;
        let mut final_list = Vec::with_capacity(candidates.len());
        let mut last_inspected_type: Option<String> = None;

        for mut c in candidates {
            last_inspected_type = Some(c.resource.resource_type.clone());
            if !c.resource.has_address() {
                issues.push(format!("Missing address for {}", c.resource.name));
                continue;
            }
            if !c.is_verified {
                c.note = Some(UNVERIFIED_NOTE.to_string());
                confidence = (confidence - self.unverified_penalty).max(0.0);
            }
            final_list.push(c);
        }

        if final_list.is_empty() {
            accepted = false;
            confidence = self.empty_confidence;
            issues.push(NO_VERIFIED_ISSUE.to_string());
        }

        for c in &final_list {
            let checked_type = match self.scope {
                SafetyScope::PerCandidate => c.resource.resource_type.as_str(),
                SafetyScope::LastInspected => last_inspected_type
                    .as_deref()
                    .unwrap_or(c.resource.resource_type.as_str()),
            };
            if checked_type.eq_ignore_ascii_case("medical") && !c.is_verified {
                accepted = false;
                issues.push(MEDICAL_UNVERIFIED_ISSUE.to_string());
            }
        }

        Evaluation {
            evaluation_id: uuid::Uuid::new_v4().to_string(),
            accepted,
            confidence: confidence.clamp(0.0, 1.0),
            issues,
            final_list,
        }
    }

    pub fn evaluate_payload(
        &self,
        payload: CandidatesPayload,
        session_id: Option<String>,
    ) -> EvaluatorOutput {
        let evaluation = self.evaluate(payload.candidates);
        if !evaluation.issues.is_empty() {
            tracing::warn!(
                plan_id = %payload.plan_id,
                issues = ?evaluation.issues,
                "Evaluation raised issues"
            );
        }
        let message = MessageEnvelope::new(
            AgentId::Evaluator,
            AgentId::Ui,
            session_id,
            Payload::Evaluation(evaluation.clone()),
        )
        .with_confidence(evaluation.confidence)
        .with_ttl(self.envelope_ttl);

        EvaluatorOutput {
            evaluation,
            message,
        }
    }

    /// 信封入口：校验后评估
    pub fn handle(
        &self,
        envelope: MessageEnvelope,
        now: DateTime<Utc>,
    ) -> Result<EvaluatorOutput, ReliefError> {
        let session_id = envelope.session_id.clone();
        let payload = envelope.open_candidates(AgentId::Evaluator, now)?;
        Ok(self.evaluate_payload(payload, session_id))
    }
}
