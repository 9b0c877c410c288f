//! 编排器：单次请求的主控流程
//!
//! 解析会话（不存在或已过期则新建）→ Planner 构建计划 → Worker 检索并补充 → Evaluator 校验
//! → 渲染回复 → 把本轮意图与地点写回会话。各阶段串行执行，Agent 之间只通过信封传递 payload。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::agents::{Evaluation, Evaluator, Plan, Planner, Worker};
use crate::config::AppConfig;
use crate::core::ReliefError;
use crate::memory::{MemorySessionStore, Session, SessionContext, SessionStore};
use crate::protocol::AgentId;
use crate::tools::{
    CsvResourceRepository, KnownLocations, OrganizationRegistry, ResourceRepository,
    TrustedOrganizations,
};

/// 评估未通过时的固定致歉语
pub const APOLOGY: &str = "I'm sorry — I couldn't find verified resources nearby. Please contact local emergency services or try a different query.";

/// 单次请求的审计记录（只在内存里随回复返回）
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub request: String,
    pub plan: Plan,
    pub final_response: String,
    pub evaluation: Evaluation,
}

/// 返回给传输层的结果
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub response: String,
    pub session_id: String,
    pub audit: AuditRecord,
}

/// 渲染用户可见的回复：未通过时致歉并列出问题，否则按排序逐行输出摘要
pub fn render_response(evaluation: &Evaluation) -> String {
    if !evaluation.accepted {
        let mut text = APOLOGY.to_string();
        if !evaluation.issues.is_empty() {
            text.push_str(" Issues: ");
            text.push_str(&evaluation.issues.join(", "));
        }
        return text;
    }
    evaluation
        .final_list
        .iter()
        .map(|c| c.summary.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Orchestrator {
    planner: Planner,
    worker: Worker,
    evaluator: Evaluator,
    sessions: Arc<dyn SessionStore>,
}

impl Orchestrator {
    pub fn new(
        planner: Planner,
        worker: Worker,
        evaluator: Evaluator,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            planner,
            worker,
            evaluator,
            sessions,
        }
    }

    /// 按配置组装三个 Agent，资源库、机构名单、会话存储由调用方注入
    pub fn from_config(
        cfg: &AppConfig,
        repository: Arc<dyn ResourceRepository>,
        registry: Arc<dyn OrganizationRegistry>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let locations = Arc::new(KnownLocations::with_extra(cfg.locations.iter().cloned()));
        let ttl = cfg.envelope.ttl_secs;

        let planner = Planner::new(locations.clone())
            .with_max_results(cfg.planner.max_results)
            .with_output_format(cfg.planner.output_format)
            .with_envelope_ttl(ttl);
        let worker = Worker::new(repository, registry, locations)
            .with_recency_days(cfg.retriever.recency_days)
            .with_distance_sentinel(cfg.retriever.distance_sentinel_km)
            .with_envelope_ttl(ttl);
        let evaluator = Evaluator::new()
            .with_scope(cfg.evaluator.safety_scope)
            .with_unverified_penalty(cfg.evaluator.unverified_penalty)
            .with_empty_confidence(cfg.evaluator.empty_confidence)
            .with_envelope_ttl(ttl);

        Self::new(planner, worker, evaluator, sessions)
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// 取已有会话；没有 ID、ID 不存在或已过期时新建
    pub async fn resolve_session(&self, session_id: Option<&str>) -> Session {
        if let Some(id) = session_id {
            if let Some(session) = self.sessions.get(id).await {
                return session;
            }
            tracing::debug!(session_id = %id, "Unknown or expired session, creating a new one");
        }
        self.sessions.create(None).await
    }

    /// 合并客户端提供的上下文（如 accessibility_needs）
    pub async fn remember(&self, session_id: &str, context: SessionContext) -> Option<Session> {
        self.sessions.update(session_id, context).await
    }

    pub async fn handle_message(
        &self,
        user_input: &str,
        session_id: Option<&str>,
    ) -> Result<AgentReply, ReliefError> {
        let session = self.resolve_session(session_id).await;
        tracing::info!(session_id = %session.id, user_input, "request_received");

        let planned = self.planner.build_plan(user_input, Some(&session));
        tracing::debug!(plan = ?planned.plan, "plan_built");

        let worked = self.worker.handle(planned.message, Utc::now())?;
        tracing::debug!(
            plan_id = %worked.payload.plan_id,
            candidates = worked.payload.candidates.len(),
            "worker_executed"
        );

        let evaluated = self.evaluator.handle(worked.message, Utc::now())?;
        let evaluation = evaluated.message.open_evaluation(AgentId::Ui, Utc::now())?;
        tracing::info!(
            accepted = evaluation.accepted,
            confidence = evaluation.confidence,
            "evaluation_done"
        );

        let response = render_response(&evaluation);

        let plan = planned.plan;
        let mut turn = SessionContext::new();
        turn.insert("last_intent".to_string(), json!(plan.intent.as_str()));
        turn.insert("last_location".to_string(), plan.location.to_json());
        self.sessions.update(&session.id, turn).await;

        let audit = AuditRecord {
            request: user_input.to_string(),
            plan,
            final_response: response.clone(),
            evaluation,
        };
        tracing::debug!(audit = ?audit, "audit_entry");

        Ok(AgentReply {
            response,
            session_id: session.id,
            audit,
        })
    }
}

/// 从配置创建编排器：加载资源库与可信机构名单，使用内存会话存储
pub fn create_orchestrator(cfg: &AppConfig) -> Result<Orchestrator, ReliefError> {
    let repository = CsvResourceRepository::load(&cfg.data.shelters_path)?;
    let registry = TrustedOrganizations::load(&cfg.data.organizations_path)?;
    let sessions = MemorySessionStore::new(cfg.app.session_ttl_secs);

    Ok(Orchestrator::from_config(
        cfg,
        Arc::new(repository),
        Arc::new(registry),
        Arc::new(sessions),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Candidate, NO_VERIFIED_ISSUE};
    use crate::tools::ResourceRecord;

    fn accepted_with(summaries: &[&str]) -> Evaluation {
        Evaluation {
            evaluation_id: "e".to_string(),
            accepted: true,
            confidence: 1.0,
            issues: vec![],
            final_list: summaries
                .iter()
                .map(|s| {
                    let mut c = Candidate::scored(
                        ResourceRecord {
                            name: "n".into(),
                            address: "a".into(),
                            resource_type: "shelter".into(),
                            lat: None,
                            lon: None,
                            verified_by: None,
                            last_updated: String::new(),
                            notes: String::new(),
                        },
                        0,
                        None,
                    );
                    c.summary = s.to_string();
                    c
                })
                .collect(),
        }
    }

    #[test]
    fn test_render_accepted_joins_summaries_in_order() {
        let eval = accepted_with(&["first", "second", "third"]);
        assert_eq!(render_response(&eval), "first\nsecond\nthird");
    }

    #[test]
    fn test_render_rejected_lists_issues() {
        let eval = Evaluation {
            accepted: false,
            confidence: 0.2,
            issues: vec!["Missing address for X".into(), NO_VERIFIED_ISSUE.into()],
            ..Default::default()
        };
        assert_eq!(
            render_response(&eval),
            format!("{APOLOGY} Issues: Missing address for X, No verified resources found")
        );
    }

    #[test]
    fn test_render_rejected_without_issues_is_bare_apology() {
        let eval = Evaluation::default();
        assert_eq!(render_response(&eval), APOLOGY);
    }
}
