//! HTTP 接入
//!
//! `POST /query`：请求体 `{text, session_id?, context?}`，返回 `{response, session_id}`。
//! 携带 context 时先合并进会话（如 `{"accessibility_needs": "wheelchair"}`），再处理本轮请求。
//! 管线内部错误（信封投递错误等）一律映射为 500。

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::core::Orchestrator;
use crate::memory::SessionContext;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<SessionContext>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub session_id: String,
}

/// 创建 HTTP 路由
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/health", get(|| async { "OK" }))
        .with_state(orchestrator)
}

/// POST /query
async fn query(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let mut session_id = req.session_id;
    if let Some(context) = req.context.filter(|c| !c.is_empty()) {
        let session = orchestrator.resolve_session(session_id.as_deref()).await;
        orchestrator.remember(&session.id, context).await;
        session_id = Some(session.id);
    }

    match orchestrator
        .handle_message(&req.text, session_id.as_deref())
        .await
    {
        Ok(reply) => Ok(Json(QueryResponse {
            response: reply.response,
            session_id: reply.session_id,
        })),
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::memory::{MemorySessionStore, SessionStore};
    use crate::tools::{InMemoryRepository, ResourceRecord, TrustedOrganizations};

    fn orchestrator() -> Arc<Orchestrator> {
        let repo = InMemoryRepository::new(vec![ResourceRecord {
            name: "Central Shelter".to_string(),
            address: "1 Main St".to_string(),
            resource_type: "shelter".to_string(),
            lat: Some(40.71),
            lon: Some(-74.0),
            verified_by: Some("Red Cross".to_string()),
            last_updated: "2026-01-01".to_string(),
            notes: String::new(),
        }]);
        Arc::new(Orchestrator::from_config(
            &AppConfig::default(),
            Arc::new(repo),
            Arc::new(TrustedOrganizations::new(["Red Cross"])),
            Arc::new(MemorySessionStore::new(600)),
        ))
    }

    async fn post_query(app: Router, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/query")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_query_returns_response_and_session() {
        let app = create_router(orchestrator());
        let (status, body) =
            post_query(app, serde_json::json!({"text": "shelter in Springfield"})).await;

        assert_eq!(status, StatusCode::OK);
        let parsed: QueryResponse = serde_json::from_slice(&body).unwrap();
        assert!(parsed.response.starts_with("Central Shelter"));
        assert!(parsed.session_id.starts_with("session_"));
    }

    #[tokio::test]
    async fn test_context_is_stored_in_session() {
        let orch = orchestrator();
        let app = create_router(orch.clone());
        let (status, body) = post_query(
            app,
            serde_json::json!({
                "text": "shelter",
                "context": {"accessibility_needs": "wheelchair"}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let parsed: QueryResponse = serde_json::from_slice(&body).unwrap();
        let session = orch.sessions().get(&parsed.session_id).await.unwrap();
        assert_eq!(
            session.get("accessibility_needs"),
            Some(&serde_json::json!("wheelchair"))
        );
        assert_eq!(session.get("last_intent"), Some(&serde_json::json!("shelter")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = create_router(orchestrator());
        let (status, _) = post_query(app, serde_json::json!({"session_id": "x"})).await;
        assert!(status.is_client_error());
    }
}
