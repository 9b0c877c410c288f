//! 管线集成测试：Planner → Worker → Evaluator → 回复渲染 → 会话回写

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use relief::agents::{Intent, MEDICAL_UNVERIFIED_ISSUE, NO_VERIFIED_ISSUE};
    use relief::config::AppConfig;
    use relief::core::{create_orchestrator, Orchestrator, APOLOGY};
    use relief::memory::{MemorySessionStore, SessionStore};
    use relief::tools::{InMemoryRepository, ResourceRecord, TrustedOrganizations};
    use serde_json::json;

    fn record(
        name: &str,
        address: &str,
        kind: &str,
        coords: (f64, f64),
        verified_by: Option<&str>,
    ) -> ResourceRecord {
        ResourceRecord {
            name: name.to_string(),
            address: address.to_string(),
            resource_type: kind.to_string(),
            lat: Some(coords.0),
            lon: Some(coords.1),
            verified_by: verified_by.map(str::to_string),
            last_updated: "2026-01-01".to_string(),
            notes: String::new(),
        }
    }

    fn orchestrator_with(records: Vec<ResourceRecord>, ttl_secs: u64) -> Orchestrator {
        Orchestrator::from_config(
            &AppConfig::default(),
            Arc::new(InMemoryRepository::new(records)),
            Arc::new(TrustedOrganizations::new(["Red Cross", "FEMA"])),
            Arc::new(MemorySessionStore::new(ttl_secs)),
        )
    }

    #[tokio::test]
    async fn test_shelter_in_springfield_lists_ranked_summaries() {
        let orch = orchestrator_with(
            vec![
                record("Soup Line", "9 Elm St", "food", (40.7128, -74.0060), None),
                record("Far Shelter", "50 Oak Ave", "shelter", (40.90, -74.20), Some("FEMA")),
                record("Near Shelter", "1 Main St", "shelter", (40.7130, -74.0061), Some("Red Cross")),
            ],
            600,
        );

        let reply = orch
            .handle_message("I need a shelter in Springfield", None)
            .await
            .unwrap();

        let plan = &reply.audit.plan;
        assert_eq!(plan.intent, Intent::Shelter);
        assert_eq!(plan.location.city.as_deref(), Some("Springfield"));
        assert!((plan.location.lat.unwrap() - 40.7128).abs() < 1e-9);
        assert!((plan.location.lon.unwrap() + 74.0060).abs() < 1e-9);

        assert!(reply.audit.evaluation.accepted);
        let lines: Vec<&str> = reply.response.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Near Shelter"));
        assert!(lines[1].starts_with("Far Shelter"));
        assert!(lines[2].starts_with("Soup Line"));
        assert_eq!(reply.audit.final_response, reply.response);
        assert_eq!(reply.audit.request, "I need a shelter in Springfield");
    }

    #[tokio::test]
    async fn test_no_usable_records_yields_apology() {
        let orch = orchestrator_with(
            vec![record("Ghost Shelter", "", "shelter", (40.71, -74.0), Some("Red Cross"))],
            600,
        );

        let reply = orch
            .handle_message("I need a shelter in Springfield", None)
            .await
            .unwrap();

        assert!(!reply.audit.evaluation.accepted);
        assert_eq!(reply.audit.evaluation.confidence, 0.2);
        assert_eq!(
            reply.response,
            format!("{APOLOGY} Issues: Missing address for Ghost Shelter, {NO_VERIFIED_ISSUE}")
        );
    }

    #[tokio::test]
    async fn test_unverified_medical_is_refused() {
        let orch = orchestrator_with(
            vec![record("Street Clinic", "3 Pine St", "medical", (40.71, -74.0), Some("Unknown Org"))],
            600,
        );

        let reply = orch.handle_message("nearest hospital please", None).await.unwrap();

        assert_eq!(reply.audit.plan.intent, Intent::Medical);
        assert!(reply.response.starts_with(APOLOGY));
        assert!(reply.response.contains(MEDICAL_UNVERIFIED_ISSUE));
    }

    #[tokio::test]
    async fn test_session_keeps_last_intent_and_location() {
        let orch = orchestrator_with(vec![], 600);

        let first = orch.handle_message("food in Springfield", None).await.unwrap();
        let second = orch
            .handle_message("any shelter?", Some(&first.session_id))
            .await
            .unwrap();
        assert_eq!(first.session_id, second.session_id);

        let session = orch.sessions().get(&second.session_id).await.unwrap();
        assert_eq!(session.get("last_intent"), Some(&json!("shelter")));
        assert_eq!(
            session.get("last_location"),
            Some(&json!({"city": null, "lat": null, "lon": null}))
        );
    }

    #[tokio::test]
    async fn test_unknown_session_id_starts_new_session() {
        let orch = orchestrator_with(vec![], 600);
        let reply = orch.handle_message("shelter", Some("session_missing")).await.unwrap();
        assert_ne!(reply.session_id, "session_missing");
        assert_eq!(orch.sessions().active_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_replaced() {
        let orch = orchestrator_with(vec![], 60);
        let first = orch.handle_message("shelter", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        let second = orch
            .handle_message("shelter", Some(&first.session_id))
            .await
            .unwrap();
        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn test_accessibility_context_becomes_plan_filter() {
        let orch = orchestrator_with(vec![], 600);
        let first = orch.handle_message("shelter", None).await.unwrap();

        let mut context = relief::memory::SessionContext::new();
        context.insert("accessibility_needs".into(), json!("wheelchair"));
        orch.remember(&first.session_id, context).await.unwrap();

        let reply = orch
            .handle_message("shelter", Some(&first.session_id))
            .await
            .unwrap();
        assert_eq!(
            reply.audit.plan.filters.get("accessibility"),
            Some(&json!("wheelchair"))
        );
    }

    #[tokio::test]
    async fn test_create_orchestrator_from_data_files() {
        let dir = tempfile::tempdir().unwrap();
        let shelters = dir.path().join("shelters.csv");
        let orgs = dir.path().join("organizations.json");
        std::fs::write(
            &shelters,
            "name,address,type,lat,lon,verified_by,last_updated,notes\n\
             Central Shelter,12 Main St,shelter,40.7128,-74.0060,Red Cross,2026-01-10,Pets allowed\n",
        )
        .unwrap();
        std::fs::write(&orgs, r#"["Red Cross"]"#).unwrap();

        let mut cfg = AppConfig::default();
        cfg.data.shelters_path = shelters;
        cfg.data.organizations_path = orgs;

        let orch = create_orchestrator(&cfg).unwrap();
        let reply = orch
            .handle_message("I need a shelter in Springfield", None)
            .await
            .unwrap();

        assert!(reply.audit.evaluation.accepted);
        assert!(reply.response.starts_with("Central Shelter — 12 Main St. Note: Pets allowed."));
        assert!(reply.response.contains("Verified by: Red Cross"));
    }

    #[test]
    fn test_create_orchestrator_missing_data_fails() {
        let mut cfg = AppConfig::default();
        cfg.data.shelters_path = "/no/such/shelters.csv".into();
        assert!(create_orchestrator(&cfg).is_err());
    }
}
