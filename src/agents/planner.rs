//! Planner：意图分类、地点识别、构建检索计划
//!
//! 纯规则实现：不调用模型，不编造坐标。输出 Plan 以及发往 Worker 的信封。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::intent::{classify_intent, Intent};
use crate::memory::Session;
use crate::protocol::{AgentId, MessageEnvelope, Payload, DEFAULT_TTL_SECS};
use crate::tools::KnownLocations;

/// 默认候选上限
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// 会话上下文键 -> 计划过滤条件键；值为「真」（非空、非 false、非 null）时才带入
const CONTEXT_FILTERS: &[(&str, &str)] = &[("accessibility_needs", "accessibility")];

/// 从文本里识别出的地点；不认识的地名三项皆为空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationDescriptor {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.lat.is_none() && self.lon.is_none()
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "city": self.city,
            "lat": self.lat,
            "lon": self.lon,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Normal,
}

impl Urgency {
    pub fn for_intent(intent: Intent) -> Self {
        if intent == Intent::Medical {
            Urgency::High
        } else {
            Urgency::Normal
        }
    }
}

/// 输出格式标签
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    ShortList,
}

/// 单次请求的检索计划
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub intent: Intent,
    pub query_terms: Vec<String>,
    pub location: LocationDescriptor,
    pub urgency: Urgency,
    pub filters: BTreeMap<String, Value>,
    pub max_results: usize,
    pub output_format: OutputFormat,
}

/// Planner 输出：计划本身与发往 Worker 的信封
#[derive(Debug, Clone)]
pub struct PlannerOutput {
    pub plan: Plan,
    pub message: MessageEnvelope,
}

pub struct Planner {
    locations: Arc<KnownLocations>,
    max_results: usize,
    output_format: OutputFormat,
    envelope_ttl: u64,
}

impl Planner {
    pub fn new(locations: Arc<KnownLocations>) -> Self {
        Self {
            locations,
            max_results: DEFAULT_MAX_RESULTS,
            output_format: OutputFormat::default(),
            envelope_ttl: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_envelope_ttl(mut self, ttl_secs: u64) -> Self {
        self.envelope_ttl = ttl_secs;
        self
    }

    pub fn classify_intent(&self, text: &str) -> Intent {
        classify_intent(text)
    }

    /// 只认已知地点表里的名称
    pub fn extract_location(&self, text: &str) -> LocationDescriptor {
        match self.locations.find_in(text) {
            Some(known) => LocationDescriptor {
                city: Some(known.name.clone()),
                lat: Some(known.lat),
                lon: Some(known.lon),
            },
            None => LocationDescriptor::default(),
        }
    }

    pub fn build_plan(&self, text: &str, session: Option<&Session>) -> PlannerOutput {
        let intent = self.classify_intent(text);
        let location = self.extract_location(text);
        let filters = session.map(context_filters).unwrap_or_default();

        let plan = Plan {
            plan_id: uuid::Uuid::new_v4().to_string(),
            intent,
            query_terms: vec![intent.as_str().to_string()],
            location,
            urgency: Urgency::for_intent(intent),
            filters,
            max_results: self.max_results,
            output_format: self.output_format,
        };

        let message = MessageEnvelope::new(
            AgentId::Planner,
            AgentId::Worker,
            session.map(|s| s.id.clone()),
            Payload::Plan(plan.clone()),
        )
        .with_ttl(self.envelope_ttl);

        PlannerOutput { plan, message }
    }
}

fn context_filters(session: &Session) -> BTreeMap<String, Value> {
    CONTEXT_FILTERS
        .iter()
        .filter_map(|(context_key, filter_key)| {
            session
                .context
                .get(*context_key)
                .filter(|v| is_truthy(v))
                .map(|v| (filter_key.to_string(), v.clone()))
        })
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
    }
}
