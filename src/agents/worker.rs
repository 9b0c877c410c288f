//! Worker（检索）：地理编码、查询资源库、排序、补充验证/时效信息并生成摘要
//!
//! 地理编码、时间戳解析都写成「有序规则表」：依次尝试，首个命中即返回，全部落空取默认值。

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::planner::{LocationDescriptor, Plan};
use crate::core::ReliefError;
use crate::protocol::{AgentId, MessageEnvelope, Payload, DEFAULT_TTL_SECS};
use crate::tools::{
    haversine_km, Coordinates, KnownLocations, OrganizationRegistry, ResourceRecord,
    ResourceRepository,
};

/// 默认时效阈值（天）
pub const RECENCY_THRESHOLD_DAYS: i64 = 365;
/// 排序时无距离的候选按此值处理（排在最后）
pub const DISTANCE_SENTINEL_KM: f64 = 9999.0;

/// 地理编码结果；无法解析时三项皆为空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl ResolvedLocation {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

/// 一条资源记录的打分视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub resource: ResourceRecord,
    /// 类别分 + 验证加分
    pub score: u32,
    pub distance_km: Option<f64>,
    /// 声明的验证机构在可信名单内
    pub is_verified: bool,
    /// last_updated 在阈值天数内
    pub recent: bool,
    pub summary: String,
    /// Evaluator 的标注（如 "unverified"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Candidate {
    /// search 阶段只有分数和距离，验证、时效、摘要由 enrich 补齐
    pub fn scored(resource: ResourceRecord, score: u32, distance_km: Option<f64>) -> Self {
        Self {
            resource,
            score,
            distance_km,
            is_verified: false,
            recent: false,
            summary: String::new(),
            note: None,
        }
    }

    fn declares_verifier(&self) -> bool {
        self.resource.verified_by.is_some()
    }
}

/// 发往 Evaluator 的 payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatesPayload {
    pub plan_id: String,
    pub candidates: Vec<Candidate>,
    pub query_location: ResolvedLocation,
}

#[derive(Debug, Clone)]
pub struct WorkerOutput {
    pub payload: CandidatesPayload,
    pub message: MessageEnvelope,
}

type GeocodeRule = fn(&LocationDescriptor, &KnownLocations) -> Option<ResolvedLocation>;

/// 地理编码规则：已有坐标直接透传，否则按城市名查表
const GEOCODE_RULES: &[(&str, GeocodeRule)] = &[
    ("explicit_coordinates", explicit_coordinates),
    ("known_city", known_city),
];

fn explicit_coordinates(loc: &LocationDescriptor, _: &KnownLocations) -> Option<ResolvedLocation> {
    match (loc.lat, loc.lon) {
        (Some(lat), Some(lon)) => Some(ResolvedLocation {
            city: loc.city.clone(),
            lat: Some(lat),
            lon: Some(lon),
        }),
        _ => None,
    }
}

fn known_city(loc: &LocationDescriptor, table: &KnownLocations) -> Option<ResolvedLocation> {
    let known = table.lookup(loc.city.as_deref()?)?;
    Some(ResolvedLocation {
        city: Some(known.name.clone()),
        lat: Some(known.lat),
        lon: Some(known.lon),
    })
}

type TimestampRule = fn(&str) -> Option<DateTime<Utc>>;

/// 时间戳解析规则：RFC 3339 > 无时区日期时间（按 UTC）> 纯日期
const TIMESTAMP_RULES: &[TimestampRule] = &[parse_rfc3339, parse_naive_datetime, parse_date];

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_naive_datetime(raw: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|t| t.and_utc())
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// 时间戳在 now 之前不超过 threshold_days 天即为「新」；解析失败一律返回 false
pub fn check_recency(last_updated: &str, now: DateTime<Utc>, threshold_days: i64) -> bool {
    let raw = last_updated.trim();
    if raw.is_empty() {
        return false;
    }
    TIMESTAMP_RULES
        .iter()
        .find_map(|rule| rule(raw))
        .map(|t| (now - t).num_days() <= threshold_days)
        .unwrap_or(false)
}

/// 确定性摘要：`{name} — {address}. [Note: {notes}. ]Verified by: {org|none}. Last updated: {date}. [(~{d} km)]`
///
/// `{date}` 原样输出 last_updated，空值或无法解析的值不做替换。
pub fn summarize(candidate: &Candidate) -> String {
    let r = &candidate.resource;
    let name = if r.name.is_empty() { "Resource" } else { r.name.as_str() };
    let address = if r.has_address() {
        r.address.as_str()
    } else {
        "Address not provided"
    };
    let mut s = format!("{name} — {address}.");
    if !r.notes.is_empty() {
        s.push_str(&format!(" Note: {}.", r.notes));
    }
    s.push_str(&format!(
        " Verified by: {}. Last updated: {}.",
        r.verified_by.as_deref().unwrap_or("none"),
        r.last_updated
    ));
    if let Some(d) = candidate.distance_km {
        s.push_str(&format!(" (~{d:.1} km)"));
    }
    s
}

/// 检索 Worker：持有资源库、可信机构名单、已知地点表
pub struct Worker {
    repository: Arc<dyn ResourceRepository>,
    registry: Arc<dyn OrganizationRegistry>,
    locations: Arc<KnownLocations>,
    recency_days: i64,
    distance_sentinel_km: f64,
    envelope_ttl: u64,
}

impl Worker {
    pub fn new(
        repository: Arc<dyn ResourceRepository>,
        registry: Arc<dyn OrganizationRegistry>,
        locations: Arc<KnownLocations>,
    ) -> Self {
        Self {
            repository,
            registry,
            locations,
            recency_days: RECENCY_THRESHOLD_DAYS,
            distance_sentinel_km: DISTANCE_SENTINEL_KM,
            envelope_ttl: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_recency_days(mut self, days: i64) -> Self {
        self.recency_days = days;
        self
    }

    pub fn with_distance_sentinel(mut self, km: f64) -> Self {
        self.distance_sentinel_km = km;
        self
    }

    pub fn with_envelope_ttl(mut self, ttl_secs: u64) -> Self {
        self.envelope_ttl = ttl_secs;
        self
    }

    pub fn geocode(&self, descriptor: &LocationDescriptor) -> ResolvedLocation {
        for (name, rule) in GEOCODE_RULES {
            if let Some(resolved) = rule(descriptor, &self.locations) {
                tracing::debug!(rule = name, city = ?resolved.city, "Location resolved");
                return resolved;
            }
        }
        tracing::debug!(city = ?descriptor.city, "Location unresolved");
        ResolvedLocation::unresolved()
    }

    /// 打分并排序：先按是否声明验证机构，再按总分降序，最后按距离升序（无距离排最后）
    pub fn search(
        &self,
        query_terms: &[String],
        coords: Option<Coordinates>,
        max_results: usize,
        filters: &BTreeMap<String, Value>,
    ) -> Vec<Candidate> {
        if !filters.is_empty() {
            // 资源记录没有结构化属性可供过滤，只记录下来
            tracing::debug!(?filters, "Filters carried but not applied to ranking");
        }

        let terms: Vec<String> = query_terms.iter().map(|t| t.to_lowercase()).collect();

        let mut candidates: Vec<Candidate> = self
            .repository
            .list_all()
            .into_iter()
            .map(|record| {
                let kind = record.resource_type.to_lowercase();
                let category = 2 * terms.iter().filter(|t| kind.contains(t.as_str())).count() as u32;
                let bonus = u32::from(record.verified_by.is_some());
                let distance = coords
                    .zip(record.coordinates())
                    .map(|(q, r)| haversine_km(q, r));
                Candidate::scored(record, category + bonus, distance)
            })
            .collect();

        let sentinel = self.distance_sentinel_km;
        candidates.sort_by(|a, b| rank_order(a, b, sentinel));
        candidates.truncate(max_results);
        candidates
    }

    /// 补齐验证状态、时效与摘要
    pub fn enrich(&self, mut candidate: Candidate, now: DateTime<Utc>) -> Candidate {
        candidate.is_verified = candidate
            .resource
            .verified_by
            .as_deref()
            .map(|org| self.registry.is_trusted(org))
            .unwrap_or(false);
        candidate.recent = check_recency(&candidate.resource.last_updated, now, self.recency_days);
        candidate.summary = summarize(&candidate);
        candidate
    }

    pub fn execute_plan(
        &self,
        plan: &Plan,
        session_id: Option<String>,
        now: DateTime<Utc>,
    ) -> WorkerOutput {
        let query_location = self.geocode(&plan.location);
        let candidates = self
            .search(
                &plan.query_terms,
                query_location.coordinates(),
                plan.max_results,
                &plan.filters,
            )
            .into_iter()
            .map(|c| self.enrich(c, now))
            .collect();

        let payload = CandidatesPayload {
            plan_id: plan.plan_id.clone(),
            candidates,
            query_location,
        };
        let message = MessageEnvelope::new(
            AgentId::Worker,
            AgentId::Evaluator,
            session_id,
            Payload::Candidates(payload.clone()),
        )
        .with_ttl(self.envelope_ttl);

        WorkerOutput { payload, message }
    }

    /// 信封入口：校验收件人、存活时间与 payload 类型后执行计划
    pub fn handle(
        &self,
        envelope: MessageEnvelope,
        now: DateTime<Utc>,
    ) -> Result<WorkerOutput, ReliefError> {
        let session_id = envelope.session_id.clone();
        let plan = envelope.open_plan(AgentId::Worker, now)?;
        Ok(self.execute_plan(&plan, session_id, now))
    }
}

fn rank_order(a: &Candidate, b: &Candidate, sentinel: f64) -> Ordering {
    b.declares_verifier()
        .cmp(&a.declares_verifier())
        .then_with(|| b.score.cmp(&a.score))
        .then_with(|| {
            let da = a.distance_km.unwrap_or(sentinel);
            let db = b.distance_km.unwrap_or(sentinel);
            da.total_cmp(&db)
        })
}
