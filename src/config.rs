//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RELIEF__*` 覆盖（双下划线表示嵌套，如 `RELIEF__APP__SESSION_TTL_SECS=600`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::agents::{OutputFormat, SafetyScope};
use crate::tools::NamedLocation;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub retriever: RetrieverSection,
    #[serde(default)]
    pub evaluator: EvaluatorSection,
    #[serde(default)]
    pub envelope: EnvelopeSection,
    /// [[locations]] 段：额外的已知地点（name / lat / lon），Springfield 始终存在
    #[serde(default)]
    pub locations: Vec<NamedLocation>,
}

/// [app] 段：应用名、会话过期与清扫周期
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话滑动过期时间（秒），默认 24 小时
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// 后台清扫过期会话的周期（秒）
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    60 * 60 * 24
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// [data] 段：资源库与可信机构名单的文件位置
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_shelters_path")]
    pub shelters_path: PathBuf,
    #[serde(default = "default_organizations_path")]
    pub organizations_path: PathBuf,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            shelters_path: default_shelters_path(),
            organizations_path: default_organizations_path(),
        }
    }
}

fn default_shelters_path() -> PathBuf {
    PathBuf::from("data/shelters.csv")
}

fn default_organizations_path() -> PathBuf {
    PathBuf::from("data/organizations.json")
}

/// [planner] 段
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSection {
    /// 每次检索返回的候选上限
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            output_format: OutputFormat::default(),
        }
    }
}

fn default_max_results() -> usize {
    5
}

/// [retriever] 段：时效阈值与排序时未知距离的哨兵值
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieverSection {
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
    #[serde(default = "default_distance_sentinel_km")]
    pub distance_sentinel_km: f64,
}

impl Default for RetrieverSection {
    fn default() -> Self {
        Self {
            recency_days: default_recency_days(),
            distance_sentinel_km: default_distance_sentinel_km(),
        }
    }
}

fn default_recency_days() -> i64 {
    365
}

fn default_distance_sentinel_km() -> f64 {
    9999.0
}

/// [evaluator] 段：未验证扣分、空结果置信度、医疗安全检查范围
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorSection {
    #[serde(default = "default_unverified_penalty")]
    pub unverified_penalty: f64,
    #[serde(default = "default_empty_confidence")]
    pub empty_confidence: f64,
    #[serde(default)]
    pub safety_scope: SafetyScope,
}

impl Default for EvaluatorSection {
    fn default() -> Self {
        Self {
            unverified_penalty: default_unverified_penalty(),
            empty_confidence: default_empty_confidence(),
            safety_scope: SafetyScope::default(),
        }
    }
}

fn default_unverified_penalty() -> f64 {
    0.1
}

fn default_empty_confidence() -> f64 {
    0.2
}

/// [envelope] 段
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeSection {
    /// Agent 间消息的存活时间（秒），超时的消息被接收方拒绝
    #[serde(default = "default_envelope_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for EnvelopeSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_envelope_ttl_secs(),
        }
    }
}

fn default_envelope_ttl_secs() -> u64 {
    30
}

/// 从 config 目录加载配置，环境变量 RELIEF__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 RELIEF__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RELIEF")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let cfg: AppConfig = c.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

impl AppConfig {
    /// 拒绝会让后台任务或信封校验失效的取值
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.app.sweep_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "app.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.envelope.ttl_secs == 0 {
            return Err(config::ConfigError::Message(
                "envelope.ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
