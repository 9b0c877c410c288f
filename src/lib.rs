//! Relief - 紧急救助请求处理管线
//!
//! 模块划分：
//! - **agents**: Planner（意图 / 地点 / 计划）、Worker（检索 / 排序 / 摘要）、Evaluator（验证 / 安全策略）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、请求编排、优雅关闭
//! - **integrations**: HTTP 接入（feature `web`）
//! - **memory**: 会话存储与后台清扫
//! - **observability**: tracing 初始化
//! - **protocol**: Agent 间信封协议
//! - **tools**: 资源库、可信机构名单、已知地点与距离计算

pub mod agents;
pub mod config;
pub mod core;
pub mod integrations;
pub mod memory;
pub mod observability;
pub mod protocol;
pub mod tools;
