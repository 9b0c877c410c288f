//! 核心编排层：错误类型、请求编排、优雅关闭

pub mod error;
pub mod orchestrator;
pub mod shutdown;

pub use error::ReliefError;
pub use orchestrator::{
    create_orchestrator, render_response, AgentReply, AuditRecord, Orchestrator, APOLOGY,
};
pub use shutdown::{ShutdownManager, ShutdownReason};
