//! 记忆层：按会话保存的跨轮上下文

pub mod session;

pub use session::{
    spawn_session_sweeper, MemorySessionStore, Session, SessionContext, SessionId, SessionStore,
};
