//! 会话存储
//!
//! 每个会话保存少量跨轮上下文（上次意图、上次地点、无障碍需求等），滑动过期：
//! 每次 get / update 都会刷新 last_seen，超过 ttl 未访问即过期。
//! 过期会话既在下次访问时惰性清除，也由后台清扫任务定期回收（spawn_session_sweeper）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 会话 ID
pub type SessionId = String;

/// 会话上下文：任意键值
pub type SessionContext = HashMap<String, Value>;

/// 单个会话
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub created_at: Instant,
    pub last_seen: Instant,
    pub context: SessionContext,
}

impl Session {
    pub fn new(initial: SessionContext) -> Self {
        let now = Instant::now();
        Self {
            id: format!("session_{}", uuid::Uuid::new_v4()),
            created_at: now,
            last_seen: now,
            context: initial,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// 距上次访问超过 ttl 即过期（恰好等于 ttl 仍存活）
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }

    fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }
}

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 新建会话，可带初始上下文
    async fn create(&self, initial: Option<SessionContext>) -> Session;

    /// 获取会话并刷新 last_seen；过期则顺带删除并返回 None
    async fn get(&self, id: &str) -> Option<Session>;

    /// 合并上下文并刷新 last_seen；不存在（或已过期）时不做任何事
    async fn update(&self, id: &str, partial: SessionContext) -> Option<Session>;

    /// 删除会话（幂等）
    async fn delete(&self, id: &str);

    /// 清理过期会话，返回清理数量
    async fn cleanup_expired(&self) -> usize;

    /// 当前保存的会话数（含尚未清理的过期会话）
    async fn active_count(&self) -> usize;
}

/// 内存会话存储：整个 map 由一把 RwLock 保护，get 也要刷新 last_seen，所以同样取写锁
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(60 * 60 * 24)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, initial: Option<SessionContext>) -> Session {
        let session = Session::new(initial.unwrap_or_default());
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, "Session created");
        session
    }

    async fn get(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired = sessions.get(id)?.is_expired(self.ttl, now);
        if expired {
            sessions.remove(id);
            tracing::debug!(session_id = %id, "Session expired on access");
            return None;
        }
        let session = sessions.get_mut(id)?;
        session.touch(now);
        Some(session.clone())
    }

    async fn update(&self, id: &str, partial: SessionContext) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if sessions.get(id)?.is_expired(self.ttl, now) {
            sessions.remove(id);
            return None;
        }
        let session = sessions.get_mut(id)?;
        session.context.extend(partial);
        session.touch(now);
        Some(session.clone())
    }

    async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.ttl, now));
        before - sessions.len()
    }

    async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// 清扫周期下限
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// 后台清扫：按 interval 周期调用 cleanup_expired，直到 token 被取消。
/// interval 低于 MIN_SWEEP_INTERVAL 时按下限处理。
pub fn spawn_session_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut cleanup_timer = tokio::time::interval(interval);
        // 第一次 tick 立即返回，跳过
        cleanup_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Session sweeper stopped");
                    break;
                }
                _ = cleanup_timer.tick() => {
                    let expired = store.cleanup_expired().await;
                    if expired > 0 {
                        tracing::info!("Cleaned up {} expired sessions", expired);
                    }
                }
            }
        }
    })
}
