/// 实时推送中枢
/// 
/// 聚合注册表、分发器、指标和关闭信号，克隆后共享同一份状态

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TrackedFuture;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::dispatcher::BroadcastDispatcher;
use super::registry::SubscriptionRegistry;
use crate::metrics::RealtimeMetrics;

#[derive(Clone)]
pub struct RealtimeHub {
    registry: SubscriptionRegistry,
    dispatcher: BroadcastDispatcher,
    metrics: RealtimeMetrics,
    shutdown: CancellationToken,
    writer_drain: Duration,
    /// 已升级的会话任务
    sessions: TaskTracker,
}

impl RealtimeHub {
    pub fn new(metrics: RealtimeMetrics, shutdown: CancellationToken, writer_drain: Duration) -> Self {
        let registry = SubscriptionRegistry::new();
        let dispatcher = BroadcastDispatcher::new(registry.clone(), metrics.clone());
        Self {
            registry,
            dispatcher,
            metrics,
            shutdown,
            writer_drain,
            sessions: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &BroadcastDispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &RealtimeMetrics {
        &self.metrics
    }

    /// 服务器关闭信号
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// 会话关闭时等待发送任务退出的时长
    pub fn writer_drain(&self) -> Duration {
        self.writer_drain
    }

    /// 跟踪一个会话任务，关闭时由 `drain_sessions` 等待
    pub fn track_session<F: Future>(&self, session: F) -> TrackedFuture<F> {
        self.sessions.track_future(session)
    }

    /// 停止接收新会话并等待已有会话收尾，返回是否全部按时结束
    ///
    /// 每个会话收尾时最多等待一个 `writer_drain`，这里留出两倍时长
    pub async fn drain_sessions(&self) -> bool {
        self.sessions.close();
        let remaining = self.sessions.len();
        if remaining > 0 {
            info!("等待 {} 个实时会话结束", remaining);
        }
        match tokio::time::timeout(self.writer_drain * 2, self.sessions.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!("仍有 {} 个实时会话未结束，放弃等待", self.sessions.len());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(writer_drain: Duration) -> RealtimeHub {
        RealtimeHub::new(
            RealtimeMetrics::new().unwrap(),
            CancellationToken::new(),
            writer_drain,
        )
    }

    #[tokio::test]
    async fn test_drain_waits_for_tracked_sessions() {
        let hub = hub(Duration::from_secs(1));
        let shutdown = hub.shutdown().clone();
        let session = hub.track_session(async move { shutdown.cancelled().await });
        let handle = tokio::spawn(session);

        hub.shutdown().cancel();
        assert!(hub.drain_sessions().await);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_gives_up_on_stuck_session() {
        let hub = hub(Duration::from_millis(20));
        tokio::spawn(hub.track_session(std::future::pending::<()>()));

        assert!(!hub.drain_sessions().await);
    }
}
