/// 广播分发器
/// 
/// 对主题订阅者快照逐个投递事件。单个连接失败不影响其他连接，
/// 失败的连接在整轮投递结束后一次性从注册表移除

use common::ServerEvent;
use tracing::{debug, error, warn};

use super::connection::Frame;
use super::registry::{SubscriptionRegistry, Topic};
use crate::metrics::RealtimeMetrics;

/// 一次分发的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct BroadcastDispatcher {
    registry: SubscriptionRegistry,
    metrics: RealtimeMetrics,
}

impl BroadcastDispatcher {
    pub fn new(registry: SubscriptionRegistry, metrics: RealtimeMetrics) -> Self {
        Self { registry, metrics }
    }

    /// 主题当前是否有订阅者
    pub async fn has_subscribers(&self, topic: &Topic) -> bool {
        self.registry.count(Some(topic)).await > 0
    }

    /// 向主题的当前订阅者分发事件
    /// 
    /// 不重试，不向调用方报告投递错误
    pub async fn dispatch(&self, topic: &Topic, event: &ServerEvent) -> DispatchOutcome {
        let subscribers = self.registry.subscribers_of(topic).await;
        if subscribers.is_empty() {
            debug!("主题 {} 没有订阅者，跳过 {}", topic, event.kind());
            return DispatchOutcome::default();
        }

        // 序列化一次，所有订阅者共享
        let frame = match event.to_json() {
            Ok(json) => Frame::text(json),
            Err(e) => {
                error!("序列化事件 {} 失败: {}", event.kind(), e);
                return DispatchOutcome::default();
            }
        };

        let mut outcome = DispatchOutcome::default();
        let mut failed = Vec::new();

        for connection in &subscribers {
            match connection.deliver(frame.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    debug!("投递 {} 失败: {}", event.kind(), e);
                    connection.begin_close();
                    failed.push(connection.id());
                }
            }
        }

        if !failed.is_empty() {
            let removed = self.registry.deregister_all(&failed).await;
            warn!(
                "主题 {} 投递失败 {} 个连接，已注销 {} 个",
                topic,
                failed.len(),
                removed
            );
        }
        outcome.failed = failed.len();

        self.metrics.events_delivered_total.inc_by(outcome.delivered as u64);
        self.metrics.delivery_failures_total.inc_by(outcome.failed as u64);
        debug!(
            "事件 {} 已分发到主题 {}: 成功 {}, 失败 {}",
            event.kind(),
            topic,
            outcome.delivered,
            outcome.failed
        );

        outcome
    }
}
