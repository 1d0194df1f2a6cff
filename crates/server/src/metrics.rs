/// 实时推送指标
/// 
/// 使用独立的 prometheus Registry，由 AppState 持有并注入，不使用全局注册表

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tracing::error;

#[derive(Clone)]
pub struct RealtimeMetrics {
    registry: Registry,
    /// 当前打开的连接数
    pub connections_active: IntGauge,
    /// 累计握手成功的连接数
    pub connections_total: IntCounter,
    /// 握手被拒绝的次数
    pub handshake_rejections_total: IntCounter,
    /// 成功投递的事件数
    pub events_delivered_total: IntCounter,
    /// 投递失败的次数
    pub delivery_failures_total: IntCounter,
}

impl RealtimeMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let connections_active =
            IntGauge::new("ws_connections_active", "Active WebSocket connections")?;
        let connections_total =
            IntCounter::new("ws_connections_total", "WebSocket connections opened")?;
        let handshake_rejections_total = IntCounter::new(
            "ws_handshake_rejections_total",
            "WebSocket handshakes rejected",
        )?;
        let events_delivered_total =
            IntCounter::new("ws_events_delivered_total", "Events delivered to subscribers")?;
        let delivery_failures_total =
            IntCounter::new("ws_delivery_failures_total", "Failed event deliveries")?;

        registry.register(Box::new(connections_active.clone()))?;
        registry.register(Box::new(connections_total.clone()))?;
        registry.register(Box::new(handshake_rejections_total.clone()))?;
        registry.register(Box::new(events_delivered_total.clone()))?;
        registry.register(Box::new(delivery_failures_total.clone()))?;

        Ok(Self {
            registry,
            connections_active,
            connections_total,
            handshake_rejections_total,
            events_delivered_total,
            delivery_failures_total,
        })
    }

    /// 渲染为 Prometheus 文本格式
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            error!("编码指标失败: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
