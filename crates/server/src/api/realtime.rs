/// 实时推送状态接口

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::ws::Topic;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub robot_id: Option<Uuid>,
}

/// 订阅统计
#[derive(Debug, Serialize)]
pub struct RealtimeStatsResponse {
    /// 当前活跃连接数（按连接去重）
    pub connections: usize,
    /// 有订阅者的主题数
    pub topics: usize,
    pub fleet_subscribers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot_subscribers: Option<usize>,
}

pub fn realtime_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

/// 获取订阅统计
///
/// GET /api/v1/realtime/stats?robot_id=xxx
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<RealtimeStatsResponse> {
    let hub = state.realtime();
    let registry = hub.registry();

    let robot_subscribers = match query.robot_id {
        Some(id) => Some(registry.count(Some(&Topic::Robot(id))).await),
        None => None,
    };

    Json(RealtimeStatsResponse {
        connections: registry.count(None).await,
        topics: registry.topic_count().await,
        fleet_subscribers: registry.count(Some(&Topic::Fleet)).await,
        robot_subscribers,
    })
}
