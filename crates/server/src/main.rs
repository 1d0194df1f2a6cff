/// RoboFleet - Server
/// 
/// 机器人机队管理服务：REST API 与 WebSocket 实时状态推送

mod api;
mod app_state;
mod config;
mod db;
mod metrics;
mod services;
mod store;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    db::{ensure_schema, establish_connection},
    metrics::RealtimeMetrics,
    store::SeaOrmStore,
    ws::RealtimeHub,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = config::Config::from_env()?;

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level))
        )
        .init();

    info!("🚀 启动 {} ...", cfg.app_name);
    info!("✅ 配置加载成功");

    // 建立数据库连接 (SeaORM)
    let sea_db = establish_connection(&cfg.database_url).await?;
    info!("✅ SeaORM 数据库连接成功");
    ensure_schema(&sea_db).await?;

    // 初始化实时推送中枢
    let shutdown = CancellationToken::new();
    let metrics = RealtimeMetrics::new()?;
    let hub = RealtimeHub::new(metrics, shutdown.clone(), cfg.ws_writer_drain());
    info!("✅ 实时推送中枢初始化成功");

    // 创建应用状态
    let store = Arc::new(SeaOrmStore::new(sea_db));
    let app_state = AppState::new(store, hub.clone());

    let app = app_router(app_state)
        .layer(cors_layer(&cfg.cors_origins))
        .layer(TraceLayer::new_for_http());

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server_port));
    info!("🎯 服务器监听在 http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    // 已升级的 WebSocket 会话不随 HTTP 服务退出，需单独等待收尾
    if hub.drain_sessions().await {
        info!("所有实时会话已关闭");
    }

    info!("服务器已停止");
    Ok(())
}

/// 构建应用路由
fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ws/robots/:robot_id", get(ws::handle_robot_websocket))
        .route("/ws/fleet", get(ws::handle_fleet_websocket))
        .nest("/api/v1", api::api_routes())
        .with_state(state)
}

/// 设置CORS，未配置来源时不限制
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("忽略无效的 CORS 来源: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

/// 等待退出信号，随后通知所有会话关闭
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("监听 Ctrl+C 失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("收到退出信号，关闭所有实时连接");
    shutdown.cancel();
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "RoboFleet API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.realtime().metrics().render(),
    )
}
