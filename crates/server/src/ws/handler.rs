/// WebSocket 连接处理器
/// 
/// 机器人订阅与机队订阅的升级入口

use axum::extract::ws::WebSocket;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::StreamExt;
use tracing::debug;
use uuid::Uuid;

use super::registry::Topic;
use super::session::run_session;
use crate::app_state::AppState;

/// 订阅单个机器人的状态更新
///
/// GET /ws/robots/:robot_id
pub async fn handle_robot_websocket(
    ws: WebSocketUpgrade,
    Path(robot_id): Path<Uuid>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let hub = state.realtime();
        hub.track_session(handle_subscription(socket, Topic::Robot(robot_id), state))
    })
}

/// 订阅机队汇总
///
/// GET /ws/fleet
pub async fn handle_fleet_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let hub = state.realtime();
        hub.track_session(handle_subscription(socket, Topic::Fleet, state))
    })
}

async fn handle_subscription(socket: WebSocket, topic: Topic, state: AppState) {
    debug!("新的订阅连接: {}", topic);

    let (sink, stream) = socket.split();
    let end = run_session(state.realtime(), state.reader(), topic, sink, stream).await;

    debug!("订阅连接结束: {} {:?}", topic, end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::robot::RobotStatusUpdateDto;
    use crate::metrics::RealtimeMetrics;
    use crate::services::RobotService;
    use crate::store::memory::MemoryStore;
    use crate::ws::RealtimeHub;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use common::{close_code, RobotStatus};
    use futures_util::SinkExt;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    struct TestServer {
        addr: SocketAddr,
        state: AppState,
        store: Arc<MemoryStore>,
        shutdown: CancellationToken,
    }

    async fn spawn_server() -> TestServer {
        let store = Arc::new(MemoryStore::new());
        let shutdown = CancellationToken::new();
        let hub = RealtimeHub::new(
            RealtimeMetrics::new().unwrap(),
            shutdown.clone(),
            Duration::from_secs(1),
        );
        let state = AppState::new(store.clone(), hub);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::app_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            state,
            store,
            shutdown,
        }
    }

    async fn connect(addr: SocketAddr, path: &str) -> Client {
        let (client, _) = connect_async(format!("ws://{}{}", addr, path)).await.unwrap();
        client
    }

    async fn next_message(client: &mut Client) -> WsMessage {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("read failed");
            if !matches!(msg, WsMessage::Ping(_) | WsMessage::Pong(_)) {
                return msg;
            }
        }
    }

    async fn next_json(client: &mut Client) -> serde_json::Value {
        match next_message(client).await {
            WsMessage::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    async fn wait_for_connections(state: &AppState, expected: usize) {
        for _ in 0..100 {
            if state.realtime().registry().count(None).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached {} connections", expected);
    }

    #[tokio::test]
    async fn test_unknown_robot_is_closed_with_4004() {
        let server = spawn_server().await;
        let mut client = connect(server.addr, &format!("/ws/robots/{}", Uuid::new_v4())).await;

        match next_message(&mut client).await {
            WsMessage::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), close_code::ROBOT_NOT_FOUND);
                assert_eq!(frame.reason, "Robot not found");
            }
            other => panic!("expected close frame, got {:?}", other),
        }

        assert_eq!(server.state.realtime().registry().count(None).await, 0);
        assert_eq!(server.state.realtime().registry().topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_greeting_reports_subscriber_count() {
        let server = spawn_server().await;
        let robot = server.store.seed("Atlas", "SN-001").await;
        let path = format!("/ws/robots/{}", robot.id);

        let mut first = connect(server.addr, &path).await;
        let greeting = next_json(&mut first).await;
        assert_eq!(greeting["event"], "connected");
        assert_eq!(greeting["robot_id"], robot.id.to_string());
        assert_eq!(greeting["robot"]["name"], "Atlas");
        assert_eq!(greeting["subscribers"], 1);

        let mut second = connect(server.addr, &path).await;
        assert_eq!(next_json(&mut second).await["subscribers"], 2);
    }

    #[tokio::test]
    async fn test_sequential_updates_arrive_in_order_at_every_subscriber() {
        let server = spawn_server().await;
        let robot = server.store.seed("Atlas", "SN-001").await;
        let path = format!("/ws/robots/{}", robot.id);

        let mut a = connect(server.addr, &path).await;
        let mut b = connect(server.addr, &path).await;
        next_json(&mut a).await;
        next_json(&mut b).await;

        let service = RobotService::new(server.state.clone());
        for status in [RobotStatus::Active, RobotStatus::Charging] {
            service
                .update_robot_status(
                    robot.id,
                    RobotStatusUpdateDto {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        for client in [&mut a, &mut b] {
            let first = next_json(client).await;
            let second = next_json(client).await;
            assert_eq!(first["event"], "status_update");
            assert_eq!(first["robot"]["status"], "active");
            assert_eq!(second["robot"]["status"], "charging");
        }
    }

    #[tokio::test]
    async fn test_rest_status_patch_is_pushed_to_subscribers() {
        let server = spawn_server().await;
        let robot = server.store.seed("Atlas", "SN-001").await;
        let mut client = connect(server.addr, &format!("/ws/robots/{}", robot.id)).await;
        let mut fleet = connect(server.addr, "/ws/fleet").await;
        next_json(&mut client).await;
        let greeting = next_json(&mut fleet).await;
        assert_eq!(greeting["fleet_size"], 1);

        let response = crate::app_router(server.state.clone())
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/robots/{}/status", robot.id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"charging","battery_level":42.0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let event = next_json(&mut client).await;
        assert_eq!(event["event"], "status_update");
        assert_eq!(event["robot"]["status"], "charging");
        assert_eq!(event["robot"]["battery_level"], 42.0);

        let summary = next_json(&mut fleet).await;
        assert_eq!(summary["event"], "fleet_update");
        assert_eq!(summary["robots"][0]["battery_level"], 42.0);
    }

    #[tokio::test]
    async fn test_invalid_status_patch_is_rejected_without_push() {
        let server = spawn_server().await;
        let robot = server.store.seed("Atlas", "SN-001").await;
        let mut client = connect(server.addr, &format!("/ws/robots/{}", robot.id)).await;
        next_json(&mut client).await;

        let response = crate::app_router(server.state.clone())
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/robots/{}/status", robot.id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"battery_level":150.0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let quiet = tokio::time::timeout(Duration::from_millis(100), client.next()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let server = spawn_server().await;
        let mut client = connect(server.addr, "/ws/fleet").await;
        next_json(&mut client).await;

        client
            .send(WsMessage::Text(r#"{"type":"ping"}"#.to_string()))
            .await
            .unwrap();

        assert_eq!(next_json(&mut client).await, serde_json::json!({"type": "pong"}));
    }

    #[tokio::test]
    async fn test_client_disconnect_releases_subscription() {
        let server = spawn_server().await;
        let mut client = connect(server.addr, "/ws/fleet").await;
        next_json(&mut client).await;
        wait_for_connections(&server.state, 1).await;

        client.close(None).await.unwrap();
        wait_for_connections(&server.state, 0).await;
        assert_eq!(server.state.realtime().registry().topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_with_going_away() {
        let server = spawn_server().await;
        let mut client = connect(server.addr, "/ws/fleet").await;
        next_json(&mut client).await;

        server.shutdown.cancel();

        match next_message(&mut client).await {
            WsMessage::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), close_code::GOING_AWAY)
            }
            other => panic!("expected close frame, got {:?}", other),
        }

        // 升级后的会话在退出前完成收尾
        assert!(server.state.realtime().drain_sessions().await);
        assert_eq!(server.state.realtime().registry().count(None).await, 0);
        assert_eq!(server.state.realtime().metrics().connections_active.get(), 0);
    }
}
