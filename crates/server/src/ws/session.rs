/// 连接会话
/// 
/// 状态流转: Handshaking -> Open -> Closing -> Closed。
/// 每个连接一个会话任务，独占入站读取循环；出站写入交给独立的发送任务。
/// 读取循环挂起等待入站帧时不持有任何注册表锁

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use common::{close_code, ClientMessage, ControlMessage, RobotSnapshot, ServerEvent};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::connection::{Connection, Frame};
use super::hub::RealtimeHub;
use super::registry::Topic;
use crate::store::RobotReader;

/// 握手错误
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("机器人不存在: {0}")]
    RobotNotFound(Uuid),

    #[error("读取数据失败: {0}")]
    Store(#[from] common::Error),

    #[error("初始快照未能排入发送队列")]
    Aborted,
}

impl HandshakeError {
    pub fn close_code(&self) -> u16 {
        match self {
            Self::RobotNotFound(_) => close_code::ROBOT_NOT_FOUND,
            Self::Store(_) | Self::Aborted => close_code::INTERNAL_ERROR,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::RobotNotFound(_) => "Robot not found",
            Self::Store(_) | Self::Aborted => "Internal error",
        }
    }
}

/// 会话关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 客户端关闭
    ClientClosed,
    /// 读取入站帧出错
    TransportError,
    /// 写入失败或分发器判定投递失败
    DeliveryFailed,
    /// 服务器关闭
    Shutdown,
}

impl CloseReason {
    fn close_code(&self) -> u16 {
        match self {
            Self::Shutdown => close_code::GOING_AWAY,
            _ => close_code::NORMAL,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::Shutdown => "Server shutting down",
            _ => "Connection closed",
        }
    }
}

/// 会话结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// 握手被拒绝，从未进入 Open
    Rejected(u16),
    Closed(CloseReason),
}

/// 握手时读取的初始数据
#[derive(Debug, Clone)]
enum Greeting {
    Robot(RobotSnapshot),
    Fleet(Vec<RobotSnapshot>),
}

impl Greeting {
    async fn load(reader: &dyn RobotReader, topic: Topic) -> Result<Self, HandshakeError> {
        match topic {
            Topic::Robot(robot_id) => reader
                .fetch_robot(robot_id)
                .await?
                .map(Greeting::Robot)
                .ok_or(HandshakeError::RobotNotFound(robot_id)),
            Topic::Fleet => Ok(Greeting::Fleet(reader.list_robots().await?)),
        }
    }

    fn connected_event(&self, subscribers: usize) -> ServerEvent {
        match self {
            Greeting::Robot(robot) => ServerEvent::RobotConnected {
                robot_id: robot.id,
                robot: robot.clone(),
                subscribers,
            },
            Greeting::Fleet(robots) => ServerEvent::FleetConnected {
                fleet_size: robots.len(),
                robots: robots.iter().map(RobotSnapshot::summary).collect(),
                subscribers,
            },
        }
    }

    /// 与初始快照内容不同时推送的补发事件
    fn refresh_event(&self) -> ServerEvent {
        match self {
            Greeting::Robot(robot) => ServerEvent::status_update(robot.clone()),
            Greeting::Fleet(robots) => ServerEvent::fleet_update(robots),
        }
    }

    /// 客户端看到的内容是否一致
    fn same_view(&self, other: &Greeting) -> bool {
        match (self, other) {
            (Greeting::Robot(a), Greeting::Robot(b)) => a == b,
            (Greeting::Fleet(a), Greeting::Fleet(b)) => a
                .iter()
                .map(RobotSnapshot::summary)
                .eq(b.iter().map(RobotSnapshot::summary)),
            _ => false,
        }
    }
}

/// 运行一个连接会话直到关闭
pub async fn run_session<W, R, E>(
    hub: RealtimeHub,
    reader: Arc<dyn RobotReader>,
    topic: Topic,
    mut sink: W,
    mut stream: R,
) -> SessionEnd
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: Display,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = Arc::new(Connection::new(tx));
    debug!("连接 {} 握手中: {}", connection.id(), topic);

    let greeting = match Greeting::load(reader.as_ref(), topic).await {
        Ok(greeting) => greeting,
        Err(e) => return reject(&hub, &connection, &mut sink, topic, e).await,
    };

    // 注册与初始快照入队在同一临界区内完成，广播不会抢在初始快照之前
    let registered = hub
        .registry()
        .register_then(&connection, topic, |subscribers| {
            match greeting.connected_event(subscribers).to_json() {
                Ok(json) => connection
                    .deliver(Frame::text(json))
                    .ok()
                    .map(|_| (subscribers, connection.delivered())),
                Err(e) => {
                    warn!("序列化初始快照失败: {}", e);
                    None
                }
            }
        })
        .await;

    let Some(Some((subscribers, seen))) = registered else {
        return reject(&hub, &connection, &mut sink, topic, HandshakeError::Aborted).await;
    };

    // 读取快照到完成注册之间提交的变更不会广播到本连接，注册后重新读取一次补发
    refresh_after_register(reader.as_ref(), &connection, topic, &greeting, seen).await;

    connection.mark_open();
    hub.metrics().connections_total.inc();
    hub.metrics().connections_active.inc();
    info!(
        "连接 {} 已订阅 {} (当前订阅数: {})",
        connection.id(),
        topic,
        subscribers
    );

    let writer = tokio::spawn(write_frames(sink, rx, connection.closing_token()));

    let reason = loop {
        tokio::select! {
            _ = hub.shutdown().cancelled() => break CloseReason::Shutdown,
            _ = connection.closing() => break CloseReason::DeliveryFailed,
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => handle_text(&connection, &text),
                Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                Some(Ok(_)) => {
                    debug!("连接 {} 收到非文本帧，忽略", connection.id());
                }
                Some(Err(e)) => {
                    debug!("连接 {} 读取失败: {}", connection.id(), e);
                    break CloseReason::TransportError;
                }
            },
        }
    };

    connection.begin_close();
    connection.send_close(reason.close_code(), reason.reason());
    release(&hub, &connection, true).await;

    // 等待发送任务刷出关闭帧；超时后不强行中断写入，任务在写完或传输出错后自行退出
    if tokio::time::timeout(hub.writer_drain(), writer).await.is_err() {
        warn!("连接 {} 发送任务未能按时退出，转为后台完成", connection.id());
    }

    let lifetime = chrono::Utc::now() - connection.connected_at();
    info!(
        "连接 {} 已关闭 ({:?}), 持续 {} 秒",
        connection.id(),
        reason,
        lifetime.num_seconds()
    );
    SessionEnd::Closed(reason)
}

/// 注册后若数据已变化且此间未收到任何广播，补发一次最新状态
///
/// 此间已有广播投递说明客户端会收到更新的状态，不再补发
async fn refresh_after_register(
    reader: &dyn RobotReader,
    connection: &Connection,
    topic: Topic,
    greeting: &Greeting,
    seen: u64,
) {
    let latest = match Greeting::load(reader, topic).await {
        Ok(latest) => latest,
        Err(HandshakeError::RobotNotFound(_)) => return,
        Err(e) => {
            warn!("连接 {} 注册后重新读取失败: {}", connection.id(), e);
            return;
        }
    };
    if latest.same_view(greeting) {
        return;
    }

    let json = match latest.refresh_event().to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("序列化补发事件失败: {}", e);
            return;
        }
    };
    match connection.deliver_if_unchanged(Frame::text(json), seen) {
        Ok(true) => debug!("连接 {} 已补发注册期间的变更 ({})", connection.id(), topic),
        Ok(false) => {}
        Err(e) => debug!("补发失败: {}", e),
    }
}

/// 注销并进入 Closed，重复调用为空操作
async fn release(hub: &RealtimeHub, connection: &Connection, opened: bool) {
    connection.begin_close();
    if connection.try_finalize() {
        hub.registry().deregister(connection.id()).await;
        connection.mark_closed();
        if opened {
            hub.metrics().connections_active.dec();
        }
    }
}

async fn reject<W>(
    hub: &RealtimeHub,
    connection: &Connection,
    sink: &mut W,
    topic: Topic,
    error: HandshakeError,
) -> SessionEnd
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    warn!("连接 {} 握手失败 ({}): {}", connection.id(), topic, error);
    hub.metrics().handshake_rejections_total.inc();
    release(hub, connection, false).await;

    let code = error.close_code();
    let frame = Frame::Close { code, reason: error.reason() };
    if let Err(e) = sink.send(frame.into_message()).await {
        debug!("发送关闭帧失败: {}", e);
    }
    if let Err(e) = sink.close().await {
        debug!("关闭连接失败: {}", e);
    }
    SessionEnd::Rejected(code)
}

/// 处理入站文本帧，只应答心跳
fn handle_text(connection: &Connection, text: &str) {
    match ClientMessage::parse(text) {
        Some(ClientMessage::Ping) => match serde_json::to_string(&ControlMessage::Pong) {
            Ok(pong) => {
                if let Err(e) = connection.deliver(Frame::text(pong)) {
                    debug!("发送心跳响应失败: {}", e);
                }
            }
            Err(e) => warn!("序列化心跳响应失败: {}", e),
        },
        Some(ClientMessage::Unknown) | None => {
            debug!("连接 {} 收到未识别的消息，忽略", connection.id());
        }
    }
}

/// 发送任务：按入队顺序串行写出，写失败或写出关闭帧后退出
async fn write_frames<W>(
    mut sink: W,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    closing: CancellationToken,
) where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(frame) = frames.recv().await {
        let is_close = frame.is_close();
        if let Err(e) = sink.send(frame.into_message()).await {
            debug!("写入 WebSocket 失败: {}", e);
            break;
        }
        if is_close {
            break;
        }
    }
    closing.cancel();
    debug!("发送任务结束");
}
