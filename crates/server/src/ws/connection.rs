/// 客户端连接
/// 
/// 一个连接对应一个客户端通道。出站帧经由无界队列交给该连接独占的
/// 发送任务串行写出，因此同一连接上的投递顺序与入队顺序一致

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::ws::{CloseFrame, Message};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 连接 ID
pub type ConnectionId = Uuid;

/// 出站帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// 已序列化的 JSON 文本，多个连接共享同一份
    Text(Arc<str>),
    /// 关闭帧
    Close { code: u16, reason: &'static str },
}

impl Frame {
    pub fn text(json: impl Into<Arc<str>>) -> Self {
        Frame::Text(json.into())
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Close { .. })
    }

    /// 转换为 WebSocket 消息
    pub fn into_message(self) -> Message {
        match self {
            Frame::Text(text) => Message::Text(text.to_string()),
            Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
                code,
                reason: Cow::Borrowed(reason),
            })),
        }
    }
}

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    Handshaking = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            0 => ConnectionState::Handshaking,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// 投递错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("连接正在关闭: {0}")]
    Closing(ConnectionId),

    #[error("连接传输已断开: {0}")]
    TransportGone(ConnectionId),
}

/// 客户端连接
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Frame>,
    /// 已入队的帧数，入队与计数在同一把锁内完成
    delivered: Mutex<u64>,
    state: AtomicU8,
    /// 注销只允许发生一次
    finalized: AtomicBool,
    /// 进入 Closing 时取消，通知会话任务收尾
    closing: CancellationToken,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// 创建处于握手阶段的连接
    pub fn new(sender: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            delivered: Mutex::new(0),
            state: AtomicU8::new(ConnectionState::Handshaking as u8),
            finalized: AtomicBool::new(false),
            closing: CancellationToken::new(),
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    /// 是否仍可接收订阅与投递
    pub fn is_accepting(&self) -> bool {
        self.state() < ConnectionState::Closing
    }

    /// 投递一帧
    /// 
    /// 连接进入 Closing 之后或发送任务已退出时失败
    pub fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        self.enqueue(frame)?;
        *delivered += 1;
        Ok(())
    }

    /// 已成功入队的帧数
    pub fn delivered(&self) -> u64 {
        *self.delivered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 仅当入队计数仍为 `seen` 时投递，返回是否已投递
    pub(crate) fn deliver_if_unchanged(&self, frame: Frame, seen: u64) -> Result<bool, DeliveryError> {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if *delivered != seen {
            return Ok(false);
        }
        self.enqueue(frame)?;
        *delivered += 1;
        Ok(true)
    }

    fn enqueue(&self, frame: Frame) -> Result<(), DeliveryError> {
        if !self.is_accepting() {
            return Err(DeliveryError::Closing(self.id));
        }
        self.sender
            .send(frame)
            .map_err(|_| DeliveryError::TransportGone(self.id))
    }

    /// 收尾时排入关闭帧，不检查状态
    pub(crate) fn send_close(&self, code: u16, reason: &'static str) -> bool {
        self.sender.send(Frame::Close { code, reason }).is_ok()
    }

    /// Handshaking -> Open
    pub(crate) fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Handshaking as u8,
                ConnectionState::Open as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// 进入 Closing，返回本次调用是否完成了状态迁移
    /// 
    /// 可以从任意任务重复调用
    pub fn begin_close(&self) -> bool {
        let mut current = self.state.load(Ordering::SeqCst);
        let transitioned = loop {
            if current >= ConnectionState::Closing as u8 {
                break false;
            }
            match self.state.compare_exchange(
                current,
                ConnectionState::Closing as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break true,
                Err(actual) => current = actual,
            }
        };
        self.closing.cancel();
        transitioned
    }

    /// 抢占收尾权，只有第一次调用返回 true
    pub(crate) fn try_finalize(&self) -> bool {
        !self.finalized.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn mark_closed(&self) {
        self.state.store(ConnectionState::Closed as u8, Ordering::SeqCst);
        self.closing.cancel();
    }

    /// 等待连接进入 Closing
    pub async fn closing(&self) {
        self.closing.cancelled().await
    }

    /// 供发送任务在写失败时通知会话
    pub(crate) fn closing_token(&self) -> CancellationToken {
        self.closing.clone()
    }
}
