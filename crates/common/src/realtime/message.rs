/// 实时推送消息定义

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FleetRobotSummary, RobotSnapshot};

/// 客户端入站消息
/// 
/// 客户端不能通过该通道驱动状态，只有心跳会被应答；
/// 无法识别的消息类型一律忽略，保证向前兼容
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 心跳
    Ping,
    /// 其他类型
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// 解析入站文本帧，非 JSON 对象或缺少 type 字段时返回 None
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// 控制应答消息
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// 心跳响应
    Pong,
}

/// 服务端推送事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 订阅单个机器人成功后的初始快照
    #[serde(rename = "connected")]
    RobotConnected {
        robot_id: Uuid,
        robot: RobotSnapshot,
        subscribers: usize,
    },
    /// 订阅车队成功后的初始摘要
    #[serde(rename = "connected")]
    FleetConnected {
        fleet_size: usize,
        robots: Vec<FleetRobotSummary>,
        subscribers: usize,
    },
    /// 机器人状态更新
    StatusUpdate {
        robot_id: Uuid,
        robot: RobotSnapshot,
    },
    /// 车队摘要更新
    FleetUpdate {
        fleet_size: usize,
        robots: Vec<FleetRobotSummary>,
    },
}

impl ServerEvent {
    /// 构建机器人状态更新事件
    pub fn status_update(robot: RobotSnapshot) -> Self {
        Self::StatusUpdate {
            robot_id: robot.id,
            robot,
        }
    }

    /// 根据机器人列表构建车队摘要事件
    pub fn fleet_update(robots: &[RobotSnapshot]) -> Self {
        Self::FleetUpdate {
            fleet_size: robots.len(),
            robots: robots.iter().map(RobotSnapshot::summary).collect(),
        }
    }

    /// 事件名称（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RobotConnected { .. } | Self::FleetConnected { .. } => "connected",
            Self::StatusUpdate { .. } => "status_update",
            Self::FleetUpdate { .. } => "fleet_update",
        }
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
