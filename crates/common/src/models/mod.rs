/// 共享数据模型
/// 
/// 定义机器人状态、类型以及实时推送使用的快照投影

pub mod mission;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use mission::{MissionPriority, MissionStatus};

/// 机器人运行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Idle,
    Active,
    Charging,
    Maintenance,
    Offline,
    Error,
}

impl RobotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotStatus::Idle => "idle",
            RobotStatus::Active => "active",
            RobotStatus::Charging => "charging",
            RobotStatus::Maintenance => "maintenance",
            RobotStatus::Offline => "offline",
            RobotStatus::Error => "error",
        }
    }
}

impl From<&str> for RobotStatus {
    fn from(s: &str) -> Self {
        match s {
            "idle" => RobotStatus::Idle,
            "active" => RobotStatus::Active,
            "charging" => RobotStatus::Charging,
            "maintenance" => RobotStatus::Maintenance,
            "error" => RobotStatus::Error,
            _ => RobotStatus::Offline,
        }
    }
}

impl Default for RobotStatus {
    fn default() -> Self {
        RobotStatus::Offline
    }
}

/// 机器人类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RobotType {
    /// 自主移动机器人
    Amr,
    /// 自动导引车
    Agv,
    Drone,
    /// 机械臂
    Arm,
    Humanoid,
}

impl RobotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotType::Amr => "amr",
            RobotType::Agv => "agv",
            RobotType::Drone => "drone",
            RobotType::Arm => "arm",
            RobotType::Humanoid => "humanoid",
        }
    }
}

impl From<&str> for RobotType {
    fn from(s: &str) -> Self {
        match s {
            "agv" => RobotType::Agv,
            "drone" => RobotType::Drone,
            "arm" => RobotType::Arm,
            "humanoid" => RobotType::Humanoid,
            _ => RobotType::Amr,
        }
    }
}

impl Default for RobotType {
    fn default() -> Self {
        RobotType::Amr
    }
}

/// 机器人快照
/// 
/// 某一时刻的机器人状态投影，用于构建推送事件，不是实时引用
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RobotSnapshot {
    pub id: Uuid,
    pub name: String,
    pub serial_number: String,
    pub status: RobotStatus,
    pub location_x: Option<f64>,
    pub location_y: Option<f64>,
    pub location_z: Option<f64>,
    /// 航向角（度）
    pub heading: Option<f64>,
    /// 电量百分比 0-100
    pub battery_level: Option<f64>,
}

impl RobotSnapshot {
    /// 转换为车队摘要
    pub fn summary(&self) -> FleetRobotSummary {
        FleetRobotSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            battery_level: self.battery_level,
        }
    }
}

/// 车队摘要中的单个机器人
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FleetRobotSummary {
    pub id: Uuid,
    pub name: String,
    pub status: RobotStatus,
    pub battery_level: Option<f64>,
}
