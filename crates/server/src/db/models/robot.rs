use common::{RobotSnapshot, RobotStatus, RobotType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 机器人模型
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "robots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub robot_type: String,
    pub status: String,

    // 位置
    pub location_x: Option<f64>,
    pub location_y: Option<f64>,
    pub location_z: Option<f64>,
    /// 航向角（度）
    pub heading: Option<f64>,

    // 元数据
    pub firmware_version: Option<String>,
    /// 电量 0-100
    pub battery_level: Option<f64>,
    pub description: Option<String>,

    // 时间戳
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub type Robot = Model;

impl Model {
    /// 推送使用的状态投影
    pub fn snapshot(&self) -> RobotSnapshot {
        RobotSnapshot {
            id: self.id,
            name: self.name.clone(),
            serial_number: self.serial_number.clone(),
            status: RobotStatus::from(self.status.as_str()),
            location_x: self.location_x,
            location_y: self.location_y,
            location_z: self.location_z,
            heading: self.heading,
            battery_level: self.battery_level,
        }
    }
}

/// 创建机器人 DTO
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRobotDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 50))]
    pub serial_number: String,

    #[serde(default)]
    pub robot_type: RobotType,
    #[serde(default)]
    pub status: RobotStatus,

    #[validate(length(max = 50))]
    pub firmware_version: Option<String>,
    pub description: Option<String>,
}

/// 更新机器人描述信息 DTO
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateRobotDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    pub robot_type: Option<RobotType>,

    #[validate(length(max = 50))]
    pub firmware_version: Option<String>,
    pub description: Option<String>,
}

/// 更新机器人状态与遥测 DTO
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RobotStatusUpdateDto {
    pub status: Option<RobotStatus>,
    pub location_x: Option<f64>,
    pub location_y: Option<f64>,
    pub location_z: Option<f64>,

    #[validate(range(min = 0.0, max = 360.0))]
    pub heading: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_level: Option<f64>,
}

impl RobotStatusUpdateDto {
    /// 将状态更新应用到记录上（只覆盖提供的字段）
    pub fn apply_to(&self, robot: &mut Model) {
        if let Some(status) = self.status {
            robot.status = status.as_str().to_string();
        }
        if self.location_x.is_some() {
            robot.location_x = self.location_x;
        }
        if self.location_y.is_some() {
            robot.location_y = self.location_y;
        }
        if self.location_z.is_some() {
            robot.location_z = self.location_z;
        }
        if self.heading.is_some() {
            robot.heading = self.heading;
        }
        if self.battery_level.is_some() {
            robot.battery_level = self.battery_level;
        }
    }
}

impl UpdateRobotDto {
    /// 将描述信息更新应用到记录上
    pub fn apply_to(&self, robot: &mut Model) {
        if let Some(ref name) = self.name {
            robot.name = name.clone();
        }
        if let Some(robot_type) = self.robot_type {
            robot.robot_type = robot_type.as_str().to_string();
        }
        if self.firmware_version.is_some() {
            robot.firmware_version = self.firmware_version.clone();
        }
        if self.description.is_some() {
            robot.description = self.description.clone();
        }
    }
}

/// 机器人响应 DTO
#[derive(Debug, Serialize, Deserialize)]
pub struct RobotResponse {
    pub id: Uuid,
    pub name: String,
    pub serial_number: String,
    pub robot_type: RobotType,
    pub status: RobotStatus,
    pub location_x: Option<f64>,
    pub location_y: Option<f64>,
    pub location_z: Option<f64>,
    pub heading: Option<f64>,
    pub firmware_version: Option<String>,
    pub battery_level: Option<f64>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Robot> for RobotResponse {
    fn from(robot: Robot) -> Self {
        Self {
            id: robot.id,
            robot_type: RobotType::from(robot.robot_type.as_str()),
            status: RobotStatus::from(robot.status.as_str()),
            name: robot.name,
            serial_number: robot.serial_number,
            location_x: robot.location_x,
            location_y: robot.location_y,
            location_z: robot.location_z,
            heading: robot.heading,
            firmware_version: robot.firmware_version,
            battery_level: robot.battery_level,
            description: robot.description,
            created_at: robot.created_at.to_rfc3339(),
            updated_at: robot.updated_at.to_rfc3339(),
        }
    }
}
