/// 任务数据模型

use common::{MissionPriority, MissionStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 任务模型
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "missions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub status: String,
    pub priority: String,

    // 目标位置
    pub target_x: Option<f64>,
    pub target_y: Option<f64>,
    pub target_z: Option<f64>,

    // 计划与执行时间
    pub scheduled_at: Option<DateTimeWithTimeZone>,
    pub started_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,

    /// 进度 0-100
    pub progress: f64,

    /// 执行任务的机器人，机器人删除后置空
    pub robot_id: Option<Uuid>,

    // 时间戳
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::robot::Entity",
        from = "Column::RobotId",
        to = "super::robot::Column::Id",
        on_delete = "SetNull"
    )]
    Robot,
}

impl Related<super::robot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Robot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub type Mission = Model;

/// 任务列表过滤条件
#[derive(Debug, Clone, Copy, Default)]
pub struct MissionFilter {
    pub status: Option<MissionStatus>,
    pub robot_id: Option<Uuid>,
}

impl MissionFilter {
    pub fn matches(&self, mission: &Model) -> bool {
        self.status
            .map_or(true, |status| mission.status == status.as_str())
            && self
                .robot_id
                .map_or(true, |robot_id| mission.robot_id == Some(robot_id))
    }
}

/// 创建任务 DTO
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMissionDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,

    #[serde(default)]
    pub priority: MissionPriority,

    pub target_x: Option<f64>,
    pub target_y: Option<f64>,
    pub target_z: Option<f64>,

    pub scheduled_at: Option<DateTimeWithTimeZone>,
}

/// 更新任务 DTO
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateMissionDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<MissionStatus>,
    pub priority: Option<MissionPriority>,

    pub target_x: Option<f64>,
    pub target_y: Option<f64>,
    pub target_z: Option<f64>,

    pub scheduled_at: Option<DateTimeWithTimeZone>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub progress: Option<f64>,
}

impl UpdateMissionDto {
    /// 将更新应用到记录上（只覆盖提供的字段）
    /// 
    /// 首次进入 in_progress 时记录开始时间，进入 completed/failed 时记录结束时间
    pub fn apply_to(&self, mission: &mut Model, now: DateTimeWithTimeZone) {
        if let Some(status) = self.status {
            if status == MissionStatus::InProgress && mission.started_at.is_none() {
                mission.started_at = Some(now);
            } else if status.is_finished() {
                mission.completed_at = Some(now);
            }
            mission.status = status.as_str().to_string();
        }
        if let Some(ref name) = self.name {
            mission.name = name.clone();
        }
        if self.description.is_some() {
            mission.description = self.description.clone();
        }
        if let Some(priority) = self.priority {
            mission.priority = priority.as_str().to_string();
        }
        if self.target_x.is_some() {
            mission.target_x = self.target_x;
        }
        if self.target_y.is_some() {
            mission.target_y = self.target_y;
        }
        if self.target_z.is_some() {
            mission.target_z = self.target_z;
        }
        if self.scheduled_at.is_some() {
            mission.scheduled_at = self.scheduled_at;
        }
        if let Some(progress) = self.progress {
            mission.progress = progress;
        }
    }
}

/// 分配任务 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignMissionDto {
    pub robot_id: Uuid,
}

/// 任务响应 DTO
#[derive(Debug, Serialize, Deserialize)]
pub struct MissionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: MissionStatus,
    pub priority: MissionPriority,
    pub target_x: Option<f64>,
    pub target_y: Option<f64>,
    pub target_z: Option<f64>,
    pub scheduled_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub progress: f64,
    pub robot_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Mission> for MissionResponse {
    fn from(mission: Mission) -> Self {
        Self {
            id: mission.id,
            status: MissionStatus::from(mission.status.as_str()),
            priority: MissionPriority::from(mission.priority.as_str()),
            name: mission.name,
            description: mission.description,
            target_x: mission.target_x,
            target_y: mission.target_y,
            target_z: mission.target_z,
            scheduled_at: mission.scheduled_at.map(|t| t.to_rfc3339()),
            started_at: mission.started_at.map(|t| t.to_rfc3339()),
            completed_at: mission.completed_at.map(|t| t.to_rfc3339()),
            progress: mission.progress,
            robot_id: mission.robot_id,
            created_at: mission.created_at.to_rfc3339(),
            updated_at: mission.updated_at.to_rfc3339(),
        }
    }
}
