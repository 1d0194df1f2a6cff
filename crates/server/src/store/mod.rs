/// 数据存储协作者
/// 
/// 实时推送核心只通过 [`RobotReader`] 读取机器人快照，从不写入；
/// CRUD 层通过 [`RobotRepository`] 与 [`MissionRepository`] 完成读写

pub mod sea_orm_store;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use common::{RobotSnapshot, Result};
use uuid::Uuid;

use crate::db::models::mission::{CreateMissionDto, Mission, MissionFilter, UpdateMissionDto};
use crate::db::models::robot::{CreateRobotDto, Robot, RobotStatusUpdateDto, UpdateRobotDto};

pub use sea_orm_store::SeaOrmStore;

/// 机器人快照只读接口
#[async_trait]
pub trait RobotReader: Send + Sync {
    /// 按 ID 读取当前快照，不存在时返回 None
    async fn fetch_robot(&self, id: Uuid) -> Result<Option<RobotSnapshot>>;

    /// 读取全部机器人的当前快照
    async fn list_robots(&self) -> Result<Vec<RobotSnapshot>>;
}

/// 机器人仓储（CRUD 层使用）
/// 
/// 写操作返回时数据已经提交
#[async_trait]
pub trait RobotRepository: RobotReader {
    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<Robot>>;

    async fn get(&self, id: Uuid) -> Result<Robot>;

    /// 创建机器人，序列号重复时返回 AlreadyExists
    async fn create(&self, dto: CreateRobotDto) -> Result<Robot>;

    async fn update(&self, id: Uuid, dto: UpdateRobotDto) -> Result<Robot>;

    /// 在事务中更新状态与遥测
    async fn update_status(&self, id: Uuid, dto: RobotStatusUpdateDto) -> Result<Robot>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// 任务仓储
#[async_trait]
pub trait MissionRepository: Send + Sync {
    async fn list(&self, filter: MissionFilter, skip: u64, limit: u64) -> Result<Vec<Mission>>;

    async fn get(&self, id: Uuid) -> Result<Mission>;

    async fn create(&self, dto: CreateMissionDto) -> Result<Mission>;

    async fn update(&self, id: Uuid, dto: UpdateMissionDto) -> Result<Mission>;

    /// 将任务分配给机器人
    /// 
    /// 任务已开始或已结束时返回 InvalidArgument，机器人不存在时返回 NotFound
    async fn assign(&self, id: Uuid, robot_id: Uuid) -> Result<Mission>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}
