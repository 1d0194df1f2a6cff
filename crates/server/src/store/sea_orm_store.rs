/// 基于 SeaORM 的机器人与任务存储

use async_trait::async_trait;
use chrono::Utc;
use common::{Error, MissionStatus, RobotSnapshot, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::{MissionRepository, RobotReader, RobotRepository};
use crate::db::models::mission::{
    ActiveModel as MissionActiveModel, Column as MissionColumn, CreateMissionDto,
    Entity as MissionEntity, Mission, MissionFilter, UpdateMissionDto,
};
use crate::db::models::robot::{
    ActiveModel as RobotActiveModel, Column as RobotColumn, CreateRobotDto, Entity as RobotEntity,
    Robot, RobotStatusUpdateDto, UpdateRobotDto,
};

fn db_err(err: DbErr) -> Error {
    Error::Database(err.to_string())
}

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RobotReader for SeaOrmStore {
    async fn fetch_robot(&self, id: Uuid) -> Result<Option<RobotSnapshot>> {
        let robot = RobotEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(robot.map(|r| r.snapshot()))
    }

    async fn list_robots(&self) -> Result<Vec<RobotSnapshot>> {
        let robots = RobotEntity::find()
            .order_by_asc(RobotColumn::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(robots.iter().map(Robot::snapshot).collect())
    }
}

#[async_trait]
impl RobotRepository for SeaOrmStore {
    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<Robot>> {
        RobotEntity::find()
            .order_by_asc(RobotColumn::CreatedAt)
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn get(&self, id: Uuid) -> Result<Robot> {
        RobotEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::robot_not_found(id))
    }

    async fn create(&self, dto: CreateRobotDto) -> Result<Robot> {
        // 检查序列号是否已存在
        let existing = RobotEntity::find()
            .filter(RobotColumn::SerialNumber.eq(dto.serial_number.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if existing.is_some() {
            return Err(Error::AlreadyExists(format!("序列号已注册: {}", dto.serial_number)));
        }

        let now = Utc::now();
        let robot_active = RobotActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(dto.name),
            serial_number: Set(dto.serial_number),
            robot_type: Set(dto.robot_type.as_str().to_string()),
            status: Set(dto.status.as_str().to_string()),
            location_x: Set(None),
            location_y: Set(None),
            location_z: Set(None),
            heading: Set(None),
            firmware_version: Set(dto.firmware_version),
            battery_level: Set(None),
            description: Set(dto.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        robot_active.insert(&self.db).await.map_err(db_err)
    }

    async fn update(&self, id: Uuid, dto: UpdateRobotDto) -> Result<Robot> {
        let mut robot = RobotRepository::get(self, id).await?;
        let mut robot_active: RobotActiveModel = robot.clone().into();
        dto.apply_to(&mut robot);

        robot_active.name = Set(robot.name);
        robot_active.robot_type = Set(robot.robot_type);
        robot_active.firmware_version = Set(robot.firmware_version);
        robot_active.description = Set(robot.description);
        robot_active.updated_at = Set(Utc::now().into());

        robot_active.update(&self.db).await.map_err(db_err)
    }

    async fn update_status(&self, id: Uuid, dto: RobotStatusUpdateDto) -> Result<Robot> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut robot = RobotEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::robot_not_found(id))?;

        let mut robot_active: RobotActiveModel = robot.clone().into();
        dto.apply_to(&mut robot);

        robot_active.status = Set(robot.status);
        robot_active.location_x = Set(robot.location_x);
        robot_active.location_y = Set(robot.location_y);
        robot_active.location_z = Set(robot.location_z);
        robot_active.heading = Set(robot.heading);
        robot_active.battery_level = Set(robot.battery_level);
        robot_active.updated_at = Set(Utc::now().into());

        let robot = robot_active.update(&txn).await.map_err(db_err)?;

        // 提交后才返回，调用方据此发布推送
        txn.commit().await.map_err(db_err)?;
        debug!("机器人状态已提交: {}", id);

        Ok(robot)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = RobotEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(Error::robot_not_found(id));
        }

        Ok(())
    }
}

#[async_trait]
impl MissionRepository for SeaOrmStore {
    async fn list(&self, filter: MissionFilter, skip: u64, limit: u64) -> Result<Vec<Mission>> {
        let mut query = MissionEntity::find();

        if let Some(status) = filter.status {
            query = query.filter(MissionColumn::Status.eq(status.as_str()));
        }
        if let Some(robot_id) = filter.robot_id {
            query = query.filter(MissionColumn::RobotId.eq(robot_id));
        }

        query
            .order_by_asc(MissionColumn::CreatedAt)
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn get(&self, id: Uuid) -> Result<Mission> {
        MissionEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::mission_not_found(id))
    }

    async fn create(&self, dto: CreateMissionDto) -> Result<Mission> {
        let now = Utc::now();
        let mission_active = MissionActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(dto.name),
            description: Set(dto.description),
            status: Set(MissionStatus::Pending.as_str().to_string()),
            priority: Set(dto.priority.as_str().to_string()),
            target_x: Set(dto.target_x),
            target_y: Set(dto.target_y),
            target_z: Set(dto.target_z),
            scheduled_at: Set(dto.scheduled_at),
            started_at: Set(None),
            completed_at: Set(None),
            progress: Set(0.0),
            robot_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        mission_active.insert(&self.db).await.map_err(db_err)
    }

    async fn update(&self, id: Uuid, dto: UpdateMissionDto) -> Result<Mission> {
        let mut mission = MissionRepository::get(self, id).await?;
        let mut mission_active: MissionActiveModel = mission.clone().into();
        let now = Utc::now().fixed_offset();
        dto.apply_to(&mut mission, now);

        mission_active.name = Set(mission.name);
        mission_active.description = Set(mission.description);
        mission_active.status = Set(mission.status);
        mission_active.priority = Set(mission.priority);
        mission_active.target_x = Set(mission.target_x);
        mission_active.target_y = Set(mission.target_y);
        mission_active.target_z = Set(mission.target_z);
        mission_active.scheduled_at = Set(mission.scheduled_at);
        mission_active.started_at = Set(mission.started_at);
        mission_active.completed_at = Set(mission.completed_at);
        mission_active.progress = Set(mission.progress);
        mission_active.updated_at = Set(now);

        mission_active.update(&self.db).await.map_err(db_err)
    }

    async fn assign(&self, id: Uuid, robot_id: Uuid) -> Result<Mission> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mission = MissionEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::mission_not_found(id))?;

        let status = MissionStatus::from(mission.status.as_str());
        if !status.is_assignable() {
            return Err(Error::InvalidArgument(format!(
                "无法分配状态为 {} 的任务",
                status.as_str()
            )));
        }

        RobotEntity::find_by_id(robot_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::robot_not_found(robot_id))?;

        let mut mission_active: MissionActiveModel = mission.into();
        mission_active.robot_id = Set(Some(robot_id));
        mission_active.status = Set(MissionStatus::Assigned.as_str().to_string());
        mission_active.updated_at = Set(Utc::now().into());

        let mission = mission_active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        debug!("任务 {} 已分配给机器人 {}", id, robot_id);

        Ok(mission)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = MissionEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(Error::mission_not_found(id));
        }

        Ok(())
    }
}
