/// 内存中的机器人与任务存储（测试用）

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{Error, MissionStatus, RobotSnapshot, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MissionRepository, RobotReader, RobotRepository};
use crate::db::models::mission::{CreateMissionDto, Mission, MissionFilter, UpdateMissionDto};
use crate::db::models::robot::{CreateRobotDto, Robot, RobotStatusUpdateDto, UpdateRobotDto};

#[derive(Default)]
pub struct MemoryStore {
    robots: RwLock<Vec<Robot>>,
    missions: RwLock<Vec<Mission>>,
    /// 置位后所有读取返回数据库错误
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一个机器人
    pub async fn seed(&self, name: &str, serial_number: &str) -> Robot {
        let now = Utc::now().fixed_offset();
        let robot = Robot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            serial_number: serial_number.to_string(),
            robot_type: "amr".to_string(),
            status: "idle".to_string(),
            location_x: Some(0.0),
            location_y: Some(0.0),
            location_z: Some(0.0),
            heading: Some(0.0),
            firmware_version: None,
            battery_level: Some(100.0),
            description: None,
            created_at: now,
            updated_at: now,
        };
        self.robots.write().await.push(robot.clone());
        robot
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Database("连接已断开".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RobotReader for MemoryStore {
    async fn fetch_robot(&self, id: Uuid) -> Result<Option<RobotSnapshot>> {
        self.check_available()?;
        let robots = self.robots.read().await;
        Ok(robots.iter().find(|r| r.id == id).map(Robot::snapshot))
    }

    async fn list_robots(&self) -> Result<Vec<RobotSnapshot>> {
        self.check_available()?;
        let robots = self.robots.read().await;
        Ok(robots.iter().map(Robot::snapshot).collect())
    }
}

#[async_trait]
impl RobotRepository for MemoryStore {
    async fn list(&self, skip: u64, limit: u64) -> Result<Vec<Robot>> {
        self.check_available()?;
        let robots = self.robots.read().await;
        Ok(robots
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Robot> {
        self.check_available()?;
        let robots = self.robots.read().await;
        robots
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::robot_not_found(id))
    }

    async fn create(&self, dto: CreateRobotDto) -> Result<Robot> {
        self.check_available()?;
        let mut robots = self.robots.write().await;
        if robots.iter().any(|r| r.serial_number == dto.serial_number) {
            return Err(Error::AlreadyExists(format!("序列号已注册: {}", dto.serial_number)));
        }

        let now = Utc::now().fixed_offset();
        let robot = Robot {
            id: Uuid::new_v4(),
            name: dto.name,
            serial_number: dto.serial_number,
            robot_type: dto.robot_type.as_str().to_string(),
            status: dto.status.as_str().to_string(),
            location_x: None,
            location_y: None,
            location_z: None,
            heading: None,
            firmware_version: dto.firmware_version,
            battery_level: None,
            description: dto.description,
            created_at: now,
            updated_at: now,
        };
        robots.push(robot.clone());
        Ok(robot)
    }

    async fn update(&self, id: Uuid, dto: UpdateRobotDto) -> Result<Robot> {
        self.check_available()?;
        let mut robots = self.robots.write().await;
        let robot = robots
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::robot_not_found(id))?;
        dto.apply_to(robot);
        robot.updated_at = Utc::now().fixed_offset();
        Ok(robot.clone())
    }

    async fn update_status(&self, id: Uuid, dto: RobotStatusUpdateDto) -> Result<Robot> {
        self.check_available()?;
        let mut robots = self.robots.write().await;
        let robot = robots
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::robot_not_found(id))?;
        dto.apply_to(robot);
        robot.updated_at = Utc::now().fixed_offset();
        Ok(robot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.check_available()?;
        let mut robots = self.robots.write().await;
        let before = robots.len();
        robots.retain(|r| r.id != id);
        if robots.len() == before {
            return Err(Error::robot_not_found(id));
        }

        // 与外键 ON DELETE SET NULL 一致
        for mission in self.missions.write().await.iter_mut() {
            if mission.robot_id == Some(id) {
                mission.robot_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MissionRepository for MemoryStore {
    async fn list(&self, filter: MissionFilter, skip: u64, limit: u64) -> Result<Vec<Mission>> {
        self.check_available()?;
        let missions = self.missions.read().await;
        Ok(missions
            .iter()
            .filter(|m| filter.matches(m))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Mission> {
        self.check_available()?;
        let missions = self.missions.read().await;
        missions
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| Error::mission_not_found(id))
    }

    async fn create(&self, dto: CreateMissionDto) -> Result<Mission> {
        self.check_available()?;
        let now = Utc::now().fixed_offset();
        let mission = Mission {
            id: Uuid::new_v4(),
            name: dto.name,
            description: dto.description,
            status: MissionStatus::Pending.as_str().to_string(),
            priority: dto.priority.as_str().to_string(),
            target_x: dto.target_x,
            target_y: dto.target_y,
            target_z: dto.target_z,
            scheduled_at: dto.scheduled_at,
            started_at: None,
            completed_at: None,
            progress: 0.0,
            robot_id: None,
            created_at: now,
            updated_at: now,
        };
        self.missions.write().await.push(mission.clone());
        Ok(mission)
    }

    async fn update(&self, id: Uuid, dto: UpdateMissionDto) -> Result<Mission> {
        self.check_available()?;
        let mut missions = self.missions.write().await;
        let mission = missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::mission_not_found(id))?;
        let now = Utc::now().fixed_offset();
        dto.apply_to(mission, now);
        mission.updated_at = now;
        Ok(mission.clone())
    }

    async fn assign(&self, id: Uuid, robot_id: Uuid) -> Result<Mission> {
        self.check_available()?;
        let robots = self.robots.read().await;
        let mut missions = self.missions.write().await;
        let mission = missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::mission_not_found(id))?;

        let status = MissionStatus::from(mission.status.as_str());
        if !status.is_assignable() {
            return Err(Error::InvalidArgument(format!(
                "无法分配状态为 {} 的任务",
                status.as_str()
            )));
        }
        if !robots.iter().any(|r| r.id == robot_id) {
            return Err(Error::robot_not_found(robot_id));
        }

        mission.robot_id = Some(robot_id);
        mission.status = MissionStatus::Assigned.as_str().to_string();
        mission.updated_at = Utc::now().fixed_offset();
        Ok(mission.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.check_available()?;
        let mut missions = self.missions.write().await;
        let before = missions.len();
        missions.retain(|m| m.id != id);
        if missions.len() == before {
            return Err(Error::mission_not_found(id));
        }
        Ok(())
    }
}
