/// 任务管理服务

use common::Result;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::mission::{
    CreateMissionDto, MissionFilter, MissionResponse, UpdateMissionDto,
};

pub struct MissionService {
    state: AppState,
}

impl MissionService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 获取任务列表
    pub async fn list_missions(
        &self,
        filter: MissionFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<MissionResponse>> {
        let missions = self.state.missions().list(filter, skip, limit).await?;
        Ok(missions.into_iter().map(MissionResponse::from).collect())
    }

    /// 获取单个任务
    pub async fn get_mission(&self, id: Uuid) -> Result<MissionResponse> {
        let mission = self.state.missions().get(id).await?;
        Ok(MissionResponse::from(mission))
    }

    /// 创建任务，初始状态为 pending
    pub async fn create_mission(&self, dto: CreateMissionDto) -> Result<MissionResponse> {
        let mission = self.state.missions().create(dto).await?;
        Ok(MissionResponse::from(mission))
    }

    /// 更新任务
    pub async fn update_mission(&self, id: Uuid, dto: UpdateMissionDto) -> Result<MissionResponse> {
        let mission = self.state.missions().update(id, dto).await?;
        Ok(MissionResponse::from(mission))
    }

    /// 分配机器人
    pub async fn assign_mission(&self, id: Uuid, robot_id: Uuid) -> Result<MissionResponse> {
        let mission = self.state.missions().assign(id, robot_id).await?;
        tracing::info!("任务 {} 已分配给机器人 {}", id, robot_id);
        Ok(MissionResponse::from(mission))
    }

    /// 删除任务
    pub async fn delete_mission(&self, id: Uuid) -> Result<()> {
        self.state.missions().delete(id).await
    }
}
