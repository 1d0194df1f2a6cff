/// 任务管理接口

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::MissionStatus;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{default_limit, ApiError};
use crate::app_state::AppState;
use crate::db::models::mission::{
    AssignMissionDto, CreateMissionDto, MissionFilter, MissionResponse, UpdateMissionDto,
};
use crate::services::MissionService;

/// 查询参数
#[derive(Debug, Deserialize)]
pub struct ListMissionsQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<MissionStatus>,
    pub robot_id: Option<Uuid>,
}

/// 任务路由
pub fn mission_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_missions).post(create_mission))
        .route("/:id", get(get_mission).patch(update_mission).delete(delete_mission))
        .route("/:id/assign", post(assign_mission))
}

/// 获取任务列表
///
/// GET /api/v1/missions?status=pending&robot_id=...&skip=0&limit=100
pub async fn list_missions(
    State(state): State<AppState>,
    Query(query): Query<ListMissionsQuery>,
) -> Result<Json<Vec<MissionResponse>>, ApiError> {
    let filter = MissionFilter {
        status: query.status,
        robot_id: query.robot_id,
    };

    let service = MissionService::new(state);
    let result = service.list_missions(filter, query.skip, query.limit).await?;

    Ok(Json(result))
}

/// 创建任务
///
/// POST /api/v1/missions
/// Body: CreateMissionDto
pub async fn create_mission(
    State(state): State<AppState>,
    Json(dto): Json<CreateMissionDto>,
) -> Result<(StatusCode, Json<MissionResponse>), ApiError> {
    dto.validate()?;

    let service = MissionService::new(state);
    let result = service.create_mission(dto).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// 获取单个任务
///
/// GET /api/v1/missions/:id
pub async fn get_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MissionResponse>, ApiError> {
    let service = MissionService::new(state);
    let result = service.get_mission(id).await?;

    Ok(Json(result))
}

/// 更新任务
///
/// PATCH /api/v1/missions/:id
/// Body: UpdateMissionDto
pub async fn update_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateMissionDto>,
) -> Result<Json<MissionResponse>, ApiError> {
    dto.validate()?;

    let service = MissionService::new(state);
    let result = service.update_mission(id, dto).await?;

    Ok(Json(result))
}

/// 分配任务给机器人
///
/// POST /api/v1/missions/:id/assign
/// Body: AssignMissionDto
pub async fn assign_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(dto): Json<AssignMissionDto>,
) -> Result<Json<MissionResponse>, ApiError> {
    let service = MissionService::new(state);
    let result = service.assign_mission(id, dto.robot_id).await?;

    Ok(Json(result))
}

/// 删除任务
///
/// DELETE /api/v1/missions/:id
pub async fn delete_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let service = MissionService::new(state);
    service.delete_mission(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
