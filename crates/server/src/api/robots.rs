/// 机器人管理接口

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{default_limit, ApiError};
use crate::app_state::AppState;
use crate::db::models::robot::{CreateRobotDto, RobotResponse, RobotStatusUpdateDto, UpdateRobotDto};
use crate::services::RobotService;

/// 查询参数
#[derive(Debug, Deserialize)]
pub struct ListRobotsQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// 机器人路由
pub fn robot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_robots).post(create_robot))
        .route("/:id", get(get_robot).patch(update_robot).delete(delete_robot))
        .route("/:id/status", patch(update_robot_status))
}

/// 获取机器人列表
///
/// GET /api/v1/robots?skip=0&limit=100
pub async fn list_robots(
    State(state): State<AppState>,
    Query(query): Query<ListRobotsQuery>,
) -> Result<Json<Vec<RobotResponse>>, ApiError> {
    let service = RobotService::new(state);
    let result = service.list_robots(query.skip, query.limit).await?;

    Ok(Json(result))
}

/// 注册机器人
///
/// POST /api/v1/robots
/// Body: CreateRobotDto
pub async fn create_robot(
    State(state): State<AppState>,
    Json(dto): Json<CreateRobotDto>,
) -> Result<(StatusCode, Json<RobotResponse>), ApiError> {
    dto.validate()?;

    let service = RobotService::new(state);
    let result = service.create_robot(dto).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// 获取单个机器人
///
/// GET /api/v1/robots/:id
pub async fn get_robot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RobotResponse>, ApiError> {
    let service = RobotService::new(state);
    let result = service.get_robot(id).await?;

    Ok(Json(result))
}

/// 更新机器人
///
/// PATCH /api/v1/robots/:id
/// Body: UpdateRobotDto
pub async fn update_robot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateRobotDto>,
) -> Result<Json<RobotResponse>, ApiError> {
    dto.validate()?;

    let service = RobotService::new(state);
    let result = service.update_robot(id, dto).await?;

    Ok(Json(result))
}

/// 上报机器人状态与遥测
///
/// PATCH /api/v1/robots/:id/status
/// Body: RobotStatusUpdateDto
pub async fn update_robot_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(dto): Json<RobotStatusUpdateDto>,
) -> Result<Json<RobotResponse>, ApiError> {
    dto.validate()?;

    let service = RobotService::new(state);
    let result = service.update_robot_status(id, dto).await?;

    Ok(Json(result))
}

/// 删除机器人
///
/// DELETE /api/v1/robots/:id
pub async fn delete_robot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let service = RobotService::new(state);
    service.delete_robot(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
