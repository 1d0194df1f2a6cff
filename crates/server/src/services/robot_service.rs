/// 机器人管理服务
/// 
/// 所有写操作在数据提交后才通知更新发布桥，通知本身不阻塞请求

use common::Result;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::robot::{CreateRobotDto, RobotResponse, RobotStatusUpdateDto, UpdateRobotDto};

pub struct RobotService {
    state: AppState,
}

impl RobotService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 获取机器人列表
    pub async fn list_robots(&self, skip: u64, limit: u64) -> Result<Vec<RobotResponse>> {
        let robots = self.state.robots().list(skip, limit).await?;
        Ok(robots.into_iter().map(RobotResponse::from).collect())
    }

    /// 获取单个机器人
    pub async fn get_robot(&self, id: Uuid) -> Result<RobotResponse> {
        let robot = self.state.robots().get(id).await?;
        Ok(RobotResponse::from(robot))
    }

    /// 注册机器人
    pub async fn create_robot(&self, dto: CreateRobotDto) -> Result<RobotResponse> {
        let robot = self.state.robots().create(dto).await?;
        self.state.bridge().publish_fleet_changed();
        Ok(RobotResponse::from(robot))
    }

    /// 更新机器人描述信息
    pub async fn update_robot(&self, id: Uuid, dto: UpdateRobotDto) -> Result<RobotResponse> {
        let robot = self.state.robots().update(id, dto).await?;

        let bridge = self.state.bridge();
        bridge.publish_robot(robot.snapshot());
        bridge.publish_fleet_changed();

        Ok(RobotResponse::from(robot))
    }

    /// 更新机器人状态与遥测
    pub async fn update_robot_status(
        &self,
        id: Uuid,
        dto: RobotStatusUpdateDto,
    ) -> Result<RobotResponse> {
        let robot = self.state.robots().update_status(id, dto).await?;

        let bridge = self.state.bridge();
        bridge.publish_robot(robot.snapshot());
        bridge.publish_fleet_changed();

        Ok(RobotResponse::from(robot))
    }

    /// 移除机器人
    pub async fn delete_robot(&self, id: Uuid) -> Result<()> {
        self.state.robots().delete(id).await?;
        self.state.bridge().publish_fleet_changed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RealtimeMetrics;
    use crate::store::memory::MemoryStore;
    use crate::ws::connection::{Connection, Frame};
    use crate::ws::{RealtimeHub, Topic};
    use common::{RobotStatus, RobotType};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let hub = RealtimeHub::new(
            RealtimeMetrics::new().unwrap(),
            CancellationToken::new(),
            Duration::from_secs(1),
        );
        (AppState::new(store.clone(), hub), store)
    }

    async fn subscribe(state: &AppState, topic: Topic) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Connection::new(tx));
        state.realtime().registry().register(&conn, topic).await;
        rx
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Frame>) -> serde_json::Value {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(Frame::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_update_publishes_committed_snapshot() {
        let (state, store) = state();
        let robot = store.seed("Atlas", "SN-001").await;
        let mut rx = subscribe(&state, Topic::Robot(robot.id)).await;

        let service = RobotService::new(state);
        let response = service
            .update_robot_status(
                robot.id,
                RobotStatusUpdateDto {
                    status: Some(RobotStatus::Active),
                    location_x: Some(12.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(response.status, RobotStatus::Active);

        let event = next_event(&mut rx).await;
        assert_eq!(event["event"], "status_update");
        assert_eq!(event["robot_id"], robot.id.to_string());
        assert_eq!(event["robot"]["status"], "active");
        assert_eq!(event["robot"]["location_x"], 12.5);
    }

    #[tokio::test]
    async fn test_failed_mutation_publishes_nothing() {
        let (state, _store) = state();
        let missing = Uuid::new_v4();
        let mut rx = subscribe(&state, Topic::Robot(missing)).await;

        let err = RobotService::new(state)
            .update_robot_status(missing, RobotStatusUpdateDto::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_and_delete_refresh_fleet_summary() {
        let (state, _store) = state();
        let mut fleet = subscribe(&state, Topic::Fleet).await;
        let service = RobotService::new(state);

        let created = service
            .create_robot(CreateRobotDto {
                name: "Bolt".to_string(),
                serial_number: "SN-100".to_string(),
                robot_type: RobotType::Drone,
                status: RobotStatus::Idle,
                firmware_version: None,
                description: None,
            })
            .await
            .unwrap();
        let event = next_event(&mut fleet).await;
        assert_eq!(event["event"], "fleet_update");
        assert_eq!(event["fleet_size"], 1);

        service.delete_robot(created.id).await.unwrap();
        assert_eq!(next_event(&mut fleet).await["fleet_size"], 0);
    }

    #[tokio::test]
    async fn test_rename_is_pushed_to_robot_subscribers() {
        let (state, store) = state();
        let robot = store.seed("Atlas", "SN-001").await;
        let mut rx = subscribe(&state, Topic::Robot(robot.id)).await;

        RobotService::new(state)
            .update_robot(
                robot.id,
                UpdateRobotDto {
                    name: Some("Atlas Prime".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 快照包含名称，改名也要推送给单机订阅者
        let event = next_event(&mut rx).await;
        assert_eq!(event["event"], "status_update");
        assert_eq!(event["robot"]["name"], "Atlas Prime");
        assert_eq!(event["robot"]["status"], "idle");
    }

    #[tokio::test]
    async fn test_duplicate_serial_number_is_rejected() {
        let (state, store) = state();
        store.seed("Atlas", "SN-001").await;

        let err = RobotService::new(state)
            .create_robot(CreateRobotDto {
                name: "Atlas II".to_string(),
                serial_number: "SN-001".to_string(),
                robot_type: RobotType::Amr,
                status: RobotStatus::Offline,
                firmware_version: None,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, common::Error::AlreadyExists(_)));
    }
}
