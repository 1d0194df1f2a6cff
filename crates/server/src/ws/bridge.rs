/// 更新发布桥
/// 
/// CRUD 层在数据提交之后调用。调用只是把事件放入无界队列，立即返回，
/// 不等待分发完成；单个后台任务按入队顺序分发，保证同一连接上的事件顺序与提交顺序一致

use std::sync::Arc;

use common::{RobotSnapshot, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::BroadcastDispatcher;
use super::registry::Topic;
use crate::store::RobotReader;

#[derive(Debug)]
enum BridgeEvent {
    /// 机器人状态已提交
    RobotChanged(RobotSnapshot),
    /// 车队组成或摘要发生变化
    FleetChanged,
}

#[derive(Clone)]
pub struct UpdateBridge {
    sender: mpsc::UnboundedSender<BridgeEvent>,
}

impl UpdateBridge {
    /// 启动后台分发任务，关闭信号触发后退出
    pub fn spawn(
        dispatcher: BroadcastDispatcher,
        reader: Arc<dyn RobotReader>,
        shutdown: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(receiver, dispatcher, reader, shutdown));
        Self { sender }
    }

    /// 发布机器人状态更新
    pub fn publish_robot(&self, snapshot: RobotSnapshot) {
        let robot_id = snapshot.id;
        if self.sender.send(BridgeEvent::RobotChanged(snapshot)).is_err() {
            debug!("发布桥已停止，丢弃机器人 {} 的更新", robot_id);
        }
    }

    /// 通知车队摘要需要刷新
    pub fn publish_fleet_changed(&self) {
        if self.sender.send(BridgeEvent::FleetChanged).is_err() {
            debug!("发布桥已停止，丢弃车队更新");
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<BridgeEvent>,
    dispatcher: BroadcastDispatcher,
    reader: Arc<dyn RobotReader>,
    shutdown: CancellationToken,
) {
    info!("✅ 更新发布任务已启动");

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = receiver.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            BridgeEvent::RobotChanged(snapshot) => {
                let topic = Topic::Robot(snapshot.id);
                dispatcher
                    .dispatch(&topic, &ServerEvent::status_update(snapshot))
                    .await;
            }
            BridgeEvent::FleetChanged => {
                // 没有车队订阅者时不读取数据
                if !dispatcher.has_subscribers(&Topic::Fleet).await {
                    continue;
                }
                match reader.list_robots().await {
                    Ok(robots) => {
                        dispatcher
                            .dispatch(&Topic::Fleet, &ServerEvent::fleet_update(&robots))
                            .await;
                    }
                    Err(e) => warn!("读取车队摘要失败: {}", e),
                }
            }
        }
    }

    info!("更新发布任务已停止");
}
