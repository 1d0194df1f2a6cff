/// 应用全局状态

use std::sync::Arc;

use crate::store::{MissionRepository, RobotReader, RobotRepository};
use crate::ws::{RealtimeHub, UpdateBridge};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 机器人仓储 - CRUD 层使用
    robots: Arc<dyn RobotRepository>,
    /// 任务仓储
    missions: Arc<dyn MissionRepository>,
    /// 同一存储的只读视图 - 实时推送核心使用
    reader: Arc<dyn RobotReader>,
    /// 实时推送中枢
    realtime: RealtimeHub,
    /// 提交后发布更新的桥
    bridge: UpdateBridge,
}

impl AppState {
    /// 创建应用状态并启动更新发布任务
    pub fn new<S>(store: Arc<S>, realtime: RealtimeHub) -> Self
    where
        S: RobotRepository + MissionRepository + 'static,
    {
        let reader: Arc<dyn RobotReader> = store.clone();
        let missions: Arc<dyn MissionRepository> = store.clone();
        let bridge = UpdateBridge::spawn(
            realtime.dispatcher().clone(),
            reader.clone(),
            realtime.shutdown().clone(),
        );

        Self {
            robots: store,
            missions,
            reader,
            realtime,
            bridge,
        }
    }

    /// 获取机器人仓储
    pub fn robots(&self) -> Arc<dyn RobotRepository> {
        self.robots.clone()
    }

    /// 获取任务仓储
    pub fn missions(&self) -> Arc<dyn MissionRepository> {
        self.missions.clone()
    }

    /// 获取只读存储
    pub fn reader(&self) -> Arc<dyn RobotReader> {
        self.reader.clone()
    }

    /// 获取实时推送中枢
    pub fn realtime(&self) -> RealtimeHub {
        self.realtime.clone()
    }

    /// 获取更新发布桥
    pub fn bridge(&self) -> &UpdateBridge {
        &self.bridge
    }
}
