/// RoboFleet - 公共库
/// 
/// 提供 Server 与客户端共享的领域模型、实时推送协议和错误类型

pub mod errors;
pub mod models;
pub mod realtime;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::{
    FleetRobotSummary, MissionPriority, MissionStatus, RobotSnapshot, RobotStatus, RobotType,
};
pub use realtime::{ClientMessage, ControlMessage, ServerEvent, close_code};
