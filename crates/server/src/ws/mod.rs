/// WebSocket 模块
/// 
/// 机器人状态的实时订阅与推送：订阅注册表、连接会话、广播分发与更新发布桥

pub mod bridge;
pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod hub;
pub mod registry;
pub mod session;

pub use bridge::UpdateBridge;
pub use dispatcher::{BroadcastDispatcher, DispatchOutcome};
pub use handler::{handle_fleet_websocket, handle_robot_websocket};
pub use hub::RealtimeHub;
pub use registry::{SubscriptionRegistry, Topic};
