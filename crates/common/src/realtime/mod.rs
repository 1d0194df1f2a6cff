/// 实时推送协议
/// 
/// 定义机器人状态订阅通道上的入站/出站消息以及关闭码

pub mod message;

pub use message::{ClientMessage, ControlMessage, ServerEvent};

/// WebSocket 关闭码
pub mod close_code {
    /// 正常关闭
    pub const NORMAL: u16 = 1000;
    /// 服务器关闭
    pub const GOING_AWAY: u16 = 1001;
    /// 服务器内部错误（握手时数据读取失败）
    pub const INTERNAL_ERROR: u16 = 1011;
    /// 订阅的机器人不存在
    pub const ROBOT_NOT_FOUND: u16 = 4004;
}
