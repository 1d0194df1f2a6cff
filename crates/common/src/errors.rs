use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("数据库错误: {0}")]
    Database(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("资源已存在: {0}")]
    AlreadyExists(String),

    #[error("无效参数: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// 机器人不存在
    pub fn robot_not_found(robot_id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("机器人不存在: {}", robot_id))
    }

    /// 任务不存在
    pub fn mission_not_found(mission_id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("任务不存在: {}", mission_id))
    }

    /// 是否为资源未找到错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
