/// 任务状态与优先级

use serde::{Deserialize, Serialize};

/// 任务执行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Pending => "pending",
            MissionStatus::Assigned => "assigned",
            MissionStatus::InProgress => "in_progress",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
            MissionStatus::Cancelled => "cancelled",
        }
    }

    /// 只有尚未开始执行的任务可以分配机器人
    pub fn is_assignable(&self) -> bool {
        matches!(self, MissionStatus::Pending | MissionStatus::Assigned)
    }

    /// 任务已经结束（成功或失败）
    pub fn is_finished(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Failed)
    }
}

impl From<&str> for MissionStatus {
    fn from(s: &str) -> Self {
        match s {
            "assigned" => MissionStatus::Assigned,
            "in_progress" => MissionStatus::InProgress,
            "completed" => MissionStatus::Completed,
            "failed" => MissionStatus::Failed,
            "cancelled" => MissionStatus::Cancelled,
            _ => MissionStatus::Pending,
        }
    }
}

impl Default for MissionStatus {
    fn default() -> Self {
        MissionStatus::Pending
    }
}

/// 任务优先级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissionPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl MissionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionPriority::Low => "low",
            MissionPriority::Normal => "normal",
            MissionPriority::High => "high",
            MissionPriority::Critical => "critical",
        }
    }
}

impl From<&str> for MissionPriority {
    fn from(s: &str) -> Self {
        match s {
            "low" => MissionPriority::Low,
            "high" => MissionPriority::High,
            "critical" => MissionPriority::Critical,
            _ => MissionPriority::Normal,
        }
    }
}

impl Default for MissionPriority {
    fn default() -> Self {
        MissionPriority::Normal
    }
}
