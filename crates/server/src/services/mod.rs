pub mod mission_service;
pub mod robot_service;

pub use mission_service::MissionService;
pub use robot_service::RobotService;
