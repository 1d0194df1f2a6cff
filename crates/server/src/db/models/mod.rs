pub mod mission;
pub mod robot;
