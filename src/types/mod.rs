//! 值类型：目标、状态、遥测、参考轨迹

mod goals;
mod status;
mod telemetry;
mod trajectory;

pub use goals::{
    EmptyGoal, Joystick, PositionYaw, RollPitchYawRateThrust, VelocityYaw, VelocityYawRate,
};
pub use status::{ControllerStatus, HardwareGroup};
pub use telemetry::Telemetry;
pub use trajectory::{MPC_STATE_SIZE, ReferenceTrajectory, WaypointTrajectory};
