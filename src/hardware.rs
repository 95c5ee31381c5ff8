//! 飞行器硬件抽象
//!
//! [`UavHardware`] 是整个 crate 与底层飞控驱动之间唯一的接缝。
//! 真实部署时由外部驱动适配实现；测试和仿真使用
//! [`QuadSimulator`](crate::sim::QuadSimulator)。

use crate::error::UavError;
use crate::types::{RollPitchYawRateThrust, Telemetry};
use nalgebra::Vector3;

/// 飞行器硬件端点
///
/// 实现必须线程安全：遥测读取与指令下发会来自不同线程。
pub trait UavHardware: Send + Sync {
    /// 解锁并起飞到默认高度
    fn takeoff(&self) -> Result<(), UavError>;

    /// 降落并上锁
    fn land(&self) -> Result<(), UavError>;

    /// 当前遥测快照
    fn telemetry(&self) -> Telemetry;

    /// 下发航点指令（位置 + 偏航）
    fn send_waypoint(&self, position: Vector3<f64>, yaw: f64) -> Result<(), UavError>;

    /// 下发制导速度指令（速度 + 偏航）
    fn send_velocity(&self, velocity: Vector3<f64>, yaw: f64) -> Result<(), UavError>;

    /// 下发姿态角速度推力指令
    fn send_attitude_rate_thrust(&self, command: RollPitchYawRateThrust) -> Result<(), UavError>;

    /// 切换 SDK 指令通道
    ///
    /// `false` 表示飞手接管，之后的自主指令被硬件忽略。
    fn set_flow_control(&self, enabled: bool) -> Result<(), UavError>;
}
