//! # 控制策略
//!
//! 纯控制律：从传感器数据和目标计算控制量，不接触硬件、不做 IO。
//! 与硬件的耦合全部放在 [`connectors`](crate::connectors) 层。
//!
//! 控制器集合是封闭的，构造期选定：内建位置 / 速度（直通飞控
//! 原语）、手动遥杆映射、遥杆速度闭环、RPYT 轨迹跟踪、反步推力
//! 动力学、相对位姿视觉伺服。

mod backstepping;
mod joystick_velocity;
mod position;
mod reference;
mod rpyt;
mod velocity;
mod visual_servoing;

pub use backstepping::{BacksteppingControl, BacksteppingSensorData, QrotorBacksteppingController};
pub use joystick_velocity::{JoystickVelocityController, JoystickVelocitySensorData};
pub use position::BuiltInPositionController;
pub use reference::{MpcSensorData, RpytReferenceController};
pub use rpyt::ManualRpytController;
pub use velocity::BuiltInVelocityController;
pub use visual_servoing::{RelativePoseVisualServoingController, VisualServoingSensorData};

/// 控制策略
///
/// `run` 以最近一次 `set_goal` 的目标为基准计算控制量；
/// `is_converged` 用同一帧传感器数据判断是否已达到目标容差。
pub trait Controller: Send {
    /// 策略需要的传感器数据
    type Sensor;
    /// 目标类型
    type Goal: Clone;
    /// 控制输出
    type Control;

    /// 替换当前目标
    fn set_goal(&mut self, goal: Self::Goal);

    /// 当前目标
    fn goal(&self) -> Self::Goal;

    /// 计算一拍控制量
    fn run(&mut self, sensor: &Self::Sensor) -> Self::Control;

    /// 是否已收敛到目标容差内
    fn is_converged(&self, sensor: &Self::Sensor) -> bool;
}

/// 角度差规整到 (-π, π]
pub(crate) fn wrap_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut a = angle % two_pi;
    if a > std::f64::consts::PI {
        a -= two_pi;
    } else if a <= -std::f64::consts::PI {
        a += two_pi;
    }
    a
}
