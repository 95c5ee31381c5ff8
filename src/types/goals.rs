//! 控制目标类型
//!
//! 每种 controller 以其中一种类型作为目标。目标类型都是小的
//! `Copy` 值类型，支持 serde（用于配置中的默认目标和日志回放）。

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 位置 + 偏航目标（世界坐标系，m / rad）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionYaw {
    /// x 坐标（m）
    pub x: f64,
    /// y 坐标（m）
    pub y: f64,
    /// z 坐标（m，向上为正）
    pub z: f64,
    /// 偏航角（rad）
    pub yaw: f64,
}

impl PositionYaw {
    /// 创建位置偏航目标
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw }
    }

    /// 位置分量
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// 速度 + 偏航目标（世界坐标系，m/s / rad）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityYaw {
    /// x 方向速度（m/s）
    pub x: f64,
    /// y 方向速度（m/s）
    pub y: f64,
    /// z 方向速度（m/s）
    pub z: f64,
    /// 偏航角（rad）
    pub yaw: f64,
}

impl VelocityYaw {
    /// 创建速度偏航目标
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw }
    }

    /// 速度分量
    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// 速度模长（m/s），用于目标守卫
    pub fn magnitude(&self) -> f64 {
        self.velocity().norm()
    }
}

/// 速度 + 偏航角速度（用于视觉伺服中的速度反馈）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityYawRate {
    /// x 方向速度（m/s）
    pub x: f64,
    /// y 方向速度（m/s）
    pub y: f64,
    /// z 方向速度（m/s）
    pub z: f64,
    /// 偏航角速度（rad/s）
    pub yaw_rate: f64,
}

impl VelocityYawRate {
    /// 创建速度偏航角速度
    pub fn new(x: f64, y: f64, z: f64, yaw_rate: f64) -> Self {
        Self { x, y, z, yaw_rate }
    }
}

/// 姿态角速度推力指令（发送给底层姿态环的原语）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RollPitchYawRateThrust {
    /// 滚转角（rad）
    pub roll: f64,
    /// 俯仰角（rad）
    pub pitch: f64,
    /// 偏航角速度（rad/s）
    pub yaw_rate: f64,
    /// 归一化推力指令（无量纲）
    pub thrust: f64,
}

/// 空目标（手动遥杆控制不需要外部目标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmptyGoal;

/// 遥杆四通道，归一化到 [-1, 1]
///
/// 通道顺序：roll、pitch、yaw、thrust。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Joystick(pub [f64; 4]);
