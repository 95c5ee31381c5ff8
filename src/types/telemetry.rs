//! 飞行器遥测快照

use nalgebra::Vector3;

/// 一帧遥测数据
///
/// 由 [`UavHardware::telemetry`](crate::hardware::UavHardware::telemetry)
/// 返回的一致性快照，connector 每个周期读取一次。
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    /// 位置（世界坐标系，m）
    pub position: Vector3<f64>,
    /// 速度（世界坐标系，m/s）
    pub velocity: Vector3<f64>,
    /// 姿态角 roll/pitch/yaw（rad）
    pub rpy: Vector3<f64>,
    /// 机体角速度（rad/s）
    pub omega: Vector3<f64>,
    /// 机体线加速度（比力，m/s²）
    pub linear_acceleration: Vector3<f64>,
    /// 电池电量百分比 [0, 100]
    pub battery_percent: f64,
    /// 电机是否解锁
    pub armed: bool,
    /// 飞手是否接管（SDK 指令通道被切断）
    pub pilot_override: bool,
    /// 飞控内部状态描述字符串
    pub vehicle_state: String,
    /// 整机质量（kg）
    pub mass: f64,
    /// 遥控器四通道，归一化 [-1, 1]（roll/pitch/yaw/thrust）
    pub rc_channels: [f64; 4],
    /// 时间戳（s，自硬件启动）
    pub timestamp_s: f64,
}

impl Telemetry {
    /// 离地高度（m）
    pub fn altitude(&self) -> f64 {
        self.position.z
    }

    /// 当前偏航角（rad）
    pub fn yaw(&self) -> f64 {
        self.rpy.z
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            rpy: Vector3::zeros(),
            omega: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            battery_percent: 100.0,
            armed: false,
            pilot_override: false,
            vehicle_state: String::new(),
            mass: 1.0,
            rc_channels: [0.0; 4],
            timestamp_s: 0.0,
        }
    }
}
