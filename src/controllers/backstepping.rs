//! 四旋翼反步控制律
//!
//! 推力作为二阶动态状态处理：控制律输出推力的二阶导和机体力矩，
//! connector 负责把它们积分成可下发的姿态推力指令。

use crate::config::BacksteppingConfig;
use crate::controllers::{Controller, wrap_angle};
use crate::types::{PositionYaw, ReferenceTrajectory, WaypointTrajectory};
use nalgebra::Vector3;
use std::sync::Arc;

/// 反步控制律的传感器数据
#[derive(Debug, Clone)]
pub struct BacksteppingSensorData {
    /// 距目标设置时刻的时间（s）
    pub t: f64,
    /// 位置（m）
    pub position: Vector3<f64>,
    /// 速度（m/s）
    pub velocity: Vector3<f64>,
    /// 姿态角（rad）
    pub rpy: Vector3<f64>,
    /// 机体角速度（rad/s）
    pub omega: Vector3<f64>,
    /// 当前推力状态（N，connector 内部积分值）
    pub thrust: f64,
    /// 推力一阶导（N/s）
    pub thrust_dot: f64,
}

/// 反步控制律输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacksteppingControl {
    /// 推力二阶导（N/s²）
    pub thrust_ddot: f64,
    /// 机体力矩（N·m）
    pub torque: Vector3<f64>,
}

/// 四旋翼反步控制器
pub struct QrotorBacksteppingController {
    config: BacksteppingConfig,
    position_tolerance: f64,
    velocity_tolerance: f64,
    goal: Arc<dyn ReferenceTrajectory>,
}

impl QrotorBacksteppingController {
    /// 创建控制器，初始目标为原点定点
    pub fn new(
        config: BacksteppingConfig,
        position_tolerance: f64,
        velocity_tolerance: f64,
    ) -> Self {
        Self {
            config,
            position_tolerance,
            velocity_tolerance,
            goal: Arc::new(WaypointTrajectory::new(PositionYaw::default())),
        }
    }

    fn reference_errors(&self, sensor: &BacksteppingSensorData) -> (Vector3<f64>, Vector3<f64>, f64) {
        let reference = self.goal.goal(sensor.t);
        let position_error = Vector3::new(
            sensor.position.x - reference[0],
            sensor.position.y - reference[1],
            sensor.position.z - reference[2],
        );
        let velocity_error = Vector3::new(
            sensor.velocity.x - reference[3],
            sensor.velocity.y - reference[4],
            sensor.velocity.z - reference[5],
        );
        (position_error, velocity_error, reference[8])
    }
}

impl Controller for QrotorBacksteppingController {
    type Sensor = BacksteppingSensorData;
    type Goal = Arc<dyn ReferenceTrajectory>;
    type Control = BacksteppingControl;

    fn set_goal(&mut self, goal: Arc<dyn ReferenceTrajectory>) {
        self.goal = goal;
    }

    fn goal(&self) -> Arc<dyn ReferenceTrajectory> {
        Arc::clone(&self.goal)
    }

    fn run(&mut self, sensor: &BacksteppingSensorData) -> BacksteppingControl {
        let cfg = &self.config;
        let (position_error, velocity_error, yaw_desired) = self.reference_errors(sensor);

        // 期望加速度（含重力补偿）
        let acceleration =
            -cfg.position_gain * position_error - cfg.velocity_gain * velocity_error;

        // 垂向通道：期望推力及其二阶动态
        let projection = (sensor.rpy.x.cos() * sensor.rpy.y.cos()).max(0.1);
        let thrust_desired = cfg.mass * (cfg.gravity + acceleration.z) / projection;
        let thrust_ddot = -cfg.position_gain * (sensor.thrust - thrust_desired)
            - cfg.velocity_gain * sensor.thrust_dot;

        // 水平通道折算成期望滚转 / 俯仰
        let yaw = sensor.rpy.z;
        let roll_desired = ((acceleration.x * yaw.sin() - acceleration.y * yaw.cos())
            / cfg.gravity)
            .clamp(cfg.lower_bounds[0], cfg.upper_bounds[0]);
        let pitch_desired = ((acceleration.x * yaw.cos() + acceleration.y * yaw.sin())
            / cfg.gravity)
            .clamp(cfg.lower_bounds[1], cfg.upper_bounds[1]);

        let attitude_error = Vector3::new(
            wrap_angle(sensor.rpy.x - roll_desired),
            wrap_angle(sensor.rpy.y - pitch_desired),
            wrap_angle(sensor.rpy.z - yaw_desired),
        );

        // 刚体姿态动力学：τ = J·ω̇_des + ω × Jω
        let inertia = Vector3::from(cfg.inertia);
        let omega_dot_desired =
            -cfg.attitude_gain * attitude_error - cfg.omega_gain * sensor.omega;
        let angular_momentum = inertia.component_mul(&sensor.omega);
        let torque =
            inertia.component_mul(&omega_dot_desired) + sensor.omega.cross(&angular_momentum);

        BacksteppingControl { thrust_ddot, torque }
    }

    fn is_converged(&self, sensor: &BacksteppingSensorData) -> bool {
        let (position_error, velocity_error, _) = self.reference_errors(sensor);
        position_error.amax() <= self.position_tolerance
            && velocity_error.amax() <= self.velocity_tolerance
    }
}
