//! 相对位姿视觉伺服控制器

use crate::config::VisualServoingConfig;
use crate::controllers::{Controller, wrap_angle};
use crate::types::{PositionYaw, RollPitchYawRateThrust, VelocityYawRate};
use nalgebra::Vector3;

/// 视觉伺服的传感器数据
///
/// 跟踪向量由外部位姿跟踪器给出；跟踪失效在 connector 层判定，
/// 到达控制器的数据总是有效的。
#[derive(Debug, Clone)]
pub struct VisualServoingSensorData {
    /// 目标在机体系下的相对位姿
    pub tracking: PositionYaw,
    /// 当前速度与偏航角速度
    pub velocity: VelocityYawRate,
    /// 当前推力增益估计
    pub thrust_gain: f64,
}

/// 相对位姿视觉伺服控制器
///
/// 把相对位姿误差转成期望加速度，再折算为姿态推力指令。目标是
/// 期望保持的相对位姿（如悬停在目标前方 2 m）。
pub struct RelativePoseVisualServoingController {
    config: VisualServoingConfig,
    gravity: f64,
    position_tolerance: f64,
    yaw_tolerance: f64,
    goal: PositionYaw,
}

impl RelativePoseVisualServoingController {
    /// 创建控制器
    pub fn new(
        config: VisualServoingConfig,
        gravity: f64,
        position_tolerance: f64,
        yaw_tolerance: f64,
    ) -> Self {
        Self {
            config,
            gravity,
            position_tolerance,
            yaw_tolerance,
            goal: PositionYaw::default(),
        }
    }

    fn pose_error(&self, sensor: &VisualServoingSensorData) -> (Vector3<f64>, f64) {
        let position_error = sensor.tracking.position() - self.goal.position();
        let yaw_error = wrap_angle(sensor.tracking.yaw - self.goal.yaw);
        (position_error, yaw_error)
    }
}

impl Controller for RelativePoseVisualServoingController {
    type Sensor = VisualServoingSensorData;
    type Goal = PositionYaw;
    type Control = RollPitchYawRateThrust;

    fn set_goal(&mut self, goal: PositionYaw) {
        self.goal = goal;
    }

    fn goal(&self) -> PositionYaw {
        self.goal
    }

    fn run(&mut self, sensor: &VisualServoingSensorData) -> RollPitchYawRateThrust {
        let (position_error, yaw_error) = self.pose_error(sensor);
        let velocity = Vector3::new(sensor.velocity.x, sensor.velocity.y, sensor.velocity.z);

        // 误差在机体系，速度阻尼后直接映射到姿态
        let acceleration = self.config.position_gain * position_error - velocity;
        let roll = (-acceleration.y / self.gravity).clamp(-0.785, 0.785);
        let pitch = (acceleration.x / self.gravity).clamp(-0.785, 0.785);

        let gain = sensor.thrust_gain.max(f64::EPSILON);
        let thrust = (self.gravity + acceleration.z) / gain;

        RollPitchYawRateThrust {
            roll,
            pitch,
            yaw_rate: self.config.yaw_gain * yaw_error,
            thrust: thrust.max(0.0),
        }
    }

    fn is_converged(&self, sensor: &VisualServoingSensorData) -> bool {
        let (position_error, yaw_error) = self.pose_error(sensor);
        position_error.amax() <= self.position_tolerance
            && yaw_error.abs() <= self.yaw_tolerance
    }
}
