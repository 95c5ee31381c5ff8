//! RPYT 轨迹跟踪控制器
//!
//! 跟踪时间参数化参考轨迹：位置 / 速度误差经比例增益得到期望
//! 加速度，再按偏航旋转折算成滚转 / 俯仰角，推力用在线估计的
//! 推力增益换算成归一化指令。

use crate::config::MpcConnectorConfig;
use crate::controllers::{Controller, wrap_angle};
use crate::types::{PositionYaw, ReferenceTrajectory, RollPitchYawRateThrust, WaypointTrajectory};
use nalgebra::{DVector, Vector3};
use std::sync::Arc;

/// 倾角指令上限（rad）
const MAX_TILT: f64 = 0.785;

/// 轨迹跟踪控制器的传感器数据
///
/// 由 MPC connector 的状态估计产出。
#[derive(Debug, Clone)]
pub struct MpcSensorData {
    /// 15 维状态估计（布局见 [`crate::types::MPC_STATE_SIZE`]）
    pub state: DVector<f64>,
    /// 当前推力增益估计
    pub thrust_gain: f64,
    /// 距目标设置时刻的时间（s）
    pub t: f64,
}

/// RPYT 轨迹跟踪控制器
pub struct RpytReferenceController {
    config: MpcConnectorConfig,
    gravity: f64,
    position_tolerance: f64,
    velocity_tolerance: f64,
    goal: Arc<dyn ReferenceTrajectory>,
}

impl RpytReferenceController {
    /// 创建控制器，初始目标为原点定点
    pub fn new(
        config: MpcConnectorConfig,
        gravity: f64,
        position_tolerance: f64,
        velocity_tolerance: f64,
    ) -> Self {
        Self {
            config,
            gravity,
            position_tolerance,
            velocity_tolerance,
            goal: Arc::new(WaypointTrajectory::new(PositionYaw::default())),
        }
    }

    fn errors(&self, sensor: &MpcSensorData) -> (Vector3<f64>, Vector3<f64>, f64) {
        let reference = self.goal.goal(sensor.t);
        let position_error = Vector3::new(
            reference[0] - sensor.state[0],
            reference[1] - sensor.state[1],
            reference[2] - sensor.state[2],
        );
        let velocity_error = Vector3::new(
            reference[3] - sensor.state[3],
            reference[4] - sensor.state[4],
            reference[5] - sensor.state[5],
        );
        let yaw_error = wrap_angle(reference[8] - sensor.state[8]);
        (position_error, velocity_error, yaw_error)
    }
}

impl Controller for RpytReferenceController {
    type Sensor = MpcSensorData;
    type Goal = Arc<dyn ReferenceTrajectory>;
    type Control = RollPitchYawRateThrust;

    fn set_goal(&mut self, goal: Arc<dyn ReferenceTrajectory>) {
        self.goal = goal;
    }

    fn goal(&self) -> Arc<dyn ReferenceTrajectory> {
        Arc::clone(&self.goal)
    }

    fn run(&mut self, sensor: &MpcSensorData) -> RollPitchYawRateThrust {
        let (position_error, velocity_error, yaw_error) = self.errors(sensor);
        let acceleration = self.config.position_gain * position_error
            + self.config.velocity_gain * velocity_error;

        // 期望水平加速度按当前偏航旋转到机体系
        let yaw = sensor.state[8];
        let roll = ((acceleration.x * yaw.sin() - acceleration.y * yaw.cos()) / self.gravity)
            .clamp(-MAX_TILT, MAX_TILT);
        let pitch = ((acceleration.x * yaw.cos() + acceleration.y * yaw.sin()) / self.gravity)
            .clamp(-MAX_TILT, MAX_TILT);

        // 推力按增益估计和倾角投影换算
        let gain = sensor.thrust_gain.max(f64::EPSILON);
        let projection = (roll.cos() * pitch.cos()).max(0.1);
        let thrust = (self.gravity + acceleration.z) / (gain * projection);

        RollPitchYawRateThrust {
            roll,
            pitch,
            yaw_rate: self.config.yaw_gain * yaw_error,
            thrust: thrust.max(0.0),
        }
    }

    fn is_converged(&self, sensor: &MpcSensorData) -> bool {
        let (position_error, velocity_error, _) = self.errors(sensor);
        position_error.amax() <= self.position_tolerance
            && velocity_error.amax() <= self.velocity_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MPC_STATE_SIZE;

    fn controller() -> RpytReferenceController {
        RpytReferenceController::new(MpcConnectorConfig::default(), 9.81, 0.1, 0.1)
    }

    fn sensor_at(position: [f64; 3], yaw: f64) -> MpcSensorData {
        let mut state = DVector::zeros(MPC_STATE_SIZE);
        state[0] = position[0];
        state[1] = position[1];
        state[2] = position[2];
        state[8] = yaw;
        MpcSensorData {
            state,
            thrust_gain: 0.16,
            t: 0.0,
        }
    }

    /// 到点、零速时输出悬停指令
    #[test]
    fn test_hover_at_goal() {
        let mut c = controller();
        c.set_goal(Arc::new(WaypointTrajectory::new(PositionYaw::new(
            1.0, 1.0, 1.0, 0.0,
        ))));
        let out = c.run(&sensor_at([1.0, 1.0, 1.0], 0.0));
        assert!(out.roll.abs() < 1e-9);
        assert!(out.pitch.abs() < 1e-9);
        assert!(out.yaw_rate.abs() < 1e-9);
        // 悬停推力 = g / kt
        assert!((out.thrust - 9.81 / 0.16).abs() < 1e-6);
    }

    /// 前方目标产生正俯仰，倾角被钳制
    #[test]
    fn test_forward_error_pitches_and_clamps() {
        let mut c = controller();
        c.set_goal(Arc::new(WaypointTrajectory::new(PositionYaw::new(
            100.0, 0.0, 1.0, 0.0,
        ))));
        let out = c.run(&sensor_at([0.0, 0.0, 1.0], 0.0));
        assert!(out.pitch > 0.0);
        assert!(out.pitch <= MAX_TILT);
        assert!(out.roll.abs() < 1e-9);
    }

    #[test]
    fn test_convergence_window() {
        let mut c = controller();
        c.set_goal(Arc::new(WaypointTrajectory::new(PositionYaw::new(
            1.0, 1.0, 1.0, 0.0,
        ))));
        assert!(c.is_converged(&sensor_at([1.05, 0.95, 1.0], 0.0)));
        assert!(!c.is_converged(&sensor_at([1.5, 1.0, 1.0], 0.0)));
    }

    #[test]
    fn test_goal_round_trip() {
        let mut c = controller();
        let goal: Arc<dyn ReferenceTrajectory> =
            Arc::new(WaypointTrajectory::new(PositionYaw::new(2.0, 0.0, 3.0, 0.1)));
        c.set_goal(Arc::clone(&goal));
        let got = c.goal();
        assert_eq!(got.goal(0.0), goal.goal(0.0));
    }
}
