//! 遥杆速度控制器
//!
//! 把遥杆通道映射成速度期望，用外部测速反馈做速度闭环：误差经
//! 比例增益得到期望加速度，再按当前偏航折算成滚转 / 俯仰角，
//! 推力用在线估计的推力增益换算。

use crate::config::JoystickVelocityConfig;
use crate::controllers::Controller;
use crate::types::{EmptyGoal, Joystick, RollPitchYawRateThrust, VelocityYawRate};

/// 倾角指令上限（rad）
const MAX_TILT: f64 = 0.785;

/// 遥杆速度控制器的传感器数据
#[derive(Debug, Clone)]
pub struct JoystickVelocitySensorData {
    /// 遥杆四通道
    pub joystick: Joystick,
    /// 外部测速反馈
    pub velocity: VelocityYawRate,
    /// 当前偏航角（rad）
    pub yaw: f64,
    /// 当前推力增益估计
    pub thrust_gain: f64,
}

/// 遥杆速度控制器
///
/// 通道 0/1 映射水平速度，通道 3 映射垂直速度，通道 2 直通偏航
/// 角速度。没有外部目标（[`EmptyGoal`]），也永远不会"收敛"。
pub struct JoystickVelocityController {
    config: JoystickVelocityConfig,
    gravity: f64,
}

impl JoystickVelocityController {
    /// 创建控制器
    pub fn new(config: JoystickVelocityConfig, gravity: f64) -> Self {
        Self { config, gravity }
    }
}

impl Controller for JoystickVelocityController {
    type Sensor = JoystickVelocitySensorData;
    type Goal = EmptyGoal;
    type Control = RollPitchYawRateThrust;

    fn set_goal(&mut self, _goal: EmptyGoal) {}

    fn goal(&self) -> EmptyGoal {
        EmptyGoal
    }

    fn run(&mut self, sensor: &JoystickVelocitySensorData) -> RollPitchYawRateThrust {
        let ch = sensor.joystick.0.map(|c| c.clamp(-1.0, 1.0));
        let desired = [
            ch[0] * self.config.max_velocity,
            ch[1] * self.config.max_velocity,
            ch[3] * self.config.max_velocity,
        ];
        let measured = [sensor.velocity.x, sensor.velocity.y, sensor.velocity.z];

        let kv = self.config.velocity_gain;
        let ax = kv * (desired[0] - measured[0]);
        let ay = kv * (desired[1] - measured[1]);
        let az = kv * (desired[2] - measured[2]);

        // 期望水平加速度按当前偏航旋转到机体系
        let yaw = sensor.yaw;
        let roll = ((ax * yaw.sin() - ay * yaw.cos()) / self.gravity).clamp(-MAX_TILT, MAX_TILT);
        let pitch = ((ax * yaw.cos() + ay * yaw.sin()) / self.gravity).clamp(-MAX_TILT, MAX_TILT);

        let gain = sensor.thrust_gain.max(f64::EPSILON);
        let projection = (roll.cos() * pitch.cos()).max(0.1);
        let thrust = (self.gravity + az) / (gain * projection);

        RollPitchYawRateThrust {
            roll,
            pitch,
            yaw_rate: ch[2] * self.config.max_yaw_rate,
            thrust: thrust.max(0.0),
        }
    }

    fn is_converged(&self, _sensor: &JoystickVelocitySensorData) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> JoystickVelocityController {
        JoystickVelocityController::new(JoystickVelocityConfig::default(), 9.81)
    }

    fn sensor(channels: [f64; 4], velocity: VelocityYawRate) -> JoystickVelocitySensorData {
        JoystickVelocitySensorData {
            joystick: Joystick(channels),
            velocity,
            yaw: 0.0,
            thrust_gain: 0.16,
        }
    }

    /// 杆居中、零速时输出悬停指令
    #[test]
    fn test_center_sticks_hover() {
        let mut c = controller();
        let out = c.run(&sensor([0.0; 4], VelocityYawRate::default()));
        assert!(out.roll.abs() < 1e-12);
        assert!(out.pitch.abs() < 1e-12);
        assert!(out.yaw_rate.abs() < 1e-12);
        assert!((out.thrust - 9.81 / 0.16).abs() < 1e-6);
    }

    /// 前推杆、尚无前向速度时产生正俯仰
    #[test]
    fn test_forward_stick_pitches_forward() {
        let mut c = controller();
        let out = c.run(&sensor([1.0, 0.0, 0.0, 0.0], VelocityYawRate::default()));
        assert!(out.pitch > 0.0);
        assert!(out.pitch <= MAX_TILT);
        assert!(out.roll.abs() < 1e-12);
    }

    /// 实测速度追上期望后倾角回零
    #[test]
    fn test_tracked_velocity_levels_out() {
        let mut c = controller();
        let out = c.run(&sensor(
            [0.5, 0.0, 0.0, 0.0],
            VelocityYawRate::new(0.5, 0.0, 0.0, 0.0),
        ));
        assert!(out.pitch.abs() < 1e-12);
        assert!(out.roll.abs() < 1e-12);
    }

    /// 偏航杆直通偏航角速度，越界通道被钳制
    #[test]
    fn test_yaw_stick_passthrough_and_clamp() {
        let mut c = controller();
        let out = c.run(&sensor([0.0, 0.0, 2.0, 0.0], VelocityYawRate::default()));
        assert!((out.yaw_rate - 1.5708).abs() < 1e-12);
    }

    #[test]
    fn test_never_converges() {
        let c = controller();
        assert!(!c.is_converged(&sensor([0.0; 4], VelocityYawRate::default())));
    }
}
