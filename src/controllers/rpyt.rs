//! 手动遥杆到姿态指令的映射

use crate::config::ManualRpytConfig;
use crate::controllers::Controller;
use crate::types::{EmptyGoal, Joystick, RollPitchYawRateThrust};

/// 手动 RPYT 控制器
///
/// 把遥控器四通道线性映射到姿态角 / 偏航角速度 / 推力指令。
/// 没有外部目标（[`EmptyGoal`]），也永远不会"收敛"。
pub struct ManualRpytController {
    config: ManualRpytConfig,
}

impl ManualRpytController {
    /// 创建控制器
    pub fn new(config: ManualRpytConfig) -> Self {
        Self { config }
    }
}

impl Controller for ManualRpytController {
    type Sensor = Joystick;
    type Goal = EmptyGoal;
    type Control = RollPitchYawRateThrust;

    fn set_goal(&mut self, _goal: EmptyGoal) {}

    fn goal(&self) -> EmptyGoal {
        EmptyGoal
    }

    fn run(&mut self, sensor: &Joystick) -> RollPitchYawRateThrust {
        // 硬件驱动理论上已归一化，仍钳制以防越界读数
        let ch = sensor.0.map(|c| c.clamp(-1.0, 1.0));
        RollPitchYawRateThrust {
            roll: ch[0] * self.config.max_tilt,
            pitch: ch[1] * self.config.max_tilt,
            yaw_rate: ch[2] * self.config.max_yaw_rate,
            thrust: self.config.min_thrust
                + (ch[3] + 1.0) / 2.0 * (self.config.max_thrust - self.config.min_thrust),
        }
    }

    fn is_converged(&self, _sensor: &Joystick) -> bool {
        false
    }
}
