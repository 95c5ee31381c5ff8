//! 内建位置控制器：目标直通飞控的航点原语

use crate::controllers::{Controller, wrap_angle};
use crate::types::PositionYaw;

/// 内建位置控制器
///
/// 飞控自带航点跟踪，控制律退化为目标直通；收敛判断逐轴比较
/// 当前位姿与目标。
pub struct BuiltInPositionController {
    goal: PositionYaw,
    position_tolerance: f64,
    yaw_tolerance: f64,
}

impl BuiltInPositionController {
    /// 创建控制器，初始目标为原点
    pub fn new(position_tolerance: f64, yaw_tolerance: f64) -> Self {
        Self {
            goal: PositionYaw::default(),
            position_tolerance,
            yaw_tolerance,
        }
    }
}

impl Controller for BuiltInPositionController {
    type Sensor = PositionYaw;
    type Goal = PositionYaw;
    type Control = PositionYaw;

    fn set_goal(&mut self, goal: PositionYaw) {
        self.goal = goal;
    }

    fn goal(&self) -> PositionYaw {
        self.goal
    }

    fn run(&mut self, _sensor: &PositionYaw) -> PositionYaw {
        self.goal
    }

    fn is_converged(&self, sensor: &PositionYaw) -> bool {
        (sensor.x - self.goal.x).abs() <= self.position_tolerance
            && (sensor.y - self.goal.y).abs() <= self.position_tolerance
            && (sensor.z - self.goal.z).abs() <= self.position_tolerance
            && wrap_angle(sensor.yaw - self.goal.yaw).abs() <= self.yaw_tolerance
    }
}
