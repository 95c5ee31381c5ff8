//! 内建速度控制器：目标直通飞控的制导速度原语

use crate::controllers::{Controller, wrap_angle};
use crate::types::VelocityYaw;

/// 内建速度控制器
pub struct BuiltInVelocityController {
    goal: VelocityYaw,
    velocity_tolerance: f64,
    yaw_tolerance: f64,
}

impl BuiltInVelocityController {
    /// 创建控制器，初始目标为零速
    pub fn new(velocity_tolerance: f64, yaw_tolerance: f64) -> Self {
        Self {
            goal: VelocityYaw::default(),
            velocity_tolerance,
            yaw_tolerance,
        }
    }
}

impl Controller for BuiltInVelocityController {
    type Sensor = VelocityYaw;
    type Goal = VelocityYaw;
    type Control = VelocityYaw;

    fn set_goal(&mut self, goal: VelocityYaw) {
        self.goal = goal;
    }

    fn goal(&self) -> VelocityYaw {
        self.goal
    }

    fn run(&mut self, _sensor: &VelocityYaw) -> VelocityYaw {
        self.goal
    }

    fn is_converged(&self, sensor: &VelocityYaw) -> bool {
        (sensor.x - self.goal.x).abs() <= self.velocity_tolerance
            && (sensor.y - self.goal.y).abs() <= self.velocity_tolerance
            && (sensor.z - self.goal.z).abs() <= self.velocity_tolerance
            && wrap_angle(sensor.yaw - self.goal.yaw).abs() <= self.yaw_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_round_trip_and_pass_through() {
        let mut c = BuiltInVelocityController::new(0.1, 0.1);
        let goal = VelocityYaw::new(0.5, -0.5, 0.2, 0.1);
        c.set_goal(goal);
        assert_eq!(c.goal(), goal);
        assert_eq!(c.run(&VelocityYaw::default()), goal);
    }

    #[test]
    fn test_convergence() {
        let mut c = BuiltInVelocityController::new(0.1, 0.1);
        c.set_goal(VelocityYaw::new(1.0, 0.0, 0.0, 0.0));
        assert!(c.is_converged(&VelocityYaw::new(0.95, 0.02, -0.03, 0.0)));
        assert!(!c.is_converged(&VelocityYaw::new(0.8, 0.0, 0.0, 0.0)));
    }
}
