//! 参考轨迹接口
//!
//! 轨迹以时间参数化，`at_time(t)` 返回 t 时刻的参考状态和前馈控制。
//! 状态向量采用与 MPC connector 一致的 15 维布局：
//!
//! ```text
//! [x y z vx vy vz r p y rdot pdot ydot rd pd yd]
//!  0..3  3..6   6..9   9..12        12..15
//! ```

use crate::types::PositionYaw;
use nalgebra::DVector;

/// 参考状态向量维度
pub const MPC_STATE_SIZE: usize = 15;

/// 时间参数化参考轨迹
pub trait ReferenceTrajectory: Send + Sync {
    /// t 时刻（相对目标设置时刻，s）的参考状态和前馈控制
    fn at_time(&self, t: f64) -> (DVector<f64>, DVector<f64>);

    /// t 时刻的目标状态（默认取 `at_time` 的状态分量）
    fn goal(&self, t: f64) -> DVector<f64> {
        self.at_time(t).0
    }
}

/// 定点轨迹：常值参考状态、零前馈
///
/// 由位置偏航目标构造，是轨迹跟踪 connector 最常用的目标形式。
#[derive(Debug, Clone)]
pub struct WaypointTrajectory {
    state: DVector<f64>,
}

impl WaypointTrajectory {
    /// 由位置偏航目标构造定点轨迹
    pub fn new(goal: PositionYaw) -> Self {
        let mut state = DVector::zeros(MPC_STATE_SIZE);
        state[0] = goal.x;
        state[1] = goal.y;
        state[2] = goal.z;
        state[8] = goal.yaw;
        state[14] = goal.yaw;
        Self { state }
    }

    /// 取回构造时的位置偏航目标
    pub fn position_yaw(&self) -> PositionYaw {
        PositionYaw::new(self.state[0], self.state[1], self.state[2], self.state[8])
    }
}

impl ReferenceTrajectory for WaypointTrajectory {
    fn at_time(&self, _t: f64) -> (DVector<f64>, DVector<f64>) {
        (self.state.clone(), DVector::zeros(4))
    }
}
