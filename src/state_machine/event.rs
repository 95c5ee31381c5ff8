//! 飞行模式与飞行事件

use crate::types::{PositionYaw, ReferenceTrajectory, VelocityYaw};
use std::fmt;
use std::sync::Arc;

/// 飞行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// 落地上锁
    Landed,
    /// 起飞爬升中
    TakingOff,
    /// 悬停待命
    Hovering,
    /// 位置 / 轨迹控制
    PositionControl,
    /// 速度控制
    VelocityControl,
    /// 降落中
    Landing,
    /// 飞手接管
    ManualControl,
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightState::Landed => "Landed",
            FlightState::TakingOff => "TakingOff",
            FlightState::Hovering => "Hovering",
            FlightState::PositionControl => "PositionControl",
            FlightState::VelocityControl => "VelocityControl",
            FlightState::Landing => "Landing",
            FlightState::ManualControl => "ManualControl",
        };
        write!(f, "{name}")
    }
}

/// 飞行事件，目标事件携带目标载荷
#[derive(Clone)]
pub enum FlightEvent {
    /// 请求起飞
    Takeoff,
    /// 请求降落
    Land,
    /// 终止当前机动
    Abort,
    /// 飞手接管
    ManualControl,
    /// 当前阶段完成（内部事件）
    Completed,
    /// 位置目标
    PositionGoal(PositionYaw),
    /// 速度目标
    VelocityGoal(VelocityYaw),
    /// 参考轨迹目标
    TrajectoryGoal(Arc<dyn ReferenceTrajectory>),
}

impl FlightEvent {
    pub(crate) fn kind(&self) -> EventKind {
        match self {
            FlightEvent::Takeoff => EventKind::Takeoff,
            FlightEvent::Land => EventKind::Land,
            FlightEvent::Abort => EventKind::Abort,
            FlightEvent::ManualControl => EventKind::ManualControl,
            FlightEvent::Completed => EventKind::Completed,
            FlightEvent::PositionGoal(_) => EventKind::PositionGoal,
            FlightEvent::VelocityGoal(_) => EventKind::VelocityGoal,
            FlightEvent::TrajectoryGoal(_) => EventKind::TrajectoryGoal,
        }
    }
}

impl fmt::Debug for FlightEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightEvent::PositionGoal(goal) => write!(f, "PositionGoal({goal:?})"),
            FlightEvent::VelocityGoal(goal) => write!(f, "VelocityGoal({goal:?})"),
            FlightEvent::TrajectoryGoal(_) => write!(f, "TrajectoryGoal(..)"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// 事件种类（迁移表的匹配键）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Takeoff,
    Land,
    Abort,
    ManualControl,
    Completed,
    PositionGoal,
    VelocityGoal,
    TrajectoryGoal,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
