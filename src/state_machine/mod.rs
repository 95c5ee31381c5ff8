//! # 飞行模式状态机
//!
//! 显式的状态 / 事件枚举加一张迁移表：
//! `(当前状态, 事件种类) → (守卫, 动作, 下一状态)`。
//! 守卫拒绝越界目标（状态不变），动作落到 [`UavSystem`] 的类型
//! 化接口上。`tick()` 先排空外部事件队列，再按当前状态做内部
//! 推进（起飞完成、低电量保护、降落判定、接管恢复）。
//!
//! 飞手接管优先于一切：任何状态下检测到 override 立即迁入
//! `ManualControl`，本拍不再处理其他逻辑。

mod event;

pub use event::{EventKind, FlightEvent, FlightState};

use crate::system::UavSystem;
use crate::types::{ControllerStatus, HardwareGroup};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Guard = fn(&FlightStateMachine, &FlightEvent) -> bool;
type Action = fn(&FlightStateMachine, &FlightEvent);

struct Transition {
    from: FlightState,
    on: EventKind,
    guard: Guard,
    action: Action,
    to: FlightState,
}

const fn row(
    from: FlightState,
    on: EventKind,
    guard: Guard,
    action: Action,
    to: FlightState,
) -> Transition {
    Transition {
        from,
        on,
        guard,
        action,
        to,
    }
}

// ==================== 守卫 ====================

fn guard_always(_sm: &FlightStateMachine, _event: &FlightEvent) -> bool {
    true
}

fn guard_battery(sm: &FlightStateMachine, _event: &FlightEvent) -> bool {
    let battery = sm.system.telemetry().battery_percent;
    let ok = battery >= sm.system.config().min_battery_percent;
    if !ok {
        warn!(battery, "takeoff rejected: battery below minimum");
    }
    ok
}

fn guard_position_goal(sm: &FlightStateMachine, event: &FlightEvent) -> bool {
    let config = sm.system.config();
    let (x, y, z) = match event {
        FlightEvent::PositionGoal(goal) => (goal.x, goal.y, goal.z),
        FlightEvent::TrajectoryGoal(trajectory) => {
            let state = trajectory.goal(0.0);
            (state[0], state[1], state[2])
        }
        _ => return false,
    };
    z > 0.0
        && z <= config.max_goal_altitude
        && x.abs() <= config.max_goal_range
        && y.abs() <= config.max_goal_range
}

fn guard_velocity_goal(sm: &FlightStateMachine, event: &FlightEvent) -> bool {
    match event {
        FlightEvent::VelocityGoal(goal) => {
            goal.magnitude() <= sm.system.config().max_goal_velocity
        }
        _ => false,
    }
}

// ==================== 动作 ====================

fn action_none(_sm: &FlightStateMachine, _event: &FlightEvent) {}

fn action_takeoff(sm: &FlightStateMachine, _event: &FlightEvent) {
    // 起飞爬升由飞控执行，残留的激活控制器（如手动遥杆）必须先终止
    sm.system.abort(HardwareGroup::Uav);
    if let Err(e) = sm.system.take_off() {
        warn!(error = %e, "takeoff command failed");
    }
}

fn action_land(sm: &FlightStateMachine, _event: &FlightEvent) {
    if let Err(e) = sm.system.land() {
        warn!(error = %e, "land command failed");
    }
}

fn action_abort(sm: &FlightStateMachine, _event: &FlightEvent) {
    sm.system.abort(HardwareGroup::Uav);
}

fn action_position_goal(sm: &FlightStateMachine, event: &FlightEvent) {
    if let FlightEvent::PositionGoal(goal) = event {
        sm.system.set_position_goal(*goal);
    }
}

fn action_velocity_goal(sm: &FlightStateMachine, event: &FlightEvent) {
    if let FlightEvent::VelocityGoal(goal) = event {
        sm.system.set_velocity_goal(*goal);
    }
}

fn action_trajectory_goal(sm: &FlightStateMachine, event: &FlightEvent) {
    if let FlightEvent::TrajectoryGoal(trajectory) = event {
        sm.system.set_trajectory_goal(Arc::clone(trajectory));
    }
}

fn action_manual(sm: &FlightStateMachine, _event: &FlightEvent) {
    sm.system.abort(HardwareGroup::Uav);
    sm.system.enable_manual_control();
}

// ==================== 迁移表 ====================

use EventKind as E;
use FlightState as S;

static TRANSITIONS: &[Transition] = &[
    row(S::Landed, E::Takeoff, guard_battery, action_takeoff, S::TakingOff),
    // 起飞
    row(S::TakingOff, E::Completed, guard_always, action_none, S::Hovering),
    row(S::TakingOff, E::Abort, guard_always, action_land, S::Landing),
    row(S::TakingOff, E::Land, guard_always, action_land, S::Landing),
    // 悬停接受目标
    row(S::Hovering, E::PositionGoal, guard_position_goal, action_position_goal, S::PositionControl),
    row(S::Hovering, E::VelocityGoal, guard_velocity_goal, action_velocity_goal, S::VelocityControl),
    row(S::Hovering, E::TrajectoryGoal, guard_position_goal, action_trajectory_goal, S::PositionControl),
    row(S::Hovering, E::Abort, guard_always, action_land, S::Landing),
    row(S::Hovering, E::Land, guard_always, action_land, S::Landing),
    // 控制状态内换目标，终止回悬停
    row(S::PositionControl, E::PositionGoal, guard_position_goal, action_position_goal, S::PositionControl),
    row(S::PositionControl, E::VelocityGoal, guard_velocity_goal, action_velocity_goal, S::VelocityControl),
    row(S::PositionControl, E::TrajectoryGoal, guard_position_goal, action_trajectory_goal, S::PositionControl),
    row(S::PositionControl, E::Abort, guard_always, action_abort, S::Hovering),
    row(S::PositionControl, E::Land, guard_always, action_land, S::Landing),
    row(S::VelocityControl, E::PositionGoal, guard_position_goal, action_position_goal, S::PositionControl),
    row(S::VelocityControl, E::VelocityGoal, guard_velocity_goal, action_velocity_goal, S::VelocityControl),
    row(S::VelocityControl, E::TrajectoryGoal, guard_position_goal, action_trajectory_goal, S::PositionControl),
    row(S::VelocityControl, E::Abort, guard_always, action_abort, S::Hovering),
    row(S::VelocityControl, E::Land, guard_always, action_land, S::Landing),
    // 降落
    row(S::Landing, E::Completed, guard_always, action_none, S::Landed),
    // 飞手接管，任意状态可入
    row(S::Landed, E::ManualControl, guard_always, action_manual, S::ManualControl),
    row(S::TakingOff, E::ManualControl, guard_always, action_manual, S::ManualControl),
    row(S::Hovering, E::ManualControl, guard_always, action_manual, S::ManualControl),
    row(S::PositionControl, E::ManualControl, guard_always, action_manual, S::ManualControl),
    row(S::VelocityControl, E::ManualControl, guard_always, action_manual, S::ManualControl),
    row(S::Landing, E::ManualControl, guard_always, action_manual, S::ManualControl),
    // 接管解除后的恢复路径
    row(S::ManualControl, E::Takeoff, guard_battery, action_takeoff, S::TakingOff),
    row(S::ManualControl, E::Land, guard_always, action_land, S::Landing),
];

/// 跨线程事件注入句柄
#[derive(Clone)]
pub struct FlightEventHandle {
    tx: Sender<FlightEvent>,
}

impl FlightEventHandle {
    /// 投递事件，下一次 `tick` 处理
    pub fn send(&self, event: FlightEvent) {
        if self.tx.send(event).is_err() {
            warn!("flight state machine event queue closed");
        }
    }
}

/// 飞行模式状态机
pub struct FlightStateMachine {
    system: Arc<UavSystem>,
    state: FlightState,
    goal_completed: bool,
    event_tx: Sender<FlightEvent>,
    event_rx: Receiver<FlightEvent>,
}

impl FlightStateMachine {
    /// 创建状态机，初始状态 `Landed`
    pub fn new(system: Arc<UavSystem>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            system,
            state: FlightState::Landed,
            goal_completed: false,
            event_tx,
            event_rx,
        }
    }

    /// 当前状态
    pub fn state(&self) -> FlightState {
        self.state
    }

    /// 当前目标是否已达成（停留在控制状态时可观测）
    pub fn goal_completed(&self) -> bool {
        self.goal_completed
    }

    /// 底层系统
    pub fn system(&self) -> &Arc<UavSystem> {
        &self.system
    }

    /// 跨线程事件注入句柄
    pub fn handle(&self) -> FlightEventHandle {
        FlightEventHandle {
            tx: self.event_tx.clone(),
        }
    }

    /// 同步处理一个事件；返回是否发生了迁移
    pub fn process_event(&mut self, event: FlightEvent) -> bool {
        let kind = event.kind();
        let Some(transition) = TRANSITIONS
            .iter()
            .find(|t| t.from == self.state && t.on == kind)
        else {
            debug!(state = %self.state, event = ?event, "event not accepted in current state");
            return false;
        };

        if !(transition.guard)(self, &event) {
            warn!(state = %self.state, event = ?event, "event rejected by guard");
            return false;
        }

        (transition.action)(self, &event);
        if transition.to != self.state {
            info!(from = %self.state, to = %transition.to, event = ?event, "flight mode transition");
        }
        self.state = transition.to;
        self.goal_completed = false;
        true
    }

    /// 一拍状态机推进：排空事件队列 + 状态内部逻辑
    pub fn tick(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.process_event(event);
        }

        let telemetry = self.system.telemetry();

        // 接管短路
        if telemetry.pilot_override && self.state != FlightState::ManualControl {
            self.process_event(FlightEvent::ManualControl);
            return;
        }

        let config = self.system.config().clone();
        match self.state {
            FlightState::Landed => {}
            FlightState::TakingOff => {
                if telemetry.altitude() + config.position_tolerance >= config.takeoff_height {
                    self.process_event(FlightEvent::Completed);
                }
            }
            FlightState::Hovering => {
                if telemetry.battery_percent < config.min_battery_percent {
                    warn!(
                        battery = telemetry.battery_percent,
                        "battery below minimum while hovering, landing"
                    );
                    self.process_event(FlightEvent::Abort);
                }
            }
            FlightState::PositionControl | FlightState::VelocityControl => {
                if telemetry.battery_percent < config.min_battery_percent {
                    warn!(
                        battery = telemetry.battery_percent,
                        "battery below minimum during maneuver, aborting"
                    );
                    self.process_event(FlightEvent::Abort);
                } else if self.system.status_of(HardwareGroup::Uav) == ControllerStatus::Completed
                {
                    if !self.goal_completed {
                        info!(state = %self.state, "goal reached");
                    }
                    self.goal_completed = true;
                }
            }
            FlightState::Landing => {
                if telemetry.altitude() <= config.landed_altitude {
                    self.process_event(FlightEvent::Completed);
                }
            }
            FlightState::ManualControl => {
                if !telemetry.pilot_override {
                    // 接管解除：空中重回起飞流程，地面直接收尾
                    if telemetry.armed && telemetry.altitude() > config.landed_altitude {
                        self.process_event(FlightEvent::Takeoff);
                    } else {
                        self.process_event(FlightEvent::Land);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UavSystemConfig;
    use crate::hardware::UavHardware;
    use crate::sim::QuadSimulator;
    use crate::types::{PositionYaw, VelocityYaw, WaypointTrajectory};

    fn machine() -> (Arc<QuadSimulator>, FlightStateMachine) {
        let sim = Arc::new(QuadSimulator::new(0.5));
        let system =
            Arc::new(UavSystem::new(sim.clone(), UavSystemConfig::default()).unwrap());
        (sim, FlightStateMachine::new(system))
    }

    fn hover(sm: &mut FlightStateMachine) {
        assert!(sm.process_event(FlightEvent::Takeoff));
        sm.tick();
        assert_eq!(sm.state(), FlightState::Hovering);
    }

    /// 电量充足允许起飞，起飞完成进入悬停
    #[test]
    fn test_takeoff_with_healthy_battery() {
        let (sim, mut sm) = machine();
        sim.set_battery_percent(60.0);
        assert!(sm.process_event(FlightEvent::Takeoff));
        assert_eq!(sm.state(), FlightState::TakingOff);
        assert!(sim.telemetry().armed);
        sm.tick();
        assert_eq!(sm.state(), FlightState::Hovering);
    }

    /// 低电量拒绝起飞，状态不变
    #[test]
    fn test_takeoff_rejected_on_low_battery() {
        let (sim, mut sm) = machine();
        sim.set_battery_percent(10.0);
        assert!(!sm.process_event(FlightEvent::Takeoff));
        assert_eq!(sm.state(), FlightState::Landed);
        assert!(!sim.telemetry().armed);
    }

    /// 守卫边界：高度 1000 的目标被拒绝，高度 1 被接受
    #[test]
    fn test_position_goal_guard_bounds() {
        let (_sim, mut sm) = machine();
        hover(&mut sm);

        assert!(!sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(
            0.0, 0.0, 1000.0, 0.0
        ))));
        assert_eq!(sm.state(), FlightState::Hovering);

        assert!(sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(
            1.0, 1.0, 1.0, 0.0
        ))));
        assert_eq!(sm.state(), FlightState::PositionControl);
    }

    /// 速度守卫：模长超过上限拒绝
    #[test]
    fn test_velocity_goal_guard_bounds() {
        let (_sim, mut sm) = machine();
        hover(&mut sm);

        // (1,1,2.1) 模长 > 2.0
        assert!(!sm.process_event(FlightEvent::VelocityGoal(VelocityYaw::new(
            1.0, 1.0, 2.1, 0.0
        ))));
        assert_eq!(sm.state(), FlightState::Hovering);

        assert!(sm.process_event(FlightEvent::VelocityGoal(VelocityYaw::new(
            1.0, 1.0, 1.0, 0.0
        ))));
        assert_eq!(sm.state(), FlightState::VelocityControl);
    }

    /// 轨迹目标走同一个位置守卫
    #[test]
    fn test_trajectory_goal_guard() {
        let (_sim, mut sm) = machine();
        hover(&mut sm);
        let bad = Arc::new(WaypointTrajectory::new(PositionYaw::new(0.0, 0.0, 1000.0, 0.0)));
        assert!(!sm.process_event(FlightEvent::TrajectoryGoal(bad)));

        let good = Arc::new(WaypointTrajectory::new(PositionYaw::new(1.0, 0.0, 1.0, 0.0)));
        assert!(sm.process_event(FlightEvent::TrajectoryGoal(good)));
        assert_eq!(sm.state(), FlightState::PositionControl);
    }

    /// 机动中 Abort 清除激活控制器并回悬停
    #[test]
    fn test_abort_from_control_returns_to_hover() {
        let (_sim, mut sm) = machine();
        hover(&mut sm);
        sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(1.0, 0.0, 1.0, 0.0)));
        assert!(sm.system().is_active(HardwareGroup::Uav));

        assert!(sm.process_event(FlightEvent::Abort));
        assert_eq!(sm.state(), FlightState::Hovering);
        assert!(!sm.system().is_active(HardwareGroup::Uav));
    }

    /// 悬停中低电量主动降落
    #[test]
    fn test_low_battery_hover_lands() {
        let (sim, mut sm) = machine();
        hover(&mut sm);
        sim.set_battery_percent(10.0);
        sm.tick();
        assert_eq!(sm.state(), FlightState::Landing);
        sm.tick();
        assert_eq!(sm.state(), FlightState::Landed);
        assert!(!sim.telemetry().armed);
    }

    /// 飞手接管优先：任意状态下 override 立即迁入手动
    #[test]
    fn test_pilot_override_precedence() {
        let (sim, mut sm) = machine();
        hover(&mut sm);
        sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(1.0, 0.0, 1.0, 0.0)));

        sim.set_flow_control(false).unwrap();
        // 同拍有其他事件排队，接管仍然优先
        sm.handle().send(FlightEvent::Abort);
        sm.tick();
        assert_eq!(sm.state(), FlightState::ManualControl);
        // 自主控制器被清除，手动 connector 激活
        assert!(sm.system().is_active(HardwareGroup::Uav));
    }

    /// 接管解除：空中恢复自主，回到起飞流程
    #[test]
    fn test_manual_exit_airborne_resumes() {
        let (sim, mut sm) = machine();
        hover(&mut sm);
        sim.set_flow_control(false).unwrap();
        sm.tick();
        assert_eq!(sm.state(), FlightState::ManualControl);

        sim.set_flow_control(true).unwrap();
        sm.tick();
        assert_eq!(sm.state(), FlightState::TakingOff);
        sm.tick();
        assert_eq!(sm.state(), FlightState::Hovering);
    }

    /// 接管解除重回起飞流程时遥杆 connector 被终止，不再抢发指令
    #[test]
    fn test_manual_exit_deactivates_stick_connector() {
        let (sim, mut sm) = machine();
        hover(&mut sm);
        sim.set_flow_control(false).unwrap();
        sm.tick();
        assert_eq!(sm.state(), FlightState::ManualControl);
        assert!(sm.system().is_active(HardwareGroup::Uav));

        sim.set_flow_control(true).unwrap();
        sm.tick();
        assert_eq!(sm.state(), FlightState::TakingOff);
        assert!(!sm.system().is_active(HardwareGroup::Uav));
        let before = sim.rpyt_sent();
        assert!(!sm.system().run_active(HardwareGroup::Uav));
        assert_eq!(sim.rpyt_sent(), before);
    }

    /// 目标达成后停留在控制状态并置完成标记
    #[test]
    fn test_completion_recorded_in_control_state() {
        let (_sim, mut sm) = machine();
        hover(&mut sm);
        sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(1.0, 1.0, 1.0, 0.0)));
        assert!(!sm.goal_completed());

        // 位置控制 connector 两拍收敛（仿真瞬移）
        sm.system().run_active(HardwareGroup::Uav);
        sm.system().run_active(HardwareGroup::Uav);
        sm.tick();
        assert_eq!(sm.state(), FlightState::PositionControl);
        assert!(sm.goal_completed());

        // 换新目标清除完成标记
        sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(2.0, 0.0, 1.0, 0.0)));
        assert!(!sm.goal_completed());
    }

    /// 事件句柄跨线程注入
    #[test]
    fn test_cross_thread_event_injection() {
        let (_sim, mut sm) = machine();
        let handle = sm.handle();
        let t = std::thread::spawn(move || {
            handle.send(FlightEvent::Takeoff);
        });
        t.join().unwrap();
        sm.tick();
        // Takeoff 在 tick 内被处理并完成爬升判定
        assert!(matches!(
            sm.state(),
            FlightState::TakingOff | FlightState::Hovering
        ));
    }

    /// 落地状态不接受飞行目标
    #[test]
    fn test_goals_rejected_on_ground() {
        let (_sim, mut sm) = machine();
        assert!(!sm.process_event(FlightEvent::PositionGoal(PositionYaw::new(
            1.0, 0.0, 1.0, 0.0
        ))));
        assert_eq!(sm.state(), FlightState::Landed);
        assert!(!sm.system().is_active(HardwareGroup::Uav));
    }
}
