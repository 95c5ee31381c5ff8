//! # 控制循环驱动
//!
//! 以固定频率交替推进状态机和激活控制器。低抖动睡眠用
//! `spin_sleep`，避免 `std::thread::sleep` 在毫秒级周期下的过冲。

use crate::error::{ConfigError, UavError};
use crate::state_machine::FlightStateMachine;
use crate::types::HardwareGroup;
use spin_sleep::SpinSleeper;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info};

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    /// 循环频率（Hz）
    pub frequency_hz: f64,
    /// 迭代上限，`None` 表示一直运行到停止请求
    pub max_iterations: Option<u64>,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 50.0,
            max_iterations: None,
        }
    }
}

impl ControlLoopConfig {
    fn period(&self) -> Result<Duration, UavError> {
        if self.frequency_hz <= 0.0 || !self.frequency_hz.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "frequency_hz",
                reason: format!("must be positive and finite, got {}", self.frequency_hz),
            }
            .into());
        }
        Ok(Duration::from_secs_f64(1.0 / self.frequency_hz))
    }
}

/// 在当前线程运行控制循环直到迭代上限
///
/// 每拍 = 状态机 `tick` + UAV 分组激活控制器一拍。
///
/// # 错误
///
/// [`UavError::Config`] - 频率非法
pub fn run_control_loop(
    machine: &mut FlightStateMachine,
    config: &ControlLoopConfig,
) -> Result<(), UavError> {
    let period = config.period()?;
    let sleeper = SpinSleeper::default();
    let mut iterations = 0u64;

    loop {
        machine.tick();
        machine.system().run_active(HardwareGroup::Uav);

        iterations += 1;
        if let Some(max) = config.max_iterations
            && iterations >= max
        {
            debug!(iterations, "control loop reached iteration limit");
            return Ok(());
        }
        sleeper.sleep(period);
    }
}

/// 后台控制循环句柄
///
/// Drop 时请求停止并等待线程退出。
pub struct ControlLoopHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<FlightStateMachine>>,
}

/// 把控制循环放到后台线程
///
/// # 错误
///
/// [`UavError::Config`] - 频率非法
pub fn spawn_control_loop(
    mut machine: FlightStateMachine,
    config: ControlLoopConfig,
) -> Result<ControlLoopHandle, UavError> {
    let period = config.period()?;
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = std::thread::Builder::new()
        .name("uav-control-loop".to_string())
        .spawn(move || {
            let sleeper = SpinSleeper::default();
            let mut iterations = 0u64;
            info!(frequency_hz = config.frequency_hz, "control loop started");
            while !stop_flag.load(Ordering::SeqCst) {
                machine.tick();
                machine.system().run_active(HardwareGroup::Uav);

                iterations += 1;
                if let Some(max) = config.max_iterations
                    && iterations >= max
                {
                    break;
                }
                sleeper.sleep(period);
            }
            info!(iterations, "control loop stopped");
            machine
        })
        .map_err(|e| UavError::HardwareFault(format!("failed to spawn control loop: {e}")))?;

    Ok(ControlLoopHandle {
        stop,
        thread: Some(thread),
    })
}

impl ControlLoopHandle {
    /// 请求停止并取回状态机；线程 panic 时返回 `None`
    pub fn stop(mut self) -> Option<FlightStateMachine> {
        self.stop.store(true, Ordering::SeqCst);
        self.thread.take().and_then(|thread| thread.join().ok())
    }
}

impl Drop for ControlLoopHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UavSystemConfig;
    use crate::sim::QuadSimulator;
    use crate::state_machine::{FlightEvent, FlightState};
    use crate::system::UavSystem;
    use crate::types::PositionYaw;

    fn machine(sim: &Arc<QuadSimulator>) -> FlightStateMachine {
        let system =
            Arc::new(UavSystem::new(sim.clone(), UavSystemConfig::default()).unwrap());
        FlightStateMachine::new(system)
    }

    #[test]
    fn test_invalid_frequency_rejected() {
        let sim = Arc::new(QuadSimulator::new(0.5));
        let mut m = machine(&sim);
        let config = ControlLoopConfig {
            frequency_hz: 0.0,
            max_iterations: Some(1),
        };
        assert!(matches!(
            run_control_loop(&mut m, &config),
            Err(UavError::Config(_))
        ));
    }

    /// 有限迭代的前台循环驱动完整的起飞-到点流程
    #[test]
    fn test_bounded_loop_flies_to_goal() {
        let sim = Arc::new(QuadSimulator::new(0.5));
        let mut m = machine(&sim);
        m.process_event(FlightEvent::Takeoff);
        m.tick();
        m.process_event(FlightEvent::PositionGoal(PositionYaw::new(1.0, 1.0, 1.0, 0.0)));

        let config = ControlLoopConfig {
            frequency_hz: 500.0,
            max_iterations: Some(10),
        };
        run_control_loop(&mut m, &config).unwrap();
        assert_eq!(m.state(), FlightState::PositionControl);
        assert!(m.goal_completed());
    }

    /// 后台循环可停止并取回状态机
    #[test]
    fn test_spawned_loop_stops_cleanly() {
        let sim = Arc::new(QuadSimulator::new(0.5));
        let mut m = machine(&sim);
        m.process_event(FlightEvent::Takeoff);

        let handle = spawn_control_loop(
            m,
            ControlLoopConfig {
                frequency_hz: 200.0,
                max_iterations: None,
            },
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let m = handle.stop().unwrap();
        assert_eq!(m.state(), FlightState::Hovering);
    }
}
