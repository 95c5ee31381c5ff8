//! # 控制器-硬件连接器
//!
//! [`Connector`] 把一个控制策略绑定到硬件端点，对外只暴露统一的
//! 执行协议 [`ControllerConnector`]：`run()` 一拍 =
//! 提取传感器数据 → 控制律 → 下发指令。调度器
//! （[`registry`](crate::registry)）只认这个协议，不关心具体策略。
//!
//! 不变量：
//! - 每次成功的 `run()` 恰好下发一条硬件指令；
//! - 传感器提取失败时不调用控制律、不下发指令，状态置
//!   `Critical`，`run()` 返回 `false`；
//! - 硬件写入失败同样置 `Critical`，并通过
//!   [`ControllerConnector::hardware_faulted`] 暴露给注册表，由
//!   注册表终止该 connector（传感器失效是瞬态的，写入失败不是）；
//! - `set_goal` 重置 connector 本地滤波状态（时间原点、积分器、
//!   延迟缓冲、估计器样本），状态强制回 `Active`。

mod backstepping;
mod joystick_velocity;
mod manual_rpyt;
mod mpc;
mod position;
mod velocity;
mod visual_servoing;

pub use backstepping::{BacksteppingBinding, QrotorBacksteppingDroneConnector};
pub use joystick_velocity::{JoystickVelocityBinding, JoystickVelocityDroneConnector};
pub use manual_rpyt::{ManualRpytBinding, ManualRpytDroneConnector};
pub use mpc::{MpcBinding, MpcTrajectoryDroneConnector};
pub use position::{PositionBinding, PositionControllerDroneConnector};
pub use velocity::{VelocityBinding, VelocityControllerDroneConnector};
pub use visual_servoing::{RelativePoseVisualServoingDroneConnector, VisualServoingBinding};

use crate::controllers::Controller;
use crate::error::UavError;
use crate::types::{ControllerStatus, HardwareGroup};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// 统一执行协议（对象安全）
///
/// 注册表以 `Arc<dyn ControllerConnector>` 持有激活的 connector。
pub trait ControllerConnector: Send + Sync {
    /// connector 名称，用于日志
    fn name(&self) -> &'static str;

    /// 所属硬件分组
    fn group(&self) -> HardwareGroup;

    /// 执行一拍；返回 `false` 表示本拍失败（未下发指令）
    fn run(&self) -> bool;

    /// 最近一拍之后的状态
    fn status(&self) -> ControllerStatus;

    /// 最近一拍是否因硬件写入失败而失败
    fn hardware_faulted(&self) -> bool;
}

/// 硬件绑定：connector 与硬件端点之间的读写两步
pub trait HardwareBinding: Send {
    /// 提供给控制律的传感器数据
    type Sensor;
    /// 控制律输出
    type Control;

    /// 提取一帧传感器数据
    ///
    /// # 错误
    ///
    /// [`UavError::SensorUnavailable`] - 外部传感器未就绪或跟踪失效
    fn extract_sensor_data(&mut self) -> Result<Self::Sensor, UavError>;

    /// 下发控制量到硬件
    fn send_hardware_commands(&mut self, control: &Self::Control) -> Result<(), UavError>;

    /// 新目标钩子：重置时间原点、积分器等滤波状态
    fn on_new_goal(&mut self) {}
}

/// 通用 connector：绑定 + 控制律 + 状态，内部互斥
///
/// `run()` 与 `set_goal` 在同一把锁下执行，目标替换对下一拍
/// 立即可见且不会撕裂。
pub struct Connector<B, C> {
    name: &'static str,
    group: HardwareGroup,
    inner: Mutex<ConnectorInner<B, C>>,
}

struct ConnectorInner<B, C> {
    binding: B,
    controller: C,
    status: ControllerStatus,
    hardware_fault: bool,
}

impl<B, C> Connector<B, C>
where
    B: HardwareBinding,
    C: Controller<Sensor = B::Sensor, Control = B::Control>,
{
    /// 组装 connector
    pub fn new(name: &'static str, group: HardwareGroup, binding: B, controller: C) -> Self {
        Self {
            name,
            group,
            inner: Mutex::new(ConnectorInner {
                binding,
                controller,
                status: ControllerStatus::NotEngaged,
                hardware_fault: false,
            }),
        }
    }

    /// 替换目标并重置滤波状态
    ///
    /// 状态强制回 `Active`：新目标设置后、第一拍运行前绝不能
    /// 报告 `Completed`。
    pub fn set_goal(&self, goal: C::Goal) {
        let mut inner = self.inner.lock();
        inner.controller.set_goal(goal);
        inner.binding.on_new_goal();
        inner.status = ControllerStatus::Active;
        inner.hardware_fault = false;
    }

    /// 当前目标
    pub fn goal(&self) -> C::Goal {
        self.inner.lock().controller.goal()
    }
}

impl<B, C> ControllerConnector for Connector<B, C>
where
    B: HardwareBinding,
    C: Controller<Sensor = B::Sensor, Control = B::Control>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn group(&self) -> HardwareGroup {
        self.group
    }

    fn run(&self) -> bool {
        let mut inner = self.inner.lock();
        let ConnectorInner {
            binding,
            controller,
            status,
            hardware_fault,
        } = &mut *inner;
        *hardware_fault = false;

        let sensor = match binding.extract_sensor_data() {
            Ok(sensor) => sensor,
            Err(e) => {
                debug!(connector = self.name, error = %e, "sensor extraction failed");
                *status = ControllerStatus::Critical;
                return false;
            }
        };

        let control = controller.run(&sensor);
        if let Err(e) = binding.send_hardware_commands(&control) {
            warn!(connector = self.name, error = %e, "hardware command failed");
            *status = ControllerStatus::Critical;
            *hardware_fault = true;
            return false;
        }

        *status = if controller.is_converged(&sensor) {
            ControllerStatus::Completed
        } else {
            ControllerStatus::Active
        };
        true
    }

    fn status(&self) -> ControllerStatus {
        self.inner.lock().status
    }

    fn hardware_faulted(&self) -> bool {
        self.inner.lock().hardware_fault
    }
}

/// 机体角速度 → 欧拉角速率的标准运动学变换
///
/// cos(pitch) 设下限，避免俯仰接近 ±π/2 时发散。
pub(crate) fn omega_to_rpy_rates(
    rpy: &nalgebra::Vector3<f64>,
    omega: &nalgebra::Vector3<f64>,
) -> nalgebra::Vector3<f64> {
    let (sin_r, cos_r) = rpy.x.sin_cos();
    let cos_p = rpy.y.cos().max(0.1);
    let tan_p = rpy.y.tan().clamp(-10.0, 10.0);
    nalgebra::Vector3::new(
        omega.x + sin_r * tan_p * omega.y + cos_r * tan_p * omega.z,
        cos_r * omega.y - sin_r * omega.z,
        sin_r / cos_p * omega.y + cos_r / cos_p * omega.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmptyGoal;

    /// 水平姿态下欧拉角速率等于机体角速度
    #[test]
    fn test_omega_to_rpy_rates_level() {
        let rpy = nalgebra::Vector3::zeros();
        let omega = nalgebra::Vector3::new(0.1, -0.2, 0.3);
        let rates = omega_to_rpy_rates(&rpy, &omega);
        assert!((rates - omega).norm() < 1e-12);
    }

    /// 可编程的测试绑定
    struct ScriptedBinding {
        sensor_ok: bool,
        send_ok: bool,
        sends: usize,
        goal_resets: usize,
    }

    impl HardwareBinding for ScriptedBinding {
        type Sensor = f64;
        type Control = f64;

        fn extract_sensor_data(&mut self) -> Result<f64, UavError> {
            if self.sensor_ok {
                Ok(1.0)
            } else {
                Err(UavError::SensorUnavailable("scripted"))
            }
        }

        fn send_hardware_commands(&mut self, _control: &f64) -> Result<(), UavError> {
            if self.send_ok {
                self.sends += 1;
                Ok(())
            } else {
                Err(UavError::HardwareFault("scripted".to_string()))
            }
        }

        fn on_new_goal(&mut self) {
            self.goal_resets += 1;
        }
    }

    struct ConstController {
        converged: bool,
    }

    impl Controller for ConstController {
        type Sensor = f64;
        type Goal = EmptyGoal;
        type Control = f64;

        fn set_goal(&mut self, _goal: EmptyGoal) {}
        fn goal(&self) -> EmptyGoal {
            EmptyGoal
        }
        fn run(&mut self, _sensor: &f64) -> f64 {
            42.0
        }
        fn is_converged(&self, _sensor: &f64) -> bool {
            self.converged
        }
    }

    fn connector(sensor_ok: bool, send_ok: bool, converged: bool) -> Connector<ScriptedBinding, ConstController> {
        Connector::new(
            "scripted",
            HardwareGroup::Uav,
            ScriptedBinding {
                sensor_ok,
                send_ok,
                sends: 0,
                goal_resets: 0,
            },
            ConstController { converged },
        )
    }

    /// 成功一拍：恰好一次硬件写入，状态 Active
    #[test]
    fn test_successful_run_writes_once() {
        let c = connector(true, true, false);
        assert!(c.run());
        assert_eq!(c.status(), ControllerStatus::Active);
        assert_eq!(c.inner.lock().binding.sends, 1);
    }

    /// 传感器失败：不写硬件，状态 Critical，返回 false，不算硬件故障
    #[test]
    fn test_sensor_failure_is_critical_without_write() {
        let c = connector(false, true, false);
        assert!(!c.run());
        assert_eq!(c.status(), ControllerStatus::Critical);
        assert_eq!(c.inner.lock().binding.sends, 0);
        assert!(!c.hardware_faulted());
    }

    /// 硬件写入失败：状态 Critical 且上报硬件故障
    #[test]
    fn test_command_failure_is_critical() {
        let c = connector(true, false, false);
        assert!(!c.run());
        assert_eq!(c.status(), ControllerStatus::Critical);
        assert!(c.hardware_faulted());

        // 通道恢复后故障标记随下一拍清除
        c.inner.lock().binding.send_ok = true;
        assert!(c.run());
        assert!(!c.hardware_faulted());
    }

    /// 收敛后状态 Completed
    #[test]
    fn test_converged_run_completes() {
        let c = connector(true, true, true);
        assert!(c.run());
        assert_eq!(c.status(), ControllerStatus::Completed);
    }

    /// set_goal 重置绑定滤波状态并强制 Active
    #[test]
    fn test_set_goal_resets_binding_and_status() {
        let c = connector(true, true, true);
        assert!(c.run());
        assert_eq!(c.status(), ControllerStatus::Completed);

        c.set_goal(EmptyGoal);
        assert_eq!(c.status(), ControllerStatus::Active);
        assert_eq!(c.inner.lock().binding.goal_resets, 1);
    }
}
