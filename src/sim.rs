//! # 四旋翼仿真后端
//!
//! 无硬件环境下替代真实驱动的 [`UavHardware`] 实现。动力学刻意
//! 简化：航点指令直接瞬移到目标，速度指令立即生效，姿态推力指令
//! 反映到姿态和加速度遥测。遥测快照通过 `ArcSwap` 无锁发布。

use crate::error::UavError;
use crate::hardware::UavHardware;
use crate::types::{RollPitchYawRateThrust, Telemetry};
use arc_swap::ArcSwap;
use nalgebra::Vector3;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// 每条指令推进的仿真时间（s）
const SIM_TICK_S: f64 = 0.02;

/// 四旋翼仿真器
pub struct QuadSimulator {
    telemetry: ArcSwap<Telemetry>,
    takeoff_height: f64,
    /// 仿真真值推力增益，估计器应收敛到该值
    thrust_gain: f64,
    fail_commands: AtomicBool,
    waypoints_sent: AtomicUsize,
    velocities_sent: AtomicUsize,
    rpyt_sent: AtomicUsize,
}

impl QuadSimulator {
    /// 创建仿真器，初始状态为上锁、落地、满电
    pub fn new(takeoff_height: f64) -> Self {
        Self {
            telemetry: ArcSwap::from_pointee(Telemetry::default()),
            takeoff_height,
            thrust_gain: 0.16,
            fail_commands: AtomicBool::new(false),
            waypoints_sent: AtomicUsize::new(0),
            velocities_sent: AtomicUsize::new(0),
            rpyt_sent: AtomicUsize::new(0),
        }
    }

    /// 设置电池电量百分比
    pub fn set_battery_percent(&self, percent: f64) {
        self.update(|t| t.battery_percent = percent);
    }

    /// 设置遥控器通道（roll/pitch/yaw/thrust，归一化 [-1, 1]）
    pub fn set_rc_channels(&self, channels: [f64; 4]) {
        self.update(|t| t.rc_channels = channels);
    }

    /// 注入硬件故障：后续指令原语全部失败
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// 已接收的航点指令数
    pub fn waypoints_sent(&self) -> usize {
        self.waypoints_sent.load(Ordering::SeqCst)
    }

    /// 已接收的速度指令数
    pub fn velocities_sent(&self) -> usize {
        self.velocities_sent.load(Ordering::SeqCst)
    }

    /// 已接收的姿态推力指令数
    pub fn rpyt_sent(&self) -> usize {
        self.rpyt_sent.load(Ordering::SeqCst)
    }

    fn update(&self, f: impl Fn(&mut Telemetry)) {
        self.telemetry.rcu(|current| {
            let mut next = Telemetry::clone(current);
            f(&mut next);
            Arc::new(next)
        });
    }

    fn check_command_channel(&self) -> Result<(), UavError> {
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(UavError::HardwareFault(
                "simulated command channel failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl UavHardware for QuadSimulator {
    fn takeoff(&self) -> Result<(), UavError> {
        self.check_command_channel()?;
        let height = self.takeoff_height;
        self.update(|t| {
            t.armed = true;
            t.position.z = height;
            t.velocity = Vector3::zeros();
            t.vehicle_state = "ARMED ENABLE_CONTROL".to_string();
            t.timestamp_s += SIM_TICK_S;
        });
        Ok(())
    }

    fn land(&self) -> Result<(), UavError> {
        self.check_command_channel()?;
        self.update(|t| {
            t.armed = false;
            t.position.z = 0.0;
            t.velocity = Vector3::zeros();
            t.linear_acceleration = Vector3::zeros();
            t.vehicle_state = "ENABLE_CONTROL".to_string();
            t.timestamp_s += SIM_TICK_S;
        });
        Ok(())
    }

    fn telemetry(&self) -> Telemetry {
        Telemetry::clone(&self.telemetry.load())
    }

    fn send_waypoint(&self, position: Vector3<f64>, yaw: f64) -> Result<(), UavError> {
        self.check_command_channel()?;
        self.waypoints_sent.fetch_add(1, Ordering::SeqCst);
        // 瞬移语义：到点即停
        self.update(|t| {
            t.position = position;
            t.velocity = Vector3::zeros();
            t.rpy.z = yaw;
            t.timestamp_s += SIM_TICK_S;
        });
        Ok(())
    }

    fn send_velocity(&self, velocity: Vector3<f64>, yaw: f64) -> Result<(), UavError> {
        self.check_command_channel()?;
        self.velocities_sent.fetch_add(1, Ordering::SeqCst);
        self.update(|t| {
            t.velocity = velocity;
            t.position += velocity * SIM_TICK_S;
            t.rpy.z = yaw;
            t.timestamp_s += SIM_TICK_S;
        });
        Ok(())
    }

    fn send_attitude_rate_thrust(&self, command: RollPitchYawRateThrust) -> Result<(), UavError> {
        self.check_command_channel()?;
        self.rpyt_sent.fetch_add(1, Ordering::SeqCst);
        let gain = self.thrust_gain;
        self.update(|t| {
            t.rpy.x = command.roll;
            t.rpy.y = command.pitch;
            t.omega.z = command.yaw_rate;
            t.linear_acceleration.z =
                gain * command.thrust * command.roll.cos() * command.pitch.cos();
            t.timestamp_s += SIM_TICK_S;
        });
        Ok(())
    }

    fn set_flow_control(&self, enabled: bool) -> Result<(), UavError> {
        self.update(|t| t.pilot_override = !enabled);
        Ok(())
    }
}
