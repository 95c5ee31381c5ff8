//! 反步推力动力学 connector
//!
//! 控制律输出推力二阶导和机体力矩；绑定在两拍之间用墙钟 dt 把
//! 它们前向积分成姿态推力指令：
//! `thrust_ddot → thrust_dot → thrust`、`torque → omega → rpy`。
//! 各轴指令独立饱和（不回绕），推力指令 = 推力 / (质量 × 推力增益)。

use crate::config::{BacksteppingConfig, UavSystemConfig};
use crate::connectors::{Connector, HardwareBinding, omega_to_rpy_rates};
use crate::controllers::{BacksteppingControl, BacksteppingSensorData, QrotorBacksteppingController};
use crate::error::UavError;
use crate::estimation::ThrustGainEstimator;
use crate::hardware::UavHardware;
use crate::recording::SharedLogSink;
use crate::types::{HardwareGroup, RollPitchYawRateThrust};
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

const STREAM: &str = "backstepping_state";
const COLUMNS: [&str; 7] = [
    "thrust", "thrust_dot", "roll_cmd", "pitch_cmd", "yaw_rate_cmd", "thrust_cmd", "kt",
];

/// 两拍之间允许的最大积分步长（s），首拍和长时间停顿后退化到这里
const MAX_DT_S: f64 = 0.1;

/// 反步控制的硬件绑定：持有推力 / 姿态积分器
pub struct BacksteppingBinding {
    hardware: Arc<dyn UavHardware>,
    estimator: Arc<ThrustGainEstimator>,
    log: SharedLogSink,
    config: BacksteppingConfig,
    thrust: f64,
    thrust_dot: f64,
    omega_command: Vector3<f64>,
    roll_command: f64,
    pitch_command: f64,
    last_rpy: Vector3<f64>,
    goal_start: Instant,
    previous_send: Option<Instant>,
}

impl BacksteppingBinding {
    fn new(
        hardware: Arc<dyn UavHardware>,
        estimator: Arc<ThrustGainEstimator>,
        log: SharedLogSink,
        config: BacksteppingConfig,
    ) -> Self {
        log.write_header(STREAM, &COLUMNS);
        let hover_thrust = config.mass * config.gravity;
        Self {
            hardware,
            estimator,
            log,
            config,
            thrust: hover_thrust,
            thrust_dot: 0.0,
            omega_command: Vector3::zeros(),
            roll_command: 0.0,
            pitch_command: 0.0,
            last_rpy: Vector3::zeros(),
            goal_start: Instant::now(),
            previous_send: None,
        }
    }

    fn integration_dt(&mut self) -> f64 {
        let now = Instant::now();
        let dt = match self.previous_send {
            Some(previous) => now.duration_since(previous).as_secs_f64().min(MAX_DT_S),
            None => MAX_DT_S,
        };
        self.previous_send = Some(now);
        dt
    }
}

impl HardwareBinding for BacksteppingBinding {
    type Sensor = BacksteppingSensorData;
    type Control = BacksteppingControl;

    fn extract_sensor_data(&mut self) -> Result<BacksteppingSensorData, UavError> {
        let telemetry = self.hardware.telemetry();
        self.estimator.add_sensor_data(
            telemetry.rpy.x,
            telemetry.rpy.y,
            telemetry.linear_acceleration.z,
        );
        self.last_rpy = telemetry.rpy;
        Ok(BacksteppingSensorData {
            t: self.goal_start.elapsed().as_secs_f64(),
            position: telemetry.position,
            velocity: telemetry.velocity,
            rpy: telemetry.rpy,
            omega: telemetry.omega,
            thrust: self.thrust,
            thrust_dot: self.thrust_dot,
        })
    }

    fn send_hardware_commands(&mut self, control: &BacksteppingControl) -> Result<(), UavError> {
        let dt = self.integration_dt();
        let cfg = &self.config;

        // 推力双积分，范围以悬停推力的归一化上下界饱和
        self.thrust_dot += control.thrust_ddot * dt;
        self.thrust += self.thrust_dot * dt;
        let hover = cfg.mass * cfg.gravity;
        self.thrust = self
            .thrust
            .clamp(cfg.lower_bounds[3] * hover, cfg.upper_bounds[3] * hover);

        // 力矩 → 角速度指令（对角惯量）
        let inertia = Vector3::from(cfg.inertia);
        let angular_momentum = inertia.component_mul(&self.omega_command);
        let coriolis = self.omega_command.cross(&angular_momentum);
        let omega_dot = (control.torque - coriolis).component_div(&inertia);
        self.omega_command += omega_dot * dt;

        // 角速度指令 → 姿态指令，逐轴独立饱和
        let rpy_rates = omega_to_rpy_rates(&self.last_rpy, &self.omega_command);
        self.roll_command = (self.roll_command + rpy_rates.x * dt)
            .clamp(cfg.lower_bounds[0], cfg.upper_bounds[0]);
        self.pitch_command = (self.pitch_command + rpy_rates.y * dt)
            .clamp(cfg.lower_bounds[1], cfg.upper_bounds[1]);
        let yaw_rate_command = rpy_rates.z.clamp(cfg.lower_bounds[2], cfg.upper_bounds[2]);

        let thrust_gain = self.estimator.thrust_gain().max(f64::EPSILON);
        let thrust_command = self.thrust / (cfg.mass * thrust_gain);
        self.estimator.add_thrust_command(thrust_command);

        self.log.write_row(
            STREAM,
            &[
                self.thrust,
                self.thrust_dot,
                self.roll_command,
                self.pitch_command,
                yaw_rate_command,
                thrust_command,
                thrust_gain,
            ],
        );

        self.hardware.send_attitude_rate_thrust(RollPitchYawRateThrust {
            roll: self.roll_command,
            pitch: self.pitch_command,
            yaw_rate: yaw_rate_command,
            thrust: thrust_command,
        })
    }

    fn on_new_goal(&mut self) {
        self.goal_start = Instant::now();
        self.previous_send = None;
        self.thrust = self.config.mass * self.config.gravity;
        self.thrust_dot = 0.0;
        self.omega_command = Vector3::zeros();
        self.roll_command = 0.0;
        self.pitch_command = 0.0;
        self.estimator.clear_buffer();
        trace!("backstepping integrators reset");
    }
}

/// 反步推力动力学 connector
pub type QrotorBacksteppingDroneConnector =
    Connector<BacksteppingBinding, QrotorBacksteppingController>;

impl QrotorBacksteppingDroneConnector {
    /// 组装反步 connector
    pub fn create(
        hardware: Arc<dyn UavHardware>,
        estimator: Arc<ThrustGainEstimator>,
        log: SharedLogSink,
        config: &UavSystemConfig,
    ) -> Self {
        Connector::new(
            "qrotor_backstepping",
            HardwareGroup::Uav,
            BacksteppingBinding::new(
                hardware,
                estimator,
                log,
                config.backstepping.clone(),
            ),
            QrotorBacksteppingController::new(
                config.backstepping.clone(),
                config.position_tolerance,
                config.velocity_tolerance,
            ),
        )
    }
}
