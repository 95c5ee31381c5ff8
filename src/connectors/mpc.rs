//! MPC 风格轨迹跟踪 connector
//!
//! 每拍把遥测 + 在线推力增益折算成 15 维状态估计（含由上一条
//! 指令回推的期望姿态），维护一个定长的历史控制延迟环，供控制
//! 律补偿执行延迟；状态估计逐拍写入数据流 `mpc_state`。

use crate::config::UavSystemConfig;
use crate::connectors::{Connector, HardwareBinding, omega_to_rpy_rates};
use crate::controllers::{MpcSensorData, RpytReferenceController};
use crate::error::UavError;
use crate::estimation::ThrustGainEstimator;
use crate::hardware::UavHardware;
use crate::recording::SharedLogSink;
use crate::sensors::Sensor;
use crate::types::{HardwareGroup, MPC_STATE_SIZE, PositionYaw, RollPitchYawRateThrust};
use nalgebra::DVector;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

const STREAM: &str = "mpc_state";
const COLUMNS: [&str; 16] = [
    "x", "y", "z", "vx", "vy", "vz", "r", "p", "y", "rdot", "pdot", "ydot", "rd", "pd", "yd", "kt",
];

/// 轨迹跟踪的硬件绑定
pub struct MpcBinding {
    hardware: Arc<dyn UavHardware>,
    estimator: Arc<ThrustGainEstimator>,
    /// 外部位姿传感器（为 `None` 时用飞控遥测）
    pose_sensor: Option<Arc<dyn Sensor<PositionYaw>>>,
    log: SharedLogSink,
    delay_buffer: VecDeque<RollPitchYawRateThrust>,
    delay_buffer_size: usize,
    last_command: RollPitchYawRateThrust,
    goal_start: Instant,
}

impl MpcBinding {
    fn new(
        hardware: Arc<dyn UavHardware>,
        estimator: Arc<ThrustGainEstimator>,
        pose_sensor: Option<Arc<dyn Sensor<PositionYaw>>>,
        log: SharedLogSink,
        delay_buffer_size: usize,
    ) -> Self {
        log.write_header(STREAM, &COLUMNS);
        Self {
            hardware,
            estimator,
            pose_sensor,
            log,
            delay_buffer: VecDeque::with_capacity(delay_buffer_size),
            delay_buffer_size,
            last_command: RollPitchYawRateThrust::default(),
            goal_start: Instant::now(),
        }
    }

    /// 遥测 + 推力增益 → 15 维状态估计
    fn estimate_state_and_parameters(&mut self) -> Result<MpcSensorData, UavError> {
        let telemetry = self.hardware.telemetry();

        // 外部位姿传感器优先于飞控自身估计
        let (position, yaw) = match &self.pose_sensor {
            Some(sensor) => {
                let pose = sensor
                    .read()
                    .ok_or(UavError::SensorUnavailable("external pose sensor"))?;
                (pose.position(), pose.yaw)
            }
            None => (telemetry.position, telemetry.yaw()),
        };

        self.estimator.add_sensor_data(
            telemetry.rpy.x,
            telemetry.rpy.y,
            telemetry.linear_acceleration.z,
        );
        let thrust_gain = self.estimator.thrust_gain();

        let rpy_rates = omega_to_rpy_rates(&telemetry.rpy, &telemetry.omega);
        let mut state = DVector::zeros(MPC_STATE_SIZE);
        state[0] = position.x;
        state[1] = position.y;
        state[2] = position.z;
        state[3] = telemetry.velocity.x;
        state[4] = telemetry.velocity.y;
        state[5] = telemetry.velocity.z;
        state[6] = telemetry.rpy.x;
        state[7] = telemetry.rpy.y;
        state[8] = yaw;
        state[9] = rpy_rates.x;
        state[10] = rpy_rates.y;
        state[11] = rpy_rates.z;
        // 期望姿态由上一条指令回推
        state[12] = self.last_command.roll;
        state[13] = self.last_command.pitch;
        state[14] = yaw;

        let mut row = [0.0; 16];
        row[..MPC_STATE_SIZE].copy_from_slice(state.as_slice());
        row[15] = thrust_gain;
        self.log.write_row(STREAM, &row);

        Ok(MpcSensorData {
            state,
            thrust_gain,
            t: self.goal_start.elapsed().as_secs_f64(),
        })
    }
}

impl HardwareBinding for MpcBinding {
    type Sensor = MpcSensorData;
    type Control = RollPitchYawRateThrust;

    fn extract_sensor_data(&mut self) -> Result<MpcSensorData, UavError> {
        self.estimate_state_and_parameters()
    }

    fn send_hardware_commands(&mut self, control: &RollPitchYawRateThrust) -> Result<(), UavError> {
        self.estimator.add_thrust_command(control.thrust);
        self.delay_buffer.push_back(*control);
        while self.delay_buffer.len() > self.delay_buffer_size {
            self.delay_buffer.pop_front();
        }
        self.last_command = *control;
        self.hardware.send_attitude_rate_thrust(*control)
    }

    fn on_new_goal(&mut self) {
        self.goal_start = Instant::now();
        self.delay_buffer.clear();
        self.last_command = RollPitchYawRateThrust::default();
        self.estimator.clear_buffer();
        trace!("mpc connector filter state reset");
    }
}

/// MPC 风格轨迹跟踪 connector
pub type MpcTrajectoryDroneConnector = Connector<MpcBinding, RpytReferenceController>;

impl MpcTrajectoryDroneConnector {
    /// 组装轨迹跟踪 connector
    pub fn create(
        hardware: Arc<dyn UavHardware>,
        estimator: Arc<ThrustGainEstimator>,
        pose_sensor: Option<Arc<dyn Sensor<PositionYaw>>>,
        log: SharedLogSink,
        config: &UavSystemConfig,
    ) -> Self {
        Connector::new(
            "mpc_trajectory",
            HardwareGroup::Uav,
            MpcBinding::new(
                hardware,
                estimator,
                pose_sensor,
                log,
                config.mpc.delay_buffer_size,
            ),
            RpytReferenceController::new(
                config.mpc.clone(),
                config.backstepping.gravity,
                config.position_tolerance,
                config.velocity_tolerance,
            ),
        )
    }
}
