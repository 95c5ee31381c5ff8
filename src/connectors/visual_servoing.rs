//! 相对位姿视觉伺服 connector
//!
//! 依赖外部位姿跟踪器。跟踪失效按传感器提取失败处理：本拍不下
//! 发指令、状态 `Critical`，等待跟踪恢复。

use crate::config::UavSystemConfig;
use crate::connectors::{Connector, HardwareBinding};
use crate::controllers::{RelativePoseVisualServoingController, VisualServoingSensorData};
use crate::error::UavError;
use crate::estimation::ThrustGainEstimator;
use crate::hardware::UavHardware;
use crate::recording::SharedLogSink;
use crate::sensors::Sensor;
use crate::types::{HardwareGroup, PositionYaw, RollPitchYawRateThrust, VelocityYawRate};
use std::sync::Arc;

const STREAM: &str = "visual_servoing";
const COLUMNS: [&str; 5] = ["tx", "ty", "tz", "tyaw", "kt"];

/// 视觉伺服的硬件绑定
pub struct VisualServoingBinding {
    hardware: Arc<dyn UavHardware>,
    tracker: Arc<dyn Sensor<PositionYaw>>,
    estimator: Arc<ThrustGainEstimator>,
    log: SharedLogSink,
}

impl VisualServoingBinding {
    fn new(
        hardware: Arc<dyn UavHardware>,
        tracker: Arc<dyn Sensor<PositionYaw>>,
        estimator: Arc<ThrustGainEstimator>,
        log: SharedLogSink,
    ) -> Self {
        log.write_header(STREAM, &COLUMNS);
        Self {
            hardware,
            tracker,
            estimator,
            log,
        }
    }
}

impl HardwareBinding for VisualServoingBinding {
    type Sensor = VisualServoingSensorData;
    type Control = RollPitchYawRateThrust;

    fn extract_sensor_data(&mut self) -> Result<VisualServoingSensorData, UavError> {
        let tracking = self
            .tracker
            .read()
            .ok_or(UavError::SensorUnavailable("pose tracker"))?;

        let telemetry = self.hardware.telemetry();
        self.estimator.add_sensor_data(
            telemetry.rpy.x,
            telemetry.rpy.y,
            telemetry.linear_acceleration.z,
        );
        let thrust_gain = self.estimator.thrust_gain();

        self.log.write_row(
            STREAM,
            &[tracking.x, tracking.y, tracking.z, tracking.yaw, thrust_gain],
        );

        Ok(VisualServoingSensorData {
            tracking,
            velocity: VelocityYawRate::new(
                telemetry.velocity.x,
                telemetry.velocity.y,
                telemetry.velocity.z,
                telemetry.omega.z,
            ),
            thrust_gain,
        })
    }

    fn send_hardware_commands(&mut self, control: &RollPitchYawRateThrust) -> Result<(), UavError> {
        self.estimator.add_thrust_command(control.thrust);
        self.hardware.send_attitude_rate_thrust(*control)
    }

    fn on_new_goal(&mut self) {
        self.estimator.clear_buffer();
    }
}

/// 相对位姿视觉伺服 connector
pub type RelativePoseVisualServoingDroneConnector =
    Connector<VisualServoingBinding, RelativePoseVisualServoingController>;

impl RelativePoseVisualServoingDroneConnector {
    /// 组装视觉伺服 connector
    pub fn create(
        hardware: Arc<dyn UavHardware>,
        tracker: Arc<dyn Sensor<PositionYaw>>,
        estimator: Arc<ThrustGainEstimator>,
        log: SharedLogSink,
        config: &UavSystemConfig,
    ) -> Self {
        Connector::new(
            "visual_servoing",
            HardwareGroup::Uav,
            VisualServoingBinding::new(hardware, tracker, estimator, log),
            RelativePoseVisualServoingController::new(
                config.visual_servoing.clone(),
                config.backstepping.gravity,
                config.position_tolerance,
                config.yaw_tolerance,
            ),
        )
    }
}
