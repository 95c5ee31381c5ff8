//! 遥杆速度 connector
//!
//! 遥杆通道取自遥测，速度反馈来自外部测速传感器。传感器无数据
//! 时本拍判定为传感器失效（Critical），不下发指令。

use crate::config::UavSystemConfig;
use crate::connectors::{Connector, HardwareBinding};
use crate::controllers::{JoystickVelocityController, JoystickVelocitySensorData};
use crate::error::UavError;
use crate::estimation::ThrustGainEstimator;
use crate::hardware::UavHardware;
use crate::recording::SharedLogSink;
use crate::sensors::Sensor;
use crate::types::{HardwareGroup, Joystick, RollPitchYawRateThrust, VelocityYawRate};
use std::sync::Arc;

const STREAM: &str = "joystick_velocity";
const COLUMNS: [&str; 6] = ["vx", "vy", "vz", "roll_cmd", "pitch_cmd", "thrust_cmd"];

/// 遥杆速度控制的硬件绑定
pub struct JoystickVelocityBinding {
    hardware: Arc<dyn UavHardware>,
    velocity_sensor: Arc<dyn Sensor<VelocityYawRate>>,
    estimator: Arc<ThrustGainEstimator>,
    log: SharedLogSink,
    last_velocity: VelocityYawRate,
}

impl JoystickVelocityBinding {
    fn new(
        hardware: Arc<dyn UavHardware>,
        velocity_sensor: Arc<dyn Sensor<VelocityYawRate>>,
        estimator: Arc<ThrustGainEstimator>,
        log: SharedLogSink,
    ) -> Self {
        log.write_header(STREAM, &COLUMNS);
        Self {
            hardware,
            velocity_sensor,
            estimator,
            log,
            last_velocity: VelocityYawRate::default(),
        }
    }
}

impl HardwareBinding for JoystickVelocityBinding {
    type Sensor = JoystickVelocitySensorData;
    type Control = RollPitchYawRateThrust;

    fn extract_sensor_data(&mut self) -> Result<JoystickVelocitySensorData, UavError> {
        let velocity = self
            .velocity_sensor
            .read()
            .ok_or(UavError::SensorUnavailable("velocity sensor"))?;
        self.last_velocity = velocity;

        let telemetry = self.hardware.telemetry();
        self.estimator.add_sensor_data(
            telemetry.rpy.x,
            telemetry.rpy.y,
            telemetry.linear_acceleration.z,
        );
        Ok(JoystickVelocitySensorData {
            joystick: Joystick(telemetry.rc_channels),
            velocity,
            yaw: telemetry.yaw(),
            thrust_gain: self.estimator.thrust_gain(),
        })
    }

    fn send_hardware_commands(&mut self, control: &RollPitchYawRateThrust) -> Result<(), UavError> {
        self.estimator.add_thrust_command(control.thrust);
        self.log.write_row(
            STREAM,
            &[
                self.last_velocity.x,
                self.last_velocity.y,
                self.last_velocity.z,
                control.roll,
                control.pitch,
                control.thrust,
            ],
        );
        self.hardware.send_attitude_rate_thrust(*control)
    }

    fn on_new_goal(&mut self) {
        self.estimator.clear_buffer();
    }
}

/// 遥杆速度 connector
pub type JoystickVelocityDroneConnector =
    Connector<JoystickVelocityBinding, JoystickVelocityController>;

impl JoystickVelocityDroneConnector {
    /// 组装遥杆速度 connector
    pub fn create(
        hardware: Arc<dyn UavHardware>,
        velocity_sensor: Arc<dyn Sensor<VelocityYawRate>>,
        estimator: Arc<ThrustGainEstimator>,
        log: SharedLogSink,
        config: &UavSystemConfig,
    ) -> Self {
        Connector::new(
            "joystick_velocity",
            HardwareGroup::Uav,
            JoystickVelocityBinding::new(hardware, velocity_sensor, estimator, log),
            JoystickVelocityController::new(
                config.joystick_velocity.clone(),
                config.backstepping.gravity,
            ),
        )
    }
}
