//! 手动遥杆 connector

use crate::config::UavSystemConfig;
use crate::connectors::{Connector, HardwareBinding};
use crate::controllers::ManualRpytController;
use crate::error::UavError;
use crate::hardware::UavHardware;
use crate::types::{HardwareGroup, Joystick, RollPitchYawRateThrust};
use std::sync::Arc;

/// 手动控制的硬件绑定：遥测取遥杆通道，指令走姿态推力原语
pub struct ManualRpytBinding {
    hardware: Arc<dyn UavHardware>,
}

impl HardwareBinding for ManualRpytBinding {
    type Sensor = Joystick;
    type Control = RollPitchYawRateThrust;

    fn extract_sensor_data(&mut self) -> Result<Joystick, UavError> {
        Ok(Joystick(self.hardware.telemetry().rc_channels))
    }

    fn send_hardware_commands(&mut self, control: &RollPitchYawRateThrust) -> Result<(), UavError> {
        self.hardware.send_attitude_rate_thrust(*control)
    }
}

/// 手动遥杆 connector
pub type ManualRpytDroneConnector = Connector<ManualRpytBinding, ManualRpytController>;

impl ManualRpytDroneConnector {
    /// 组装手动遥杆 connector
    pub fn create(hardware: Arc<dyn UavHardware>, config: &UavSystemConfig) -> Self {
        Connector::new(
            "manual_rpyt",
            HardwareGroup::Uav,
            ManualRpytBinding { hardware },
            ManualRpytController::new(config.manual.clone()),
        )
    }
}
