//! 内建速度控制 connector

use crate::config::UavSystemConfig;
use crate::connectors::{Connector, HardwareBinding};
use crate::controllers::BuiltInVelocityController;
use crate::error::UavError;
use crate::hardware::UavHardware;
use crate::types::{HardwareGroup, VelocityYaw};
use std::sync::Arc;

/// 速度控制的硬件绑定：遥测取速度，指令走制导速度原语
pub struct VelocityBinding {
    hardware: Arc<dyn UavHardware>,
}

impl HardwareBinding for VelocityBinding {
    type Sensor = VelocityYaw;
    type Control = VelocityYaw;

    fn extract_sensor_data(&mut self) -> Result<VelocityYaw, UavError> {
        let t = self.hardware.telemetry();
        Ok(VelocityYaw::new(t.velocity.x, t.velocity.y, t.velocity.z, t.yaw()))
    }

    fn send_hardware_commands(&mut self, control: &VelocityYaw) -> Result<(), UavError> {
        self.hardware.send_velocity(control.velocity(), control.yaw)
    }
}

/// 内建速度控制 connector
pub type VelocityControllerDroneConnector = Connector<VelocityBinding, BuiltInVelocityController>;

impl VelocityControllerDroneConnector {
    /// 组装速度控制 connector
    pub fn create(hardware: Arc<dyn UavHardware>, config: &UavSystemConfig) -> Self {
        Connector::new(
            "velocity",
            HardwareGroup::Uav,
            VelocityBinding { hardware },
            BuiltInVelocityController::new(config.velocity_tolerance, config.yaw_tolerance),
        )
    }
}
