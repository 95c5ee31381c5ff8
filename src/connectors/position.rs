//! 内建位置控制 connector

use crate::config::UavSystemConfig;
use crate::connectors::{Connector, HardwareBinding};
use crate::controllers::BuiltInPositionController;
use crate::error::UavError;
use crate::hardware::UavHardware;
use crate::types::{HardwareGroup, PositionYaw};
use std::sync::Arc;

/// 位置控制的硬件绑定：遥测取位姿，指令走航点原语
pub struct PositionBinding {
    hardware: Arc<dyn UavHardware>,
}

impl HardwareBinding for PositionBinding {
    type Sensor = PositionYaw;
    type Control = PositionYaw;

    fn extract_sensor_data(&mut self) -> Result<PositionYaw, UavError> {
        let t = self.hardware.telemetry();
        Ok(PositionYaw::new(t.position.x, t.position.y, t.position.z, t.yaw()))
    }

    fn send_hardware_commands(&mut self, control: &PositionYaw) -> Result<(), UavError> {
        self.hardware.send_waypoint(control.position(), control.yaw)
    }
}

/// 内建位置控制 connector
pub type PositionControllerDroneConnector = Connector<PositionBinding, BuiltInPositionController>;

impl PositionControllerDroneConnector {
    /// 组装位置控制 connector
    pub fn create(hardware: Arc<dyn UavHardware>, config: &UavSystemConfig) -> Self {
        Connector::new(
            "position",
            HardwareGroup::Uav,
            PositionBinding { hardware },
            BuiltInPositionController::new(config.position_tolerance, config.yaw_tolerance),
        )
    }
}
