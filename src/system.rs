//! # UAV 系统门面
//!
//! [`UavSystem`] 把硬件端点、推力增益估计器、全部 connector 和
//! 注册表组装在一起，对上层（状态机、控制循环、地面站）提供
//! 类型化的目标设置接口。所有方法 `&self` 且线程安全。

use crate::config::UavSystemConfig;
use crate::connectors::{
    JoystickVelocityDroneConnector, ManualRpytDroneConnector, MpcTrajectoryDroneConnector,
    PositionControllerDroneConnector, QrotorBacksteppingDroneConnector,
    RelativePoseVisualServoingDroneConnector, VelocityControllerDroneConnector,
};
use crate::error::UavError;
use crate::estimation::ThrustGainEstimator;
use crate::hardware::UavHardware;
use crate::recording::{NullSink, SharedLogSink};
use crate::registry::ActiveControllerRegistry;
use crate::sensors::Sensor;
use crate::types::{
    ControllerStatus, EmptyGoal, HardwareGroup, PositionYaw, ReferenceTrajectory, Telemetry,
    VelocityYaw, VelocityYawRate,
};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

/// UAV 系统
pub struct UavSystem {
    hardware: Arc<dyn UavHardware>,
    config: UavSystemConfig,
    estimator: Arc<ThrustGainEstimator>,
    registry: ActiveControllerRegistry,
    position_connector: Arc<PositionControllerDroneConnector>,
    velocity_connector: Arc<VelocityControllerDroneConnector>,
    manual_connector: Arc<ManualRpytDroneConnector>,
    trajectory_connector: Arc<MpcTrajectoryDroneConnector>,
    backstepping_connector: Arc<QrotorBacksteppingDroneConnector>,
    joystick_velocity_connector: Option<Arc<JoystickVelocityDroneConnector>>,
    visual_servoing_connector: Option<Arc<RelativePoseVisualServoingDroneConnector>>,
}

/// [`UavSystem`] 构建器
///
/// 日志接收端默认为 [`NullSink`]；视觉伺服 connector 只在提供了
/// 位姿跟踪器时组装，遥杆速度 connector 只在提供了外部测速
/// 传感器时组装。
pub struct UavSystemBuilder {
    hardware: Arc<dyn UavHardware>,
    config: UavSystemConfig,
    log: SharedLogSink,
    pose_tracker: Option<Arc<dyn Sensor<PositionYaw>>>,
    external_pose_sensor: Option<Arc<dyn Sensor<PositionYaw>>>,
    velocity_sensor: Option<Arc<dyn Sensor<VelocityYawRate>>>,
}

impl UavSystemBuilder {
    /// 从硬件端点开始构建
    pub fn new(hardware: Arc<dyn UavHardware>) -> Self {
        Self {
            hardware,
            config: UavSystemConfig::default(),
            log: Arc::new(NullSink),
            pose_tracker: None,
            external_pose_sensor: None,
            velocity_sensor: None,
        }
    }

    /// 使用给定配置
    pub fn config(mut self, config: UavSystemConfig) -> Self {
        self.config = config;
        self
    }

    /// 飞行数据写入给定接收端
    pub fn log_sink(mut self, log: SharedLogSink) -> Self {
        self.log = log;
        self
    }

    /// 提供视觉目标跟踪器，启用视觉伺服 connector
    pub fn pose_tracker(mut self, tracker: Arc<dyn Sensor<PositionYaw>>) -> Self {
        self.pose_tracker = Some(tracker);
        self
    }

    /// 轨迹跟踪 connector 改用外部位姿传感器
    pub fn external_pose_sensor(mut self, sensor: Arc<dyn Sensor<PositionYaw>>) -> Self {
        self.external_pose_sensor = Some(sensor);
        self
    }

    /// 提供外部测速传感器，启用遥杆速度 connector
    pub fn velocity_sensor(mut self, sensor: Arc<dyn Sensor<VelocityYawRate>>) -> Self {
        self.velocity_sensor = Some(sensor);
        self
    }

    /// 校验配置并组装系统
    ///
    /// # 错误
    ///
    /// [`UavError::Config`] - 配置校验失败
    pub fn build(self) -> Result<UavSystem, UavError> {
        self.config.validate()?;
        let estimator = Arc::new(ThrustGainEstimator::new(self.config.estimator.clone()));

        let joystick_velocity_connector = self.velocity_sensor.map(|sensor| {
            Arc::new(JoystickVelocityDroneConnector::create(
                self.hardware.clone(),
                sensor,
                estimator.clone(),
                self.log.clone(),
                &self.config,
            ))
        });

        let visual_servoing_connector = self.pose_tracker.map(|tracker| {
            Arc::new(RelativePoseVisualServoingDroneConnector::create(
                self.hardware.clone(),
                tracker,
                estimator.clone(),
                self.log.clone(),
                &self.config,
            ))
        });

        Ok(UavSystem {
            position_connector: Arc::new(PositionControllerDroneConnector::create(
                self.hardware.clone(),
                &self.config,
            )),
            velocity_connector: Arc::new(VelocityControllerDroneConnector::create(
                self.hardware.clone(),
                &self.config,
            )),
            manual_connector: Arc::new(ManualRpytDroneConnector::create(
                self.hardware.clone(),
                &self.config,
            )),
            trajectory_connector: Arc::new(MpcTrajectoryDroneConnector::create(
                self.hardware.clone(),
                estimator.clone(),
                self.external_pose_sensor,
                self.log.clone(),
                &self.config,
            )),
            backstepping_connector: Arc::new(QrotorBacksteppingDroneConnector::create(
                self.hardware.clone(),
                estimator.clone(),
                self.log.clone(),
                &self.config,
            )),
            joystick_velocity_connector,
            visual_servoing_connector,
            registry: ActiveControllerRegistry::new(),
            hardware: self.hardware,
            config: self.config,
            estimator,
        })
    }
}

impl UavSystem {
    /// 以默认配置组装系统（仿真和测试的捷径）
    pub fn new(hardware: Arc<dyn UavHardware>, config: UavSystemConfig) -> Result<Self, UavError> {
        UavSystemBuilder::new(hardware).config(config).build()
    }

    /// 起飞
    pub fn take_off(&self) -> Result<(), UavError> {
        info!("commanding takeoff");
        self.hardware.takeoff()
    }

    /// 降落；先终止 UAV 分组的激活控制器
    pub fn land(&self) -> Result<(), UavError> {
        info!("commanding land");
        self.registry.abort(HardwareGroup::Uav);
        self.hardware.land()
    }

    /// 当前遥测快照
    pub fn telemetry(&self) -> Telemetry {
        self.hardware.telemetry()
    }

    /// 设置位置目标并激活内建位置控制
    pub fn set_position_goal(&self, goal: PositionYaw) {
        self.position_connector.set_goal(goal);
        self.registry.set_active(self.position_connector.clone());
    }

    /// 设置速度目标并激活内建速度控制
    pub fn set_velocity_goal(&self, goal: VelocityYaw) {
        self.velocity_connector.set_goal(goal);
        self.registry.set_active(self.velocity_connector.clone());
    }

    /// 设置参考轨迹并激活轨迹跟踪控制
    pub fn set_trajectory_goal(&self, goal: Arc<dyn ReferenceTrajectory>) {
        self.trajectory_connector.set_goal(goal);
        self.registry.set_active(self.trajectory_connector.clone());
    }

    /// 设置参考轨迹并激活反步控制
    pub fn set_backstepping_goal(&self, goal: Arc<dyn ReferenceTrajectory>) {
        self.backstepping_connector.set_goal(goal);
        self.registry.set_active(self.backstepping_connector.clone());
    }

    /// 设置期望相对位姿并激活视觉伺服
    ///
    /// # 错误
    ///
    /// [`UavError::GoalRejected`] - 系统未配置位姿跟踪器
    pub fn set_visual_servoing_goal(&self, goal: PositionYaw) -> Result<(), UavError> {
        let connector = self.visual_servoing_connector.as_ref().ok_or_else(|| {
            UavError::GoalRejected("no pose tracker configured for visual servoing".to_string())
        })?;
        connector.set_goal(goal);
        self.registry.set_active(connector.clone());
        Ok(())
    }

    /// 激活手动遥杆控制
    pub fn enable_manual_control(&self) {
        self.manual_connector.set_goal(EmptyGoal);
        self.registry.set_active(self.manual_connector.clone());
    }

    /// 激活遥杆速度控制（遥杆映射速度期望，外部测速闭环）
    ///
    /// # 错误
    ///
    /// [`UavError::GoalRejected`] - 系统未配置测速传感器
    pub fn enable_joystick_velocity_control(&self) -> Result<(), UavError> {
        let connector = self.joystick_velocity_connector.as_ref().ok_or_else(|| {
            UavError::GoalRejected(
                "no velocity sensor configured for joystick velocity control".to_string(),
            )
        })?;
        connector.set_goal(EmptyGoal);
        self.registry.set_active(connector.clone());
        Ok(())
    }

    /// 当前位置目标
    pub fn position_goal(&self) -> PositionYaw {
        self.position_connector.goal()
    }

    /// 当前速度目标
    pub fn velocity_goal(&self) -> VelocityYaw {
        self.velocity_connector.goal()
    }

    /// 当前轨迹目标
    pub fn trajectory_goal(&self) -> Arc<dyn ReferenceTrajectory> {
        self.trajectory_connector.goal()
    }

    /// 终止分组的激活控制器
    pub fn abort(&self, group: HardwareGroup) {
        self.registry.abort(group);
    }

    /// 执行分组激活控制器的一拍
    pub fn run_active(&self, group: HardwareGroup) -> bool {
        self.registry.run_active(group)
    }

    /// 分组激活控制器的状态
    pub fn status_of(&self, group: HardwareGroup) -> ControllerStatus {
        self.registry.status_of(group)
    }

    /// 分组是否有激活的控制器
    pub fn is_active(&self, group: HardwareGroup) -> bool {
        self.registry.is_active(group)
    }

    /// 人类可读的系统状态摘要
    pub fn system_status(&self) -> String {
        let t = self.telemetry();
        let mut out = String::new();
        let _ = writeln!(out, "UAV status: {}", t.vehicle_state);
        let _ = writeln!(out, "Battery: {:.1}%", t.battery_percent);
        let _ = writeln!(
            out,
            "Position: ({:.2}, {:.2}, {:.2}) yaw {:.2}",
            t.position.x, t.position.y, t.position.z, t.yaw()
        );
        let _ = writeln!(
            out,
            "Velocity: ({:.2}, {:.2}, {:.2})",
            t.velocity.x, t.velocity.y, t.velocity.z
        );
        let _ = writeln!(out, "Armed: {} Pilot override: {}", t.armed, t.pilot_override);
        let _ = writeln!(out, "Thrust gain: {:.3}", self.estimator.thrust_gain());
        for group in HardwareGroup::ALL {
            let _ = writeln!(out, "{} controller: {}", group, self.status_of(group));
        }
        out
    }

    /// 系统配置
    pub fn config(&self) -> &UavSystemConfig {
        &self.config
    }

    /// 共享的推力增益估计器
    pub fn thrust_gain_estimator(&self) -> &Arc<ThrustGainEstimator> {
        &self.estimator
    }
}
