//! # 系统配置
//!
//! 守卫边界、控制器容差和各 connector 的参数。支持从 TOML 文件
//! 加载，加载后必须通过 [`UavSystemConfig::validate`] 校验：
//! 非法边界（非正的上限、颠倒的上下界）在构造期拒绝，不做静默钳制。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UavSystemConfig {
    /// 起飞目标高度（m）
    pub takeoff_height: f64,

    /// 判定已着陆的高度阈值（m）
    pub landed_altitude: f64,

    /// 允许起飞 / 继续悬停的最低电量百分比
    pub min_battery_percent: f64,

    /// 位置目标允许的最大高度（m）
    pub max_goal_altitude: f64,

    /// 位置目标允许的最大水平距离（m）
    pub max_goal_range: f64,

    /// 速度目标允许的最大模长（m/s）
    pub max_goal_velocity: f64,

    /// 位置收敛容差（m，每轴）
    pub position_tolerance: f64,

    /// 偏航收敛容差（rad）
    pub yaw_tolerance: f64,

    /// 速度收敛容差（m/s，每轴）
    pub velocity_tolerance: f64,

    /// 控制循环频率（Hz）
    pub loop_frequency_hz: f64,

    /// 轨迹跟踪（MPC 风格）connector 参数
    pub mpc: MpcConnectorConfig,

    /// 反步推力动力学 connector 参数
    pub backstepping: BacksteppingConfig,

    /// 推力增益估计器参数
    pub estimator: ThrustGainEstimatorConfig,

    /// 手动遥杆映射参数
    pub manual: ManualRpytConfig,

    /// 遥杆速度控制参数
    pub joystick_velocity: JoystickVelocityConfig,

    /// 视觉伺服控制器参数
    pub visual_servoing: VisualServoingConfig,
}

impl Default for UavSystemConfig {
    fn default() -> Self {
        Self {
            takeoff_height: 0.5,
            landed_altitude: 0.1,
            min_battery_percent: 40.0,
            max_goal_altitude: 100.0,
            max_goal_range: 100.0,
            max_goal_velocity: 2.0,
            position_tolerance: 0.1,
            yaw_tolerance: 0.1,
            velocity_tolerance: 0.1,
            loop_frequency_hz: 50.0,
            mpc: MpcConnectorConfig::default(),
            backstepping: BacksteppingConfig::default(),
            estimator: ThrustGainEstimatorConfig::default(),
            manual: ManualRpytConfig::default(),
            joystick_velocity: JoystickVelocityConfig::default(),
            visual_servoing: VisualServoingConfig::default(),
        }
    }
}

impl UavSystemConfig {
    /// 从 TOML 文件加载并校验
    ///
    /// # 错误
    ///
    /// - [`ConfigError::Io`] - 文件不可读
    /// - [`ConfigError::Parse`] - TOML 语法或字段类型错误
    /// - [`ConfigError::InvalidValue`] - 数值校验失败
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验所有边界值
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be positive and finite, got {value}"),
                })
            }
        }

        positive("takeoff_height", self.takeoff_height)?;
        positive("landed_altitude", self.landed_altitude)?;
        positive("max_goal_altitude", self.max_goal_altitude)?;
        positive("max_goal_range", self.max_goal_range)?;
        positive("max_goal_velocity", self.max_goal_velocity)?;
        positive("position_tolerance", self.position_tolerance)?;
        positive("yaw_tolerance", self.yaw_tolerance)?;
        positive("velocity_tolerance", self.velocity_tolerance)?;
        positive("loop_frequency_hz", self.loop_frequency_hz)?;

        if !(0.0..=100.0).contains(&self.min_battery_percent) {
            return Err(ConfigError::InvalidValue {
                field: "min_battery_percent",
                reason: format!("must be within [0, 100], got {}", self.min_battery_percent),
            });
        }

        if self.mpc.delay_buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mpc.delay_buffer_size",
                reason: "must be at least 1".to_string(),
            });
        }

        positive("backstepping.mass", self.backstepping.mass)?;
        positive("backstepping.gravity", self.backstepping.gravity)?;
        for i in 0..4 {
            if self.backstepping.lower_bounds[i] >= self.backstepping.upper_bounds[i] {
                return Err(ConfigError::InvalidValue {
                    field: "backstepping.lower_bounds",
                    reason: format!(
                        "axis {i}: lower bound {} must be below upper bound {}",
                        self.backstepping.lower_bounds[i], self.backstepping.upper_bounds[i]
                    ),
                });
            }
        }

        if self.estimator.buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "estimator.buffer_size",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("estimator.default_gain", self.estimator.default_gain)?;
        if self.estimator.min_gain >= self.estimator.max_gain {
            return Err(ConfigError::InvalidValue {
                field: "estimator.min_gain",
                reason: format!(
                    "min gain {} must be below max gain {}",
                    self.estimator.min_gain, self.estimator.max_gain
                ),
            });
        }

        positive("manual.max_tilt", self.manual.max_tilt)?;
        positive("manual.max_yaw_rate", self.manual.max_yaw_rate)?;
        if self.manual.min_thrust >= self.manual.max_thrust {
            return Err(ConfigError::InvalidValue {
                field: "manual.min_thrust",
                reason: format!(
                    "min thrust {} must be below max thrust {}",
                    self.manual.min_thrust, self.manual.max_thrust
                ),
            });
        }

        positive("joystick_velocity.max_velocity", self.joystick_velocity.max_velocity)?;
        positive("joystick_velocity.max_yaw_rate", self.joystick_velocity.max_yaw_rate)?;
        positive("joystick_velocity.velocity_gain", self.joystick_velocity.velocity_gain)?;

        positive("visual_servoing.position_gain", self.visual_servoing.position_gain)?;
        positive("visual_servoing.yaw_gain", self.visual_servoing.yaw_gain)?;

        Ok(())
    }
}

/// 轨迹跟踪 connector 参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcConnectorConfig {
    /// 历史控制量延迟环缓冲长度
    pub delay_buffer_size: usize,

    /// 位置误差比例增益
    pub position_gain: f64,

    /// 速度误差比例增益
    pub velocity_gain: f64,

    /// 偏航误差比例增益
    pub yaw_gain: f64,
}

impl Default for MpcConnectorConfig {
    fn default() -> Self {
        Self {
            delay_buffer_size: 7,
            position_gain: 1.0,
            velocity_gain: 1.6,
            yaw_gain: 1.0,
        }
    }
}

/// 反步 connector 参数
///
/// 上下界数组的轴序为 roll、pitch、yaw_rate、归一化推力。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacksteppingConfig {
    /// 整机质量（kg）
    pub mass: f64,

    /// 重力加速度（m/s²）
    pub gravity: f64,

    /// 机体惯量对角线（kg·m²）
    pub inertia: [f64; 3],

    /// 各轴指令下界
    pub lower_bounds: [f64; 4],

    /// 各轴指令上界
    pub upper_bounds: [f64; 4],

    /// 位置误差增益
    pub position_gain: f64,

    /// 速度误差增益
    pub velocity_gain: f64,

    /// 姿态误差增益
    pub attitude_gain: f64,

    /// 角速度误差增益
    pub omega_gain: f64,
}

impl Default for BacksteppingConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            gravity: 9.81,
            inertia: [0.0023, 0.0023, 0.004],
            lower_bounds: [-0.785, -0.785, -1.5708, 0.8],
            upper_bounds: [0.785, 0.785, 1.5708, 1.2],
            position_gain: 4.0,
            velocity_gain: 4.0,
            attitude_gain: 12.0,
            omega_gain: 6.0,
        }
    }
}

/// 推力增益估计器参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrustGainEstimatorConfig {
    /// 样本缓冲长度
    pub buffer_size: usize,

    /// 指令到加速度响应的执行延迟（控制周期数）
    pub delay_ticks: usize,

    /// 初始 / 清空后回退的增益
    pub default_gain: f64,

    /// 估计增益下限
    pub min_gain: f64,

    /// 估计增益上限
    pub max_gain: f64,
}

impl Default for ThrustGainEstimatorConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10,
            delay_ticks: 1,
            default_gain: 0.16,
            min_gain: 0.1,
            max_gain: 0.25,
        }
    }
}

/// 手动遥杆到姿态指令的映射参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualRpytConfig {
    /// 满杆对应的最大倾角（rad）
    pub max_tilt: f64,

    /// 满杆对应的最大偏航角速度（rad/s）
    pub max_yaw_rate: f64,

    /// 推力杆下限对应的归一化推力
    pub min_thrust: f64,

    /// 推力杆上限对应的归一化推力
    pub max_thrust: f64,
}

impl Default for ManualRpytConfig {
    fn default() -> Self {
        Self {
            max_tilt: 0.785,
            max_yaw_rate: 1.5708,
            min_thrust: 0.8,
            max_thrust: 1.2,
        }
    }
}

/// 遥杆速度控制参数
///
/// 遥杆映射到速度期望，速度闭环用外部测速反馈。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickVelocityConfig {
    /// 满杆对应的最大速度（m/s，每轴）
    pub max_velocity: f64,

    /// 满杆对应的最大偏航角速度（rad/s）
    pub max_yaw_rate: f64,

    /// 速度误差到期望加速度的增益
    pub velocity_gain: f64,
}

impl Default for JoystickVelocityConfig {
    fn default() -> Self {
        Self {
            max_velocity: 1.0,
            max_yaw_rate: 1.5708,
            velocity_gain: 1.6,
        }
    }
}

/// 视觉伺服控制器参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualServoingConfig {
    /// 相对位姿误差到速度指令的增益
    pub position_gain: f64,

    /// 相对偏航误差到偏航角速度的增益
    pub yaw_gain: f64,
}

impl Default for VisualServoingConfig {
    fn default() -> Self {
        Self {
            position_gain: 0.5,
            yaw_gain: 0.8,
        }
    }
}
