//! 飞控中间件错误类型定义

use thiserror::Error;

/// 系统层错误类型
#[derive(Error, Debug)]
pub enum UavError {
    /// 传感器数据不可用（外部传感器未就绪或跟踪失效）
    ///
    /// 该错误在 connector 内部局部恢复：本周期不下发指令，
    /// 状态标记为 `Critical`，不会向上传播。
    #[error("Sensor data unavailable: {0}")]
    SensorUnavailable(&'static str),

    /// 目标被守卫拒绝（越界或当前模式不接受）
    #[error("Goal rejected: {0}")]
    GoalRejected(String),

    /// 硬件执行原语失败
    #[error("Hardware fault: {0}")]
    HardwareFault(String),

    /// 资源低于安全阈值（如电量不足）
    #[error("Resource below safe threshold: {0}")]
    LowResource(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 配置值非法（越界、符号错误或上下界颠倒）
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// 出错的配置字段
        field: &'static str,
        /// 拒绝原因
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试 UavError 的 Display 实现
    #[test]
    fn test_uav_error_display() {
        let err = UavError::SensorUnavailable("pose tracker");
        assert_eq!(format!("{}", err), "Sensor data unavailable: pose tracker");

        let err = UavError::GoalRejected("altitude above limit".to_string());
        assert!(format!("{}", err).contains("Goal rejected"));

        let err = UavError::LowResource("battery at 10%".to_string());
        assert!(format!("{}", err).contains("safe threshold"));
    }

    /// 测试 From<ConfigError> 转换
    #[test]
    fn test_from_config_error() {
        let config_error = ConfigError::InvalidValue {
            field: "max_goal_velocity",
            reason: "must be positive".to_string(),
        };
        let err: UavError = config_error.into();
        match err {
            UavError::Config(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "max_goal_velocity");
            }
            _ => panic!("Expected Config variant"),
        }
    }
}
