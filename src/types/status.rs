//! 控制器状态与硬件分组

use serde::{Deserialize, Serialize};
use std::fmt;

/// 硬件分组
///
/// 每个分组同一时刻最多有一个激活的 connector。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareGroup {
    /// 飞行器本体
    Uav,
    /// 机载机械臂
    Arm,
}

impl HardwareGroup {
    /// 全部分组（注册表按此初始化槽位）
    pub const ALL: [HardwareGroup; 2] = [HardwareGroup::Uav, HardwareGroup::Arm];

    pub(crate) fn index(self) -> usize {
        match self {
            HardwareGroup::Uav => 0,
            HardwareGroup::Arm => 1,
        }
    }
}

impl fmt::Display for HardwareGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareGroup::Uav => write!(f, "UAV"),
            HardwareGroup::Arm => write!(f, "Arm"),
        }
    }
}

/// Connector 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerStatus {
    /// 正在朝目标收敛
    Active,
    /// 已收敛到目标容差内
    Completed,
    /// 本周期失败（传感器缺失或硬件故障），未下发指令
    Critical,
    /// 该分组当前没有激活的 connector
    NotEngaged,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerStatus::Active => write!(f, "Active"),
            ControllerStatus::Completed => write!(f, "Completed"),
            ControllerStatus::Critical => write!(f, "Critical"),
            ControllerStatus::NotEngaged => write!(f, "NotEngaged"),
        }
    }
}
