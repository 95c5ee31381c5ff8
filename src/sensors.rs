//! 外部传感器协作者
//!
//! 部分 connector 依赖飞控遥测之外的传感器（外部测速、视觉目标
//! 跟踪）。传感器可能暂时无数据，`read` 返回 `None` 时 connector
//! 将本周期判定为传感器失效。

use parking_lot::Mutex;

/// 外部传感器
pub trait Sensor<T>: Send + Sync {
    /// 最近一次有效读数，无数据返回 `None`
    fn read(&self) -> Option<T>;
}

/// 可手动写入的仿真传感器
///
/// 测试和仿真中用来模拟跟踪成功 / 失效的切换。
pub struct SettableSensor<T: Clone + Send> {
    value: Mutex<Option<T>>,
}

impl<T: Clone + Send> SettableSensor<T> {
    /// 创建无数据的传感器
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// 写入一个读数
    pub fn set(&self, value: T) {
        *self.value.lock() = Some(value);
    }

    /// 清除读数，后续 `read` 返回 `None`
    pub fn invalidate(&self) {
        *self.value.lock() = None;
    }
}

impl<T: Clone + Send> Default for SettableSensor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Sensor<T> for SettableSensor<T> {
    fn read(&self) -> Option<T> {
        self.value.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionYaw;

    #[test]
    fn test_settable_sensor_lifecycle() {
        let sensor = SettableSensor::<PositionYaw>::new();
        assert!(sensor.read().is_none());
        sensor.set(PositionYaw::new(1.0, 0.0, 2.0, 0.0));
        assert_eq!(sensor.read().unwrap().z, 2.0);
        sensor.invalidate();
        assert!(sensor.read().is_none());
    }
}
