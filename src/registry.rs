//! # 激活控制器注册表
//!
//! 每个硬件分组一个槽位，锁与槽位内容绑在同一个结构里：持有锁
//! 就持有该分组的全部可变状态，不存在锁表和数据表失配的可能。
//!
//! 不变量：任一时刻每个分组最多一个激活 connector；`run_active`
//! 在槽位锁内执行 `run()`，与同分组的激活 / 终止串行化；不同分
//! 组互不阻塞。硬件写入失败的 connector 被当场终止——继续逐拍
//! 重试写入没有意义；传感器失效是瞬态的，connector 保持激活。

use crate::connectors::ControllerConnector;
use crate::types::{ControllerStatus, HardwareGroup};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 分组槽位：锁保护且仅保护本分组的激活 connector
struct GroupSlot {
    active: Mutex<Option<Arc<dyn ControllerConnector>>>,
}

/// 激活控制器注册表
pub struct ActiveControllerRegistry {
    slots: [GroupSlot; HardwareGroup::ALL.len()],
}

impl ActiveControllerRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            slots: HardwareGroup::ALL.map(|_| GroupSlot {
                active: Mutex::new(None),
            }),
        }
    }

    fn slot(&self, group: HardwareGroup) -> &GroupSlot {
        &self.slots[group.index()]
    }

    /// 激活 connector，替换其分组原有的激活者
    ///
    /// 同一个 connector 重复激活是幂等的（指针比较），不产生
    /// 替换动作。
    pub fn set_active(&self, connector: Arc<dyn ControllerConnector>) {
        let group = connector.group();
        let mut active = self.slot(group).active.lock();
        match active.as_ref() {
            Some(current) if Arc::ptr_eq(current, &connector) => {
                debug!(%group, connector = connector.name(), "connector already active");
            }
            _ => {
                info!(%group, connector = connector.name(), "activating controller");
                *active = Some(connector);
            }
        }
    }

    /// 终止分组的激活 connector；分组为空时是无害的空操作
    pub fn abort(&self, group: HardwareGroup) {
        let mut active = self.slot(group).active.lock();
        if let Some(connector) = active.take() {
            info!(%group, connector = connector.name(), "aborting active controller");
        }
    }

    /// 执行分组激活 connector 的一拍
    ///
    /// 整个 `run()` 在槽位锁内执行；分组为空时返回 `false`。
    /// 硬件写入失败时终止该 connector，槽位清空。
    pub fn run_active(&self, group: HardwareGroup) -> bool {
        let mut active = self.slot(group).active.lock();
        let Some(connector) = active.as_ref().cloned() else {
            return false;
        };
        if connector.run() {
            return true;
        }
        if connector.hardware_faulted() {
            warn!(
                %group,
                connector = connector.name(),
                "hardware fault, aborting active controller"
            );
            *active = None;
        }
        false
    }

    /// 分组激活 connector 的状态；为空时 `NotEngaged`
    pub fn status_of(&self, group: HardwareGroup) -> ControllerStatus {
        let active = self.slot(group).active.lock();
        active
            .as_ref()
            .map(|c| c.status())
            .unwrap_or(ControllerStatus::NotEngaged)
    }

    /// 分组当前是否有激活的 connector
    pub fn is_active(&self, group: HardwareGroup) -> bool {
        self.slot(group).active.lock().is_some()
    }
}

impl Default for ActiveControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConnector {
        group: HardwareGroup,
        runs: AtomicUsize,
    }

    impl CountingConnector {
        fn new(group: HardwareGroup) -> Arc<Self> {
            Arc::new(Self {
                group,
                runs: AtomicUsize::new(0),
            })
        }
    }

    impl ControllerConnector for CountingConnector {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn group(&self) -> HardwareGroup {
            self.group
        }
        fn run(&self) -> bool {
            self.runs.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn status(&self) -> ControllerStatus {
            ControllerStatus::Active
        }
        fn hardware_faulted(&self) -> bool {
            false
        }
    }

    /// 每拍都失败的 connector，失败原因可配置
    struct FailingConnector {
        fault: bool,
    }

    impl ControllerConnector for FailingConnector {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn group(&self) -> HardwareGroup {
            HardwareGroup::Uav
        }
        fn run(&self) -> bool {
            false
        }
        fn status(&self) -> ControllerStatus {
            ControllerStatus::Critical
        }
        fn hardware_faulted(&self) -> bool {
            self.fault
        }
    }

    #[test]
    fn test_empty_registry_is_inert() {
        let registry = ActiveControllerRegistry::new();
        for group in HardwareGroup::ALL {
            assert!(!registry.run_active(group));
            assert_eq!(registry.status_of(group), ControllerStatus::NotEngaged);
            registry.abort(group); // 空操作，不报错
            assert!(!registry.is_active(group));
        }
    }

    #[test]
    fn test_at_most_one_active_per_group() {
        let registry = ActiveControllerRegistry::new();
        let first = CountingConnector::new(HardwareGroup::Uav);
        let second = CountingConnector::new(HardwareGroup::Uav);

        registry.set_active(first.clone());
        registry.set_active(second.clone());
        assert!(registry.run_active(HardwareGroup::Uav));

        // 只有后激活者运行
        assert_eq!(first.runs.load(Ordering::SeqCst), 0);
        assert_eq!(second.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_idempotent_set_active() {
        let registry = ActiveControllerRegistry::new();
        let connector = CountingConnector::new(HardwareGroup::Uav);
        registry.set_active(connector.clone());
        registry.set_active(connector.clone());
        registry.set_active(connector.clone());
        assert!(registry.is_active(HardwareGroup::Uav));
        registry.run_active(HardwareGroup::Uav);
        assert_eq!(connector.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abort_clears_group() {
        let registry = ActiveControllerRegistry::new();
        let connector = CountingConnector::new(HardwareGroup::Uav);
        registry.set_active(connector.clone());
        registry.abort(HardwareGroup::Uav);
        assert!(!registry.run_active(HardwareGroup::Uav));
        assert_eq!(registry.status_of(HardwareGroup::Uav), ControllerStatus::NotEngaged);
        assert_eq!(connector.runs.load(Ordering::SeqCst), 0);
    }

    /// 硬件故障当场终止激活 connector，槽位清空
    #[test]
    fn test_hardware_fault_aborts_active_connector() {
        let registry = ActiveControllerRegistry::new();
        registry.set_active(Arc::new(FailingConnector { fault: true }));
        assert!(!registry.run_active(HardwareGroup::Uav));
        assert!(!registry.is_active(HardwareGroup::Uav));
        assert_eq!(
            registry.status_of(HardwareGroup::Uav),
            ControllerStatus::NotEngaged
        );
    }

    /// 传感器失效是瞬态的：connector 保持激活，状态 Critical
    #[test]
    fn test_sensor_failure_keeps_connector_active() {
        let registry = ActiveControllerRegistry::new();
        registry.set_active(Arc::new(FailingConnector { fault: false }));
        assert!(!registry.run_active(HardwareGroup::Uav));
        assert!(registry.is_active(HardwareGroup::Uav));
        assert_eq!(
            registry.status_of(HardwareGroup::Uav),
            ControllerStatus::Critical
        );
    }

    #[test]
    fn test_groups_are_independent() {
        let registry = ActiveControllerRegistry::new();
        let uav = CountingConnector::new(HardwareGroup::Uav);
        let arm = CountingConnector::new(HardwareGroup::Arm);
        registry.set_active(uav.clone());
        registry.set_active(arm.clone());

        registry.abort(HardwareGroup::Uav);
        assert!(!registry.is_active(HardwareGroup::Uav));
        assert!(registry.is_active(HardwareGroup::Arm));
        assert!(registry.run_active(HardwareGroup::Arm));
        assert_eq!(arm.runs.load(Ordering::SeqCst), 1);
    }

    /// 多线程下 set_active / abort / run_active 交错，不变量保持
    #[test]
    fn test_concurrent_activate_abort_run() {
        let registry = Arc::new(ActiveControllerRegistry::new());
        let a = CountingConnector::new(HardwareGroup::Uav);
        let b = CountingConnector::new(HardwareGroup::Uav);

        let mut handles = Vec::new();
        for connector in [a.clone(), b.clone()] {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..500 {
                    registry.set_active(connector.clone() as Arc<dyn ControllerConnector>);
                    registry.run_active(HardwareGroup::Uav);
                    registry.abort(HardwareGroup::Uav);
                }
            }));
        }
        for _ in 0..500 {
            registry.run_active(HardwareGroup::Uav);
            let status = registry.status_of(HardwareGroup::Uav);
            assert!(matches!(
                status,
                ControllerStatus::Active | ControllerStatus::NotEngaged
            ));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // 压测结束后终止，注册表回到空闲
        registry.abort(HardwareGroup::Uav);
        assert!(!registry.is_active(HardwareGroup::Uav));
    }
}
