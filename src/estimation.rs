//! # 推力增益估计
//!
//! 归一化推力指令到实际垂向加速度之间的比例增益随电池电压和
//! 桨叶状态漂移。[`ThrustGainEstimator`] 在线估计该增益：指令与
//! 延迟若干周期后的加速度样本配对，在有界缓冲上做最小二乘。
//!
//! 估计器被多个 connector 共享（写入样本、读取增益来自不同
//! 线程），内部用互斥锁保证快照一致。

use crate::config::ThrustGainEstimatorConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::trace;

/// cos(roll)·cos(pitch) 的下限，避免大倾角下补偿发散
const MIN_TILT_COS: f64 = 0.1;

/// 推力增益在线估计器
pub struct ThrustGainEstimator {
    config: ThrustGainEstimatorConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    /// 已下发、尚未与加速度样本配对的推力指令
    pending_commands: VecDeque<f64>,
    /// 配对完成的 (指令, 补偿后加速度) 样本
    samples: VecDeque<(f64, f64)>,
    gain: f64,
}

impl ThrustGainEstimator {
    /// 创建估计器，初始增益取配置的默认值
    ///
    /// 配置需已通过 [`UavSystemConfig::validate`](crate::config::UavSystemConfig::validate)。
    pub fn new(config: ThrustGainEstimatorConfig) -> Self {
        let gain = config.default_gain;
        Self {
            config,
            inner: Mutex::new(Inner {
                pending_commands: VecDeque::new(),
                samples: VecDeque::new(),
                gain,
            }),
        }
    }

    /// 记录一条刚下发的归一化推力指令
    pub fn add_thrust_command(&self, thrust_command: f64) {
        let mut inner = self.inner.lock();
        inner.pending_commands.push_back(thrust_command);
        // 传感器样本长期缺失时丢弃最旧的未配对指令
        let cap = self.config.delay_ticks + self.config.buffer_size;
        while inner.pending_commands.len() > cap {
            inner.pending_commands.pop_front();
        }
    }

    /// 记录一帧姿态 / 垂向加速度样本并更新增益
    ///
    /// 加速度按当前倾角补偿回机体推力轴；样本与
    /// `delay_ticks` 个周期前下发的指令配对。
    pub fn add_sensor_data(&self, roll: f64, pitch: f64, body_z_acceleration: f64) {
        let mut inner = self.inner.lock();
        if inner.pending_commands.len() <= self.config.delay_ticks {
            // 对应的指令还没发出足够久，等下一帧
            return;
        }
        let command = match inner.pending_commands.pop_front() {
            Some(c) => c,
            None => return,
        };

        let tilt_cos = (roll.cos() * pitch.cos()).max(MIN_TILT_COS);
        let compensated = body_z_acceleration / tilt_cos;

        inner.samples.push_back((command, compensated));
        while inner.samples.len() > self.config.buffer_size {
            inner.samples.pop_front();
        }

        let numerator: f64 = inner.samples.iter().map(|(c, a)| c * a).sum();
        let denominator: f64 = inner.samples.iter().map(|(c, _)| c * c).sum();
        if denominator > f64::EPSILON {
            inner.gain = (numerator / denominator)
                .clamp(self.config.min_gain, self.config.max_gain);
            trace!(gain = inner.gain, samples = inner.samples.len(), "thrust gain updated");
        }
    }

    /// 当前增益估计
    pub fn thrust_gain(&self) -> f64 {
        self.inner.lock().gain
    }

    /// 清空样本和未配对指令，增益回退到默认值
    ///
    /// 每次设置新目标时调用：上一段机动的样本对新目标无效。
    pub fn clear_buffer(&self) {
        let mut inner = self.inner.lock();
        inner.pending_commands.clear();
        inner.samples.clear();
        inner.gain = self.config.default_gain;
        trace!("thrust gain estimator buffer cleared");
    }

    /// 当前已配对样本数
    pub fn sample_count(&self) -> usize {
        self.inner.lock().samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn estimator() -> ThrustGainEstimator {
        ThrustGainEstimator::new(ThrustGainEstimatorConfig::default())
    }

    /// 常值指令、无噪声时增益收敛到真值
    #[test]
    fn test_gain_converges_to_true_value() {
        let est = estimator();
        let true_gain = 0.18;
        for _ in 0..20 {
            est.add_thrust_command(55.0);
            est.add_sensor_data(0.0, 0.0, true_gain * 55.0);
        }
        assert!((est.thrust_gain() - true_gain).abs() < 1e-9);
        assert_eq!(est.sample_count(), 10); // 缓冲有界
    }

    /// 倾角补偿：机体 z 轴比力按 cos(r)cos(p) 缩小
    #[test]
    fn test_tilt_compensation() {
        let est = estimator();
        let true_gain = 0.16;
        let (roll, pitch): (f64, f64) = (0.2, -0.1);
        let projection = roll.cos() * pitch.cos();
        for _ in 0..15 {
            est.add_thrust_command(60.0);
            est.add_sensor_data(roll, pitch, true_gain * 60.0 * projection);
        }
        assert!((est.thrust_gain() - true_gain).abs() < 1e-9);
    }

    /// 延迟配对：第 k 条指令与第 k + delay 帧样本配对
    #[test]
    fn test_delay_pairing() {
        let est = estimator(); // delay_ticks = 1
        est.add_thrust_command(50.0);
        est.add_sensor_data(0.0, 0.0, 123.0); // 还没有延迟到位的指令
        assert_eq!(est.sample_count(), 0);

        est.add_thrust_command(50.0);
        est.add_sensor_data(0.0, 0.0, 0.2 * 50.0);
        assert_eq!(est.sample_count(), 1);
        assert!((est.thrust_gain() - 0.2).abs() < 1e-9);
    }

    /// 估计被钳制在配置区间内
    #[test]
    fn test_gain_clamped_to_bounds() {
        let est = estimator();
        for _ in 0..15 {
            est.add_thrust_command(50.0);
            est.add_sensor_data(0.0, 0.0, 100.0); // 远超 max_gain 的表观增益
        }
        assert_eq!(est.thrust_gain(), 0.25);
    }

    /// 清空后增益回到默认值、样本清零
    #[test]
    fn test_clear_resets_to_default() {
        let est = estimator();
        for _ in 0..10 {
            est.add_thrust_command(50.0);
            est.add_sensor_data(0.0, 0.0, 0.22 * 50.0);
        }
        assert!(est.sample_count() > 0);
        est.clear_buffer();
        assert_eq!(est.sample_count(), 0);
        assert_eq!(est.thrust_gain(), 0.16);
    }

    /// 多线程并发读写不丢失一致性（增益始终在合法区间）
    #[test]
    fn test_concurrent_reads_and_writes() {
        let est = Arc::new(estimator());
        let writer = {
            let est = Arc::clone(&est);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    est.add_thrust_command(50.0 + (i % 7) as f64);
                    est.add_sensor_data(0.0, 0.0, 0.16 * 50.0);
                    if i % 100 == 0 {
                        est.clear_buffer();
                    }
                }
            })
        };
        for _ in 0..1000 {
            let g = est.thrust_gain();
            assert!((0.1..=0.25).contains(&g));
        }
        writer.join().unwrap();
    }
}
