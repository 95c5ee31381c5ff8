//! # 飞行数据记录
//!
//! Connector 每个周期产出一行命名列数据（状态估计、推力增益、
//! 积分器内值），用于离线调参和回放。写入失败只告警不打断控制
//! 循环。测试环境使用 [`NullSink`]。

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// 结构化数据流接收端
pub trait FlightLogSink: Send + Sync {
    /// 声明数据流的列名，每个流只应调用一次
    fn write_header(&self, stream: &str, columns: &[&str]);

    /// 追加一行数据，列序与 header 一致
    fn write_row(&self, stream: &str, values: &[f64]);
}

/// 共享日志接收端句柄
pub type SharedLogSink = Arc<dyn FlightLogSink>;

/// 丢弃所有数据的接收端
pub struct NullSink;

impl FlightLogSink for NullSink {
    fn write_header(&self, _stream: &str, _columns: &[&str]) {}
    fn write_row(&self, _stream: &str, _values: &[f64]) {}
}

/// 每个数据流写一个 CSV 文件的接收端
///
/// 文件名为 `<目录>/<流名>.csv`。
pub struct CsvSink {
    directory: PathBuf,
    writers: Mutex<HashMap<String, BufWriter<File>>>,
}

impl CsvSink {
    /// 在指定目录下创建接收端，目录不存在时自动创建
    pub fn new(directory: impl Into<PathBuf>) -> std::io::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            writers: Mutex::new(HashMap::new()),
        })
    }

    fn with_writer(&self, stream: &str, f: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>) {
        let mut writers = self.writers.lock();
        if !writers.contains_key(stream) {
            let path = self.directory.join(format!("{stream}.csv"));
            match File::create(&path) {
                Ok(file) => {
                    writers.insert(stream.to_string(), BufWriter::new(file));
                }
                Err(e) => {
                    warn!(stream, error = %e, "failed to create flight log file");
                    return;
                }
            }
        }
        if let Some(writer) = writers.get_mut(stream)
            && let Err(e) = f(writer)
        {
            warn!(stream, error = %e, "failed to write flight log row");
        }
    }
}

impl FlightLogSink for CsvSink {
    fn write_header(&self, stream: &str, columns: &[&str]) {
        self.with_writer(stream, |w| {
            writeln!(w, "{}", columns.join(","))?;
            w.flush()
        });
    }

    fn write_row(&self, stream: &str, values: &[f64]) {
        self.with_writer(stream, |w| {
            let row: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
            writeln!(w, "{}", row.join(","))
        });
    }
}
