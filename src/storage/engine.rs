use std::ops::Bound;

use serde::Serialize;

use crate::db_error::Result;

/// 扫描范围：起止边界
pub type ScanRange = (Bound<Vec<u8>>, Bound<Vec<u8>>);

/// Engine trait
/// 定义存储引擎的通用行为：按字节存取的有序键值存储
pub trait Engine: Send {
    // 为特定键值Key,设置一个值Value,替代原本已有的值
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()>;

    // 为特定键值Key,获取一个值Value
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    // 删除一个键值Key
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    // 把缓冲区的数据存储到磁盘上
    fn flush(&mut self) -> Result<()>;

    // 扫描指定范围的键值对，结果按 key 有序
    fn scan(&mut self, range: ScanRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn status(&mut self) -> Result<EngineStatus>;

    // 检查键是否存在
    fn exists(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    // 扫描所有以 prefix 开头的键值对
    fn scan_prefix(&mut self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let start = Bound::Included(prefix.to_vec());
        let end = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        self.scan((start, end))
    }
}

/// 前缀扫描的上界：把最后一个非 0xff 字节加一并截断其后的字节
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let idx = prefix.iter().rposition(|b| *b != 0xff)?;
    let mut end = prefix[..=idx].to_vec();
    end[idx] += 1;
    Some(end)
}

/// 定义引擎状态
/// Engine Status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    /// 引擎名称
    pub name: String,
    /// 所有键值的逻辑大小，就是所有键值的长度之和
    pub logical_size: u64,
    /// 所有的键值数量
    pub total_count: u64,
    /// 所有数据的磁盘/内存总占用空间
    pub total_size: u64,
    /// 存活数据的磁盘/内存存储空间
    pub live_size: u64,
    /// 垃圾数据占用的磁盘/内存空间
    pub garbage_size: u64,
}

impl EngineStatus {
    // 计算垃圾数据占用的磁盘空间百分比
    pub fn garbage_rate(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        self.garbage_size as f64 / self.total_size as f64 * 100.0
    }
}
