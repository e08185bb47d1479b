use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db_error::{Error, Result};

/// 配置文件的顶层结构：`[config]` 表
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigWrapper {
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // 存储路径（目录）
    pub storage_path: PathBuf,

    // 存储引擎
    pub storage_engine: StorageEngine,

    //同步策略
    pub sync_strategy: SyncStrategy,

    //同步间隔，仅对 SyncStrategy::Every 生效
    pub fsync_interval_ms: u64,

    // 当无效数据占用文件的百分比超过该阈值（0~100）时，打开数据文件时自动压缩
    pub compaction_threshold: f64,

    // 日志级别，RUST_LOG 环境变量优先
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./db"),
            storage_engine: StorageEngine::default(),
            sync_strategy: SyncStrategy::default(),
            fsync_interval_ms: 1000,
            compaction_threshold: 50.0,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub enum StorageEngine {
    // 纯内存，进程退出即丢失
    Memory,
    // 追加写日志文件
    #[default]
    Bitcask,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub enum SyncStrategy {
    // 每次写入数据立马同步到磁盘
    Always,
    /// 距离上次同步超过 fsync_interval_ms 时，在写入后同步
    Every,
    // 仅依赖OS 缓冲磁盘
    #[default]
    Never,
}

pub struct ConfigBuilder {
    pub inner: Config,
}

impl ConfigBuilder {
    pub fn storage_engine(mut self, engine: StorageEngine) -> Self {
        self.inner.storage_engine = engine;
        self
    }
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.inner.sync_strategy = strategy;
        self
    }
    pub fn fsync_interval_ms(mut self, ms: u64) -> Self {
        self.inner.fsync_interval_ms = ms;
        self
    }
    pub fn compaction_threshold(mut self, compact: f64) -> Self {
        self.inner.compaction_threshold = compact;
        self
    }
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.inner.log_level = level.into();
        self
    }

    fn validate(&self) -> Result<()> {
        self.inner.validate()
    }

    pub fn build(self) -> Result<Config> {
        self.validate()?;
        Ok(self.inner)
    }
}

impl Config {
    pub fn builder<P: Into<PathBuf>>(storage_path: P) -> ConfigBuilder {
        ConfigBuilder {
            inner: Config {
                storage_path: storage_path.into(),
                ..Default::default()
            },
        }
    }

    /// 读取并解析 TOML 配置文件
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        // 1、读取配置文件
        let content = std::fs::read_to_string(path)?;
        // 2、解析配置文件
        let wrapper: ConfigWrapper = toml::from_str(&content)?;
        // 3、校验并返回实际的配置
        wrapper.config.validate()?;
        Ok(wrapper.config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.compaction_threshold) {
            return Err(Error::ConfigError(format!(
                "compaction_threshold must be within 0..=100, got {}",
                self.compaction_threshold
            )));
        }
        if self.log_level.trim().is_empty() {
            return Err(Error::ConfigError("log_level must not be empty".to_string()));
        }
        Ok(())
    }
}
