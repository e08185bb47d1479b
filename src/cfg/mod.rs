mod config;

use std::path::Path;

use crate::db_error::Result;
pub use config::{Config, ConfigBuilder, ConfigWrapper, StorageEngine, SyncStrategy};

/// 默认配置文件位置
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// 读取配置文件；文件不存在时使用默认配置
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}
