use tracing::debug;

use crate::cfg::{Config, StorageEngine};
use crate::db_error::{Error, Result};
use crate::sql::Relation;
use crate::storage::bitcask::BitCask;
use crate::storage::engine::{Engine, EngineStatus};
use crate::storage::memory::Memory;
use crate::utils::{Raw, ValueCodec};

/// 表在存储引擎中的键前缀
const TABLE_PREFIX: &[u8] = b"table/";

/// Catalog trait
/// 以整张表为粒度读写关系：模式、数据、约束与反向引用一起存取
pub trait Catalog {
    /// 读取一张表，不存在时返回 None
    fn load(&mut self, name: &str) -> Result<Option<Relation>>;

    /// 新建或整体替换一张表
    fn save(&mut self, relation: &Relation) -> Result<()>;

    fn delete(&mut self, name: &str) -> Result<()>;

    /// 所有表名，按字典序
    fn tables(&mut self) -> Result<Vec<String>>;

    fn exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.load(name)?.is_some())
    }
}

/// 基于任意存储引擎的 Catalog 实现
pub struct EngineCatalog {
    engine: Box<dyn Engine>,
}

impl EngineCatalog {
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self { engine }
    }

    /// 按配置选择存储引擎
    pub fn open(config: &Config) -> Result<Self> {
        let engine: Box<dyn Engine> = match config.storage_engine {
            StorageEngine::Memory => Box::new(Memory::new()),
            StorageEngine::Bitcask => Box::new(BitCask::open_with_config(config)?),
        };
        Ok(Self::new(engine))
    }

    pub fn status(&mut self) -> Result<EngineStatus> {
        self.engine.status()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.engine.flush()
    }

    fn key(name: &str) -> Vec<u8> {
        [TABLE_PREFIX, name.as_bytes()].concat()
    }
}

impl Catalog for EngineCatalog {
    fn load(&mut self, name: &str) -> Result<Option<Relation>> {
        self.engine.get(&Self::key(name))?.map(|bytes| Relation::decode(&bytes)).transpose()
    }

    fn save(&mut self, relation: &Relation) -> Result<()> {
        debug!(table = %relation.name, rows = relation.rows.len(), "saving table");
        self.engine.set(&Self::key(&relation.name), relation.encode()?)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        debug!(table = %name, "deleting table");
        self.engine.delete(&Self::key(name))
    }

    /// 只查键，不解码整张表
    fn exists(&mut self, name: &str) -> Result<bool> {
        self.engine.exists(&Self::key(name))
    }

    fn tables(&mut self) -> Result<Vec<String>> {
        self.engine
            .scan_prefix(TABLE_PREFIX)?
            .into_iter()
            .map(|(key, _)| {
                String::from_utf8(key[TABLE_PREFIX.len()..].to_vec())
                    .map_err(|_| Error::InvalidData(format!("invalid table key {}", Raw::bytes(&key))))
            })
            .collect()
    }
}
