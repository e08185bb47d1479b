use std::collections::BTreeMap;

use crate::db_error::Result;
use crate::storage::engine::{Engine, EngineStatus, ScanRange};

// 实现内存引擎
#[derive(Default)]
pub struct Memory(BTreeMap<Vec<u8>, Vec<u8>>);

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for Memory {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.0.insert(key.to_vec(), value);
        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(key).cloned())
    }

    fn exists(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.0.contains_key(key))
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.0.remove(key);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn scan(&mut self, range: ScanRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.0.range(range).map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn status(&mut self) -> Result<EngineStatus> {
        let size = self.0.iter().map(|(k, v)| k.len() + v.len()).sum::<usize>() as u64;
        Ok(EngineStatus {
            name: "memory".to_string(),
            logical_size: size,
            total_count: self.0.len() as u64,
            total_size: size,
            live_size: size,
            garbage_size: 0,
        })
    }
}
