use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use sha3::{Digest, Sha3_256};
use tracing::{debug, info, warn};

use crate::cfg::{Config, SyncStrategy};
use crate::db_error::Result;
use crate::storage::engine::{Engine, EngineStatus, ScanRange};

/// 目录下唯一的数据文件
pub const LOG_FILE: &str = "catalog.log";
/// 压缩时使用的临时文件
const COMPACT_FILE: &str = "catalog.log.compact";
/// crc(8) + tstamp(4) + ksz(4) + value_sz(4)
const HEADER_LEN: u64 = 20;

/// KeyDir
/// 维护 key 和（条目起始位置、value 长度）的映射关系
type KeyDir = BTreeMap<Vec<u8>, (u64, u32)>;

/// 实现一个BitCask结构
///
/// 所有写入都追加到同一个日志文件末尾，内存中的 KeyDir 记录每个 key 最新条目的位置。
/// 打开时顺序扫描整个文件重建 KeyDir；尾部残缺或校验失败的条目会被截掉。
#[derive(Debug)]
pub struct BitCask {
    path: PathBuf,
    file: File,
    keydir: KeyDir,
    // 文件的有效长度，也是下一个条目的写入位置
    len: u64,
    sync: SyncStrategy,
    fsync_interval: Duration,
    last_sync: Instant,
}

impl BitCask {
    /// 打开（或创建）目录下的日志文件并重建索引
    pub fn open(dir: impl AsRef<Path>, sync: SyncStrategy, fsync_interval_ms: u64) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);
        let mut file = Self::open_file(&path)?;

        // 1、扫描文件，构建索引
        let (keydir, len) = Self::build_keydir(&mut file)?;
        // 2、截掉无法解析的尾部
        let file_len = file.metadata()?.len();
        if len < file_len {
            warn!(path = %path.display(), valid = len, total = file_len, "truncating torn log tail");
            file.set_len(len)?;
        }
        info!(path = %path.display(), keys = keydir.len(), size = len, "opened bitcask log");

        Ok(Self {
            path,
            file,
            keydir,
            len,
            sync,
            fsync_interval: Duration::from_millis(fsync_interval_ms),
            last_sync: Instant::now(),
        })
    }

    /// 按配置打开，垃圾数据比例超过阈值时先压缩
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let mut db = Self::open(&config.storage_path, config.sync_strategy, config.fsync_interval_ms)?;
        let status = db.status()?;
        if status.garbage_size > 0 && status.garbage_rate() > config.compaction_threshold {
            info!(rate = status.garbage_rate(), "garbage rate above threshold, compacting");
            db.compact()?;
        }
        Ok(db)
    }

    fn open_file(path: &Path) -> Result<File> {
        let file = OpenOptions::new().read(true).append(true).create(true).open(path)?;
        file.try_lock_exclusive()?;
        Ok(file)
    }

    /// 从头开始扫描文件，返回索引以及有效数据的长度
    fn build_keydir(file: &mut File) -> Result<(KeyDir, u64)> {
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;
        let mut keydir = KeyDir::new();
        let mut pos = 0u64;

        while pos < file_len {
            let entry = match LogEntry::read_from(&mut reader, file_len - pos) {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    warn!(offset = pos, "incomplete log entry");
                    break;
                }
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    warn!(offset = pos, "incomplete log entry");
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            if !entry.verify() {
                warn!(offset = pos, crc = %hex::encode(entry.crc), "log entry checksum mismatch");
                break;
            }
            match &entry.value {
                Some(value) => {
                    keydir.insert(entry.key.clone(), (pos, value.len() as u32));
                }
                None => {
                    keydir.remove(&entry.key);
                }
            }
            pos += entry.len();
        }
        Ok((keydir, pos))
    }

    /// 写入条目，返回条目的起始位置
    fn write_entry(&mut self, entry: &LogEntry) -> Result<u64> {
        let pos = self.len;
        let bytes = entry.to_bytes();
        self.file.write_all(&bytes)?;
        self.len += bytes.len() as u64;
        self.maybe_sync()?;
        Ok(pos)
    }

    fn maybe_sync(&mut self) -> Result<()> {
        let due = match self.sync {
            SyncStrategy::Always => true,
            SyncStrategy::Every => self.last_sync.elapsed() >= self.fsync_interval,
            SyncStrategy::Never => false,
        };
        if due {
            self.file.sync_data()?;
            self.last_sync = Instant::now();
        }
        Ok(())
    }

    fn read_value(&mut self, key: &[u8], pos: u64, value_len: u32) -> Result<Vec<u8>> {
        let mut value = vec![0u8; value_len as usize];
        self.file.seek(SeekFrom::Start(pos + HEADER_LEN + key.len() as u64))?;
        self.file.read_exact(&mut value)?;
        Ok(value)
    }

    /// 压缩：只把存活的键值重写到新文件，再原子替换旧文件
    pub fn compact(&mut self) -> Result<()> {
        let before = self.len;
        let tmp_path = self.path.with_file_name(COMPACT_FILE);
        let mut keydir = KeyDir::new();
        let mut len = 0u64;
        {
            let tmp = OpenOptions::new().write(true).create(true).truncate(true).open(&tmp_path)?;
            let mut writer = BufWriter::new(&tmp);
            let live: Vec<_> = self.keydir.iter().map(|(k, v)| (k.clone(), *v)).collect();
            for (key, (pos, value_len)) in live {
                let value = self.read_value(&key, pos, value_len)?;
                let entry = LogEntry::new(key.clone(), Some(value));
                writer.write_all(&entry.to_bytes())?;
                keydir.insert(key, (len, value_len));
                len += entry.len();
            }
            writer.flush()?;
            drop(writer);
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        self.file = Self::open_file(&self.path)?;
        self.keydir = keydir;
        self.len = len;
        info!(before, after = len, "compacted bitcask log");
        Ok(())
    }
}

impl Engine for BitCask {
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let value_len = value.len() as u32;
        let entry = LogEntry::new(key.to_vec(), Some(value));
        let pos = self.write_entry(&entry)?;
        self.keydir.insert(key.to_vec(), (pos, value_len));
        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.keydir.get(key).copied() {
            Some((pos, value_len)) => Ok(Some(self.read_value(key, pos, value_len)?)),
            None => Ok(None),
        }
    }

    fn exists(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.keydir.contains_key(key))
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        if !self.keydir.contains_key(key) {
            return Ok(());
        }
        self.write_entry(&LogEntry::new(key.to_vec(), None))?;
        self.keydir.remove(key);
        debug!(key = %String::from_utf8_lossy(key), "deleted key");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_all()?;
        self.last_sync = Instant::now();
        Ok(())
    }

    fn scan(&mut self, range: ScanRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let hits: Vec<_> = self.keydir.range(range).map(|(k, v)| (k.clone(), *v)).collect();
        let mut result = Vec::with_capacity(hits.len());
        for (key, (pos, value_len)) in hits {
            let value = self.read_value(&key, pos, value_len)?;
            result.push((key, value));
        }
        Ok(result)
    }

    fn status(&mut self) -> Result<EngineStatus> {
        let logical_size = self.keydir.iter().map(|(k, (_, v))| k.len() as u64 + *v as u64).sum::<u64>();
        let live_size = logical_size + HEADER_LEN * self.keydir.len() as u64;
        Ok(EngineStatus {
            name: "bitcask".to_string(),
            logical_size,
            total_count: self.keydir.len() as u64,
            total_size: self.len,
            live_size,
            garbage_size: self.len.saturating_sub(live_size),
        })
    }
}

impl Drop for BitCask {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!(error = %err, "failed to flush bitcask log");
        }
    }
}

/// 日志文件条目
/// 拼接方式：
/// ------|------|------|---------|------|------|
///  crc  |tstamp|ksz   |value_sz |key   |value |
/// ------|------|------|---------|------|------|
///  8    | 4    | 4    | 4       | ...  |...   |
/// ------|------|------|---------|------|------|
/// value_sz 为 -1 表示删除标记（墓碑），此时没有 value 部分
#[derive(Debug)]
struct LogEntry {
    crc: [u8; 8],
    tstamp: [u8; 4],
    key: Vec<u8>,
    value: Option<Vec<u8>>,
}

impl LogEntry {
    fn new(key: Vec<u8>, value: Option<Vec<u8>>) -> Self {
        let tstamp = crate::utils::get_timestamp().to_be_bytes();
        let crc = Self::checksum(&tstamp, &key, value.as_deref());
        Self { crc, tstamp, key, value }
    }

    fn value_sz(value: Option<&[u8]>) -> i32 {
        value.map_or(-1, |v| v.len() as i32)
    }

    /// 完整性校验字段：对 crc 之后的所有字节做 sha3，截取其中 8 个字节
    fn checksum(tstamp: &[u8; 4], key: &[u8], value: Option<&[u8]>) -> [u8; 8] {
        let mut hasher = Sha3_256::new();
        hasher.update(tstamp);
        hasher.update((key.len() as u32).to_be_bytes());
        hasher.update(Self::value_sz(value).to_be_bytes());
        hasher.update(key);
        if let Some(value) = value {
            hasher.update(value);
        }
        let mut crc = [0u8; 8];
        crc.copy_from_slice(&hasher.finalize()[15..23]);
        crc
    }

    fn verify(&self) -> bool {
        self.crc == Self::checksum(&self.tstamp, &self.key, self.value.as_deref())
    }

    fn len(&self) -> u64 {
        HEADER_LEN + self.key.len() as u64 + self.value.as_ref().map_or(0, |v| v.len() as u64)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len() as usize);
        bytes.extend_from_slice(&self.crc);
        bytes.extend_from_slice(&self.tstamp);
        bytes.extend_from_slice(&(self.key.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&Self::value_sz(self.value.as_deref()).to_be_bytes());
        bytes.extend_from_slice(&self.key);
        if let Some(value) = &self.value {
            bytes.extend_from_slice(value);
        }
        bytes
    }

    /// 读取下一个条目；声明的长度超出剩余字节数（或长度字段非法）时返回 None
    fn read_from<R: Read>(reader: &mut R, remaining: u64) -> std::io::Result<Option<Self>> {
        let mut header = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header)?;
        let mut crc = [0u8; 8];
        crc.copy_from_slice(&header[0..8]);
        let mut tstamp = [0u8; 4];
        tstamp.copy_from_slice(&header[8..12]);
        let ksz = u32::from_be_bytes([header[12], header[13], header[14], header[15]]) as u64;
        let value_sz = i32::from_be_bytes([header[16], header[17], header[18], header[19]]);
        if value_sz < -1 {
            return Ok(None);
        }
        let vsz = value_sz.max(0) as u64;
        if HEADER_LEN + ksz + vsz > remaining {
            return Ok(None);
        }

        let mut key = vec![0u8; ksz as usize];
        reader.read_exact(&mut key)?;
        let value = if value_sz < 0 {
            None
        } else {
            let mut value = vec![0u8; vsz as usize];
            reader.read_exact(&mut value)?;
            Some(value)
        };
        Ok(Some(Self { crc, tstamp, key, value }))
    }
}
