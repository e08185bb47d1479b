/// bin_coder 关于值的序列化工具
/// 因为值不需要支持前缀范围扫描，所以使用bincode库进行序列化
use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db_error::Result;

/// 初始化bincode的配置
/// 默认配置小端序、变长整数
const CONFIG: bincode::config::Configuration = bincode::config::standard();

/// 用于对值进行序列化
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, CONFIG)?)
}

/// 用于反序列化成值
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::serde::decode_from_slice(bytes, CONFIG)?.0)
}

/// 实现一个特征，用于注入默认的二进制编解码方法
pub trait ValueCodec: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

impl<V: ValueCodec> ValueCodec for Vec<V> {}
impl<V: ValueCodec + Ord> ValueCodec for BTreeSet<V> {}
impl ValueCodec for String {}
