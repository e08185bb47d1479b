use std::time::{SystemTime, UNIX_EPOCH};

/// 当前的 Unix 时间戳（秒）。系统时钟早于 1970 年时返回 0
pub fn get_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_the_epoch| since_the_epoch.as_secs() as u32)
        .unwrap_or_default()
}
