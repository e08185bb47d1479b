pub mod db_error;
pub mod cfg;
pub mod sql;
pub mod storage;
pub mod types;
pub mod utils;

use tracing_subscriber::EnvFilter;

/// 初始化日志：RUST_LOG 环境变量优先，否则使用给定的级别
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
