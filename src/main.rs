use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use mini_rdb::cfg::load_config;
use mini_rdb::db_error::{Error, Result};
use mini_rdb::init_tracing;
use mini_rdb::sql::ast::{FromTable, Statement};
use mini_rdb::sql::Executor;
use mini_rdb::storage::EngineCatalog;

/// 关系数据库存储目录的命令行工具
#[derive(Parser, Debug)]
#[command(name = "mini-rdb", version, about)]
struct Cli {
    /// 配置文件路径，默认读取 ./config.toml（不存在时使用默认配置）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 以 JSON 输出结果
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出所有表
    Tables,
    /// 查看表结构
    Describe { table: String },
    /// 查询全部列：多张表时做笛卡尔积
    Select {
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// 删除表
    Drop { table: String },
    /// 存储引擎状态
    Status,
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|err| Error::Encode(err.to_string()))
}

fn print_status(catalog: &mut EngineCatalog, json: bool) -> Result<()> {
    let status = catalog.status()?;
    if json {
        println!("{}", to_json(&status)?);
    } else {
        println!("{status:#?}");
        println!("garbage rate: {:.2}%", status.garbage_rate());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // 1、加载配置并初始化日志
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.log_level);
    // 2、打开存储
    let mut catalog = EngineCatalog::open(&config)?;

    let statement = match cli.command {
        Command::Status => return print_status(&mut catalog, cli.json),
        Command::Tables => Statement::ShowTables,
        Command::Describe { table } => Statement::Describe { name: table },
        Command::Select { tables } => Statement::Select {
            select: None,
            from: tables.into_iter().map(FromTable::new).collect(),
            r#where: None,
        },
        Command::Drop { table } => Statement::DropTable { name: table },
    };
    // 3、执行并输出结果
    let mut executor = Executor::new(catalog);
    let result = executor.execute(statement)?;
    if cli.json {
        println!("{}", to_json(&result)?);
    } else {
        println!("{result}");
    }
    executor.into_catalog().flush()
}
