use serde::{Deserialize, Serialize};

/// 自定义错误信息
///
/// 每个变体最多携带一个标识符（表名、列名等），便于上层 shell 直接展示后继续会话。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// 无效数据：损坏的存储字节或内部不变量被破坏
    InvalidData(String),
    /// 文件IO错误
    IO(String),
    /// 序列化失败
    Encode(String),
    /// 反序列化失败
    Decode(String),
    /// 配置错误
    ConfigError(String),

    // ---------- 建表 ----------
    /// 表已存在
    TableExists(String),
    /// 表不存在
    NoSuchTable(String),
    /// 列定义重复
    DuplicateColumnDef(String),
    /// 主键子句出现多次
    DuplicatePrimaryKeyDef,
    /// char(n) 的长度必须为正数
    CharLength(String),
    /// 约束中引用了未定义的列
    NonExistingColumnDef(String),
    /// 外键引用的表不存在
    ReferenceTableExistence(String),
    /// 外键引用的列不存在
    ReferenceColumnExistence(String),
    /// 外键引用的列不是主键
    ReferenceNonPrimaryKey(String),
    /// 外键与被引用列的类型（或 char 长度）不一致，或列数不一致
    ReferenceType(String),
    /// 外键没有覆盖被引用表的完整主键
    ReferencePartialKey(String),

    // ---------- 删表 ----------
    /// 仍被其它表的外键引用
    DropReferencedTable(String),

    // ---------- 插入 ----------
    /// 值的类型与列不匹配
    InsertTypeMismatch(String),
    /// 插入的目标列不存在
    InsertColumnExistence(String),
    /// 非空列缺少值或插入了 NULL
    InsertColumnNonNullable(String),
    /// 主键重复
    InsertDuplicatePrimaryKey,
    /// 外键值在被引用表中不存在
    InsertReferentialIntegrity(String),

    // ---------- 查询 / WHERE ----------
    /// FROM 中的表不存在
    SelectTableExistence(String),
    /// FROM 中的表别名重复
    DuplicateTableAlias(String),
    /// 投影列无法解析（不存在或有歧义）
    SelectColumnResolve(String),
    /// 比较两端类型不同
    WhereIncomparable,
    /// 限定列名中的表不在当前查询范围内
    WhereTableNotSpecified(String),
    /// WHERE 中的列不存在
    WhereColumnNotExist(String),
    /// WHERE 中的列名有歧义
    WhereAmbiguousReference(String),
}

/// 自定义错误类型
pub type Result<T> = std::result::Result<T, Error>;

/// 实现标准库std::error::Error特征
impl std::error::Error for Error {}

/// 实现格式输出
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::IO(msg) => write!(f, "io error: {msg}"),
            Error::Encode(msg) => write!(f, "encode error: {msg}"),
            Error::Decode(msg) => write!(f, "decode error: {msg}"),
            Error::ConfigError(msg) => write!(f, "config error: {msg}"),
            Error::TableExists(name) => write!(f, "create table has failed: table '{name}' already exists"),
            Error::NoSuchTable(name) => write!(f, "no such table: '{name}'"),
            Error::DuplicateColumnDef(col) => write!(f, "create table has failed: column '{col}' is defined more than once"),
            Error::DuplicatePrimaryKeyDef => write!(f, "create table has failed: primary key definition is duplicated"),
            Error::CharLength(col) => write!(f, "char length of column '{col}' should be over 0"),
            Error::NonExistingColumnDef(col) => write!(f, "create table has failed: '{col}' does not exist in column definition"),
            Error::ReferenceTableExistence(table) => write!(f, "create table has failed: foreign key references non existing table '{table}'"),
            Error::ReferenceColumnExistence(col) => write!(f, "create table has failed: foreign key references non existing column '{col}'"),
            Error::ReferenceNonPrimaryKey(col) => write!(f, "create table has failed: foreign key references non primary key column '{col}'"),
            Error::ReferenceType(col) => write!(f, "create table has failed: foreign key references wrong type '{col}'"),
            Error::ReferencePartialKey(table) => write!(f, "create table has failed: foreign key must reference the whole primary key of '{table}'"),
            Error::DropReferencedTable(name) => write!(f, "drop table has failed: '{name}' is referenced by other table"),
            Error::InsertTypeMismatch(col) => write!(f, "insertion has failed: types are not matched for '{col}'"),
            Error::InsertColumnExistence(col) => write!(f, "insertion has failed: '{col}' does not exist"),
            Error::InsertColumnNonNullable(col) => write!(f, "insertion has failed: '{col}' is not nullable"),
            Error::InsertDuplicatePrimaryKey => write!(f, "insertion has failed: primary key duplication"),
            Error::InsertReferentialIntegrity(table) => write!(f, "insertion has failed: referential integrity violation on '{table}'"),
            Error::SelectTableExistence(table) => write!(f, "selection has failed: '{table}' does not exist"),
            Error::DuplicateTableAlias(alias) => write!(f, "selection has failed: table name '{alias}' is used more than once"),
            Error::SelectColumnResolve(col) => write!(f, "selection has failed: fail to resolve '{col}'"),
            Error::WhereIncomparable => write!(f, "where clause try to compare incomparable values"),
            Error::WhereTableNotSpecified(table) => write!(f, "where clause try to reference tables which are not specified: '{table}'"),
            Error::WhereColumnNotExist(col) => write!(f, "where clause try to reference non existing column '{col}'"),
            Error::WhereAmbiguousReference(col) => write!(f, "where clause contains ambiguous reference '{col}'"),
        }
    }
}

/// 构建一个结构体实例
/// an Error::InvalidData for the given format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => {
        $crate::db_error::Error::InvalidData(format!($($args)*))
    };
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(err: bincode::error::EncodeError) -> Self {
        Error::Encode(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(err: bincode::error::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::InvalidData(err.to_string())
    }
}
