use serde::{Deserialize, Serialize};

use crate::sql::expression::Expression;
use crate::types::{DataType, Value};

/// 解析器产出的语句
///
/// 这里只保证语法正确，语义（表、列是否存在，类型是否匹配，约束是否满足）由执行阶段校验。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// 建表语句
    /// - name: 表名
    /// - columns：列定义
    /// - constraints：表级约束（主键、外键）
    CreateTable {
        name: String,
        columns: Vec<Column>,
        constraints: Vec<TableConstraint>,
    },
    /// 删除表语句
    DropTable { name: String },
    /// 查看表结构
    Describe { name: String },
    /// 列出所有表
    ShowTables,
    /// 插入语句
    /// - table: 表名
    /// - columns: 待插入数据的列，`None` 表示按模式顺序给出全部列
    /// - values: 待插入的数据
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        values: Vec<Value>,
    },
    /// 从指定表里删除数据
    /// - table: 表名
    /// - r#where: 删除条件表达式，`None` 删除全部行
    Delete {
        table: String,
        r#where: Option<Expression>,
    },
    /// 查询语句
    /// - select: 投影列，`None` 表示 `*`
    /// - from: 来源表集合，按从左到右做笛卡尔积
    /// - r#where: 过滤条件
    Select {
        select: Option<Vec<SelectColumn>>,
        from: Vec<FromTable>,
        r#where: Option<Expression>,
    },
}

/// 表示 `CREATE TABLE` 语句中的列定义。
///
/// - `char_length` 只对 `char(n)` 有意义，原样保留解析器读到的数字，
///   非正数在建表时报错。
/// - `primary_key` 对应列级的 `PRIMARY KEY` 写法，与表级主键子句等价。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub char_length: i64,
    pub nullable: bool,
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self { name: name.into(), datatype, char_length: 0, nullable: true, primary_key: false }
    }

    pub fn char(name: impl Into<String>, char_length: i64) -> Self {
        Self { char_length, ..Self::new(name, DataType::Char) }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// 表级约束
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TableConstraint {
    /// primary key (a, b, ...)
    PrimaryKey(Vec<String>),
    /// foreign key (a, b, ...) references table (x, y, ...)
    ForeignKey {
        columns: Vec<String>,
        table: String,
        references: Vec<String>,
    },
}

/// FROM 子句中的一张表，可选别名
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FromTable {
    pub name: String,
    pub alias: Option<String>,
}

impl FromTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), alias: None }
    }

    pub fn alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { name: name.into(), alias: Some(alias.into()) }
    }

    /// 在查询中使用的名字：别名优先
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// 投影列：`[table.]column [AS alias]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectColumn {
    pub table: Option<String>,
    pub column: String,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn new(table: Option<&str>, column: impl Into<String>) -> Self {
        Self { table: table.map(str::to_string), column: column.into(), alias: None }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// 结果表头：别名优先，否则为列名
    pub fn header(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}
