//! # WHERE 子句求值
//!
//! 由解析器产出的谓词树在这里针对 (行, 模式) 求值，采用 SQL 三值逻辑：
//!
//! - 原子谓词 `Predicate` 比较两个操作数（常量或列引用），结果为 `TriBool`；
//!   任意一侧为 `NULL` 时结果为 `Unknown`，`IS NULL`/`IS NOT NULL` 只看第一个操作数；
//! - `Expression` 是封闭的树：`Not`/`And`/`Or`/`Predicate`，按
//!   `False < Unknown < True` 取 min（AND）/ max（OR）；
//! - AND/OR 总是对两侧都求值，不做短路，所以任意一侧的列解析错误都会被报告；
//! - 列引用通过 [`resolve_column`] 在显式传入的模式上解析，不依赖任何全局状态。

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Not;

use serde::{Deserialize, Serialize};

use crate::db_error::{Error, Result};
use crate::errdata;
use crate::types::{resolve_column, Attribute, Date, Row, Value};

/// 比较符
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// a = b
    Eq,
    /// a != b
    NotEq,
    /// a > b
    Greater,
    /// a >= b
    GreaterEq,
    /// a < b
    Less,
    /// a <= b
    LessEq,
    /// a is null
    IsNull,
    /// a is not null
    IsNotNull,
}

impl Comparator {
    /// `IS NULL` / `IS NOT NULL` 只有一个操作数
    pub fn is_unary(&self) -> bool {
        matches!(self, Comparator::IsNull | Comparator::IsNotNull)
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Comparator::Eq => "=",
            Comparator::NotEq => "!=",
            Comparator::Greater => ">",
            Comparator::GreaterEq => ">=",
            Comparator::Less => "<",
            Comparator::LessEq => "<=",
            Comparator::IsNull => "is null",
            Comparator::IsNotNull => "is not null",
        })
    }
}

/// 比较的操作数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// 字面常量
    Const(Value),
    /// 列引用，可以携带一个表名或别名
    Column(Option<String>, String),
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(None, name.into())
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Operand::Column(Some(table.into()), name.into())
    }

    /// 取出操作数在当前行中的值
    fn value<'a>(&'a self, row: &'a [Value], schema: &[Attribute]) -> Result<&'a Value> {
        match self {
            Operand::Const(value) => Ok(value),
            Operand::Column(table, column) => {
                let idx = resolve_column(schema, table.as_deref(), column)?;
                row.get(idx)
                    .ok_or_else(|| errdata!("row has {} values but column {column} is at {idx}", row.len()))
            }
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Const(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Const(Value::Integer(value))
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Const(Value::from(value))
    }
}

impl From<Date> for Operand {
    fn from(value: Date) -> Self {
        Operand::Const(Value::Date(value))
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Const(Value::Char(s)) => write!(f, "'{s}'"),
            Operand::Const(value) => write!(f, "{value}"),
            Operand::Column(Some(table), column) => write!(f, "{table}.{column}"),
            Operand::Column(None, column) => write!(f, "{column}"),
        }
    }
}

/// 三值逻辑的真值，按 `False < Unknown < True` 排序
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriBool {
    False,
    Unknown,
    True,
}

impl TriBool {
    pub fn and(self, other: TriBool) -> TriBool {
        self.min(other)
    }

    pub fn or(self, other: TriBool) -> TriBool {
        self.max(other)
    }
}

impl Not for TriBool {
    type Output = TriBool;

    fn not(self) -> TriBool {
        match self {
            TriBool::False => TriBool::True,
            TriBool::Unknown => TriBool::Unknown,
            TriBool::True => TriBool::False,
        }
    }
}

impl From<bool> for TriBool {
    fn from(b: bool) -> Self {
        match b {
            true => TriBool::True,
            false => TriBool::False,
        }
    }
}

/// 原子比较
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub comparator: Comparator,
    pub left: Operand,
    /// 一元比较符时不参与求值
    pub right: Operand,
}

impl Predicate {
    pub fn new(comparator: Comparator, left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self { comparator, left: left.into(), right: right.into() }
    }

    /// `operand IS [NOT] NULL`
    pub fn unary(comparator: Comparator, operand: impl Into<Operand>) -> Self {
        Self { comparator, left: operand.into(), right: Operand::Const(Value::Null) }
    }

    /// 针对一行求值
    ///
    /// 1. 解析列引用（歧义、表未指定、列不存在都是错误）；
    /// 2. 一元比较符直接按是否为 NULL 返回；
    /// 3. 两侧都非空但类型不同为不可比较错误；
    /// 4. 任意一侧为 NULL 时返回 `Unknown`。
    pub fn evaluate(&self, row: &[Value], schema: &[Attribute]) -> Result<TriBool> {
        let left = self.left.value(row, schema)?;
        let holds: fn(Ordering) -> bool = match self.comparator {
            Comparator::IsNull => return Ok(left.is_null().into()),
            Comparator::IsNotNull => return Ok((!left.is_null()).into()),
            Comparator::Eq => Ordering::is_eq,
            Comparator::NotEq => Ordering::is_ne,
            Comparator::Greater => Ordering::is_gt,
            Comparator::GreaterEq => Ordering::is_ge,
            Comparator::Less => Ordering::is_lt,
            Comparator::LessEq => Ordering::is_le,
        };
        let right = self.right.value(row, schema)?;
        if !Value::comparable(left, right) {
            return Err(Error::WhereIncomparable);
        }
        if left.is_null() || right.is_null() {
            return Ok(TriBool::Unknown);
        }
        Ok(holds(Value::compare(left, right)?).into())
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.comparator.is_unary() {
            true => write!(f, "{} {}", self.left, self.comparator),
            false => write!(f, "{} {} {}", self.left, self.comparator, self.right),
        }
    }
}

/// 布尔表达式树
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// not a
    Not(Box<Expression>),
    /// a and b
    And(Box<Expression>, Box<Expression>),
    /// a or b
    Or(Box<Expression>, Box<Expression>),
    /// 原子谓词
    Predicate(Predicate),
}

impl Expression {
    pub fn and(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Expression::And(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn or(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Expression::Or(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn not(expr: impl Into<Expression>) -> Self {
        Expression::Not(Box::new(expr.into()))
    }

    /// 把若干 `column = value` 条件按从左到右的顺序用 AND 串起来，空列表返回 `None`
    pub fn conjunction(pairs: impl IntoIterator<Item = (String, Value)>) -> Option<Expression> {
        pairs
            .into_iter()
            .map(|(column, value)| Expression::from(Predicate::new(Comparator::Eq, Operand::Column(None, column), value)))
            .reduce(Expression::and)
    }

    /// 针对一行求值，两侧子树都会被求值
    pub fn evaluate(&self, row: &[Value], schema: &[Attribute]) -> Result<TriBool> {
        Ok(match self {
            Expression::Not(expr) => !expr.evaluate(row, schema)?,
            Expression::And(left, right) => {
                let left = left.evaluate(row, schema)?;
                left.and(right.evaluate(row, schema)?)
            }
            Expression::Or(left, right) => {
                let left = left.evaluate(row, schema)?;
                left.or(right.evaluate(row, schema)?)
            }
            Expression::Predicate(predicate) => predicate.evaluate(row, schema)?,
        })
    }
}

impl From<Predicate> for Expression {
    fn from(predicate: Predicate) -> Self {
        Expression::Predicate(predicate)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Not(expr) => write!(f, "(not {expr})"),
            Expression::And(left, right) => write!(f, "({left} and {right})"),
            Expression::Or(left, right) => write!(f, "({left} or {right})"),
            Expression::Predicate(predicate) => write!(f, "{predicate}"),
        }
    }
}

/// 按存储顺序筛选出顶层结果为 `True` 的行，返回其位置
///
/// `None` 表示没有 WHERE 子句，匹配全部行。遇到第一个求值错误即返回。
pub fn filter(expr: Option<&Expression>, schema: &[Attribute], rows: &[Row]) -> Result<Vec<usize>> {
    let Some(expr) = expr else {
        return Ok((0..rows.len()).collect());
    };
    let mut matched = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if expr.evaluate(row, schema)? == TriBool::True {
            matched.push(idx);
        }
    }
    Ok(matched)
}
