//! # 基础类型模块概览
//!
//! 本模块提供关系引擎使用的**原始数据类型**与**值表示**，供建表、插入、
//! 谓词求值和结果输出等阶段复用。
//!
//! ## 主要组成
//! - `DataType`：列的原始类型（`Integer`/`Char`/`Date`）。`Char` 的长度记录在列描述上。
//! - `Value`：单个值的统一承载（`Null`/`Integer(i64)`/`Char(String)`/`Date(Date)`）。
//!   - `Null` 是独立的一等变体，与列的声明类型无关，任意类型的列都可以存放 `Null`；
//!   - 两个值只有在**都不为 `Null` 且类型相同**时才能直接比较，跨类型比较是错误而不是 `false`；
//!   - 排序规则：字符串按字典序，日期按 `year*10000+month*100+day`，整数按数值。
//! - `Date`：`YYYY-MM-DD` 形式的日期。
//! - `Row`：一行数据即值向量，长度与表模式一致。
//!
//! ## 备注
//! - 本模块**不**实现三值逻辑，`NULL` 参与比较时的 `UNKNOWN` 语义在谓词求值阶段处理。

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db_error::{Error, Result};
use crate::errdata;

/// 原始的 SQL 数据类型。为简化实现，仅支持少量标量类型（不支持复合类型）。
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// 64bit有符号整形
    Integer,
    /// 定长字符串，长度由列定义给出
    Char,
    /// 日期
    Date,
}

/// 实现格式化打印
impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Integer => write!(f, "int"),
            DataType::Char => write!(f, "char"),
            DataType::Date => write!(f, "date"),
        }
    }
}

/// 日期：年、月、日
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    pub year: u32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub fn new(year: u32, month: u32, day: u32) -> Result<Self> {
        if year > 9999 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(errdata!("invalid date {year}-{month}-{day}"));
        }
        Ok(Self { year, month, day })
    }

    /// 解析 `YYYY-MM-DD`
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('-').collect();
        match parts.as_slice() {
            [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
                Date::new(y.parse()?, m.parse()?, d.parse()?)
            }
            _ => Err(errdata!("invalid date literal '{raw}', expected YYYY-MM-DD")),
        }
    }

    /// 用于排序的日历序号
    pub fn ordinal(&self) -> u64 {
        u64::from(self.year) * 10000 + u64::from(self.month) * 100 + u64::from(self.day)
    }
}

impl FromStr for Date {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Date::parse(s)
    }
}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// 单个值
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// 空值，可出现在任意类型的列中
    Null,
    Integer(i64),
    Char(String),
    Date(Date),
}

/// 一行数据即值向量
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 返回值对应的 `DataType`，`Null` 返回 `None`
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(DataType::Integer),
            Value::Char(_) => Some(DataType::Char),
            Value::Date(_) => Some(DataType::Date),
        }
    }

    /// 两个值是否可以比较：任意一方为 `Null`（结果不确定但允许比较），或类型相同
    pub fn comparable(a: &Value, b: &Value) -> bool {
        a.is_null() || b.is_null() || a.datatype() == b.datatype()
    }

    /// 比较两个非空且同类型的值
    ///
    /// 调用方需先用 [`Value::comparable`] 检查，并单独处理 `Null`。
    pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
        match (a, b) {
            (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
            (Value::Char(x), Value::Char(y)) => Ok(x.cmp(y)),
            (Value::Date(x), Value::Date(y)) => Ok(x.cmp(y)),
            _ => Err(Error::WhereIncomparable),
        }
    }

    /// 输出时占用的字符数
    pub fn display_len(&self) -> usize {
        self.to_string().chars().count()
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Char(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Char(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Char(v)
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Value::Date(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparable() -> Result<()> {
        let int = Value::Integer(1);
        let text = Value::from("a");
        let date = Value::Date(Date::parse("2020-01-02")?);
        assert!(Value::comparable(&int, &Value::Integer(2)));
        assert!(Value::comparable(&Value::Null, &text));
        assert!(Value::comparable(&date, &Value::Null));
        assert!(Value::comparable(&Value::Null, &Value::Null));
        assert!(!Value::comparable(&int, &text));
        assert!(!Value::comparable(&text, &date));
        Ok(())
    }

    #[test]
    fn test_compare() -> Result<()> {
        assert_eq!(Value::compare(&Value::Integer(3), &Value::Integer(5))?, Ordering::Less);
        assert_eq!(Value::compare(&Value::from("b"), &Value::from("a"))?, Ordering::Greater);
        let a = Value::Date(Date::parse("2019-12-31")?);
        let b = Value::Date(Date::parse("2020-01-01")?);
        assert_eq!(Value::compare(&a, &b)?, Ordering::Less);
        assert_eq!(
            Value::compare(&Value::Integer(1), &Value::from("1")),
            Err(Error::WhereIncomparable)
        );
        assert_eq!(Value::compare(&Value::Null, &Value::Null), Err(Error::WhereIncomparable));
        Ok(())
    }

    #[test]
    fn test_date() -> Result<()> {
        let d = Date::parse("2024-03-09")?;
        assert_eq!(d.ordinal(), 20240309);
        assert_eq!(d.to_string(), "2024-03-09");
        assert_eq!("2024-03-09".parse::<Date>()?, d);
        assert!(Date::parse("2024-13-01").is_err());
        assert!(Date::parse("2024/01/01").is_err());
        assert!(Date::parse("24-01-01").is_err());

        assert!(Date::new(500_000, 1, 1).is_err());
        let last = Date::new(9999, 12, 31)?;
        assert_eq!(last.cmp(&Date::new(1, 1, 1)?), Ordering::Greater);
        // 反序列化可以绕过构造函数，排序仍不会溢出
        let huge = Date { year: u32::MAX, month: 12, day: 31 };
        assert_eq!(huge.cmp(&last), Ordering::Greater);
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Integer(-4).to_string(), "-4");
        assert_eq!(Value::from("abc").display_len(), 3);
    }
}
