use serde::{Deserialize, Serialize};

use crate::db_error::{Error, Result};
use crate::types::{DataType, Value};

/// 列描述
///
/// 表在创建后模式无法更改：列的顺序就是行内值的位置布局。
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Attribute {
    /// 列名（不带表名）
    pub name: String,

    /// 所属表名或别名，绑定到表之后才有值
    pub table: String,

    /// 列类型
    pub data_type: DataType,

    /// char(n) 的长度，其它类型为 0
    pub char_length: usize,

    /// 是否允许为空。主键列恒为 false
    pub nullable: bool,

    /// 是否为主键列
    pub primary: bool,

    /// 外键引用的 (表, 列)。只有在被引用的表和列校验通过之后才会设置
    pub references: Option<(String, String)>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data_type: DataType, char_length: usize, nullable: bool) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            data_type,
            char_length,
            nullable,
            primary: false,
            references: None,
        }
    }

    /// `table.column`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// 设为主键，同时强制不可为空
    pub fn set_primary(&mut self) {
        self.primary = true;
        self.nullable = false;
    }

    pub fn set_foreign(&mut self, table: &str, column: &str) {
        self.references = Some((table.to_string(), column.to_string()));
    }

    pub fn is_foreign(&self) -> bool {
        self.references.is_some()
    }

    /// 两列类型是否一致：基础类型相同，char 还需长度相同
    pub fn types_match(a: &Attribute, b: &Attribute) -> bool {
        a.data_type == b.data_type && (a.data_type != DataType::Char || a.char_length == b.char_length)
    }

    /// 检查一个待插入的值能否放入本列
    ///
    /// char(n) 要求值的长度恰好为 n，不做截断。
    pub fn type_check(&self, value: &Value) -> Result<()> {
        let Some(data_type) = value.datatype() else {
            return match self.nullable {
                true => Ok(()),
                false => Err(Error::InsertColumnNonNullable(self.name.clone())),
            };
        };
        if data_type != self.data_type {
            return Err(Error::InsertTypeMismatch(self.name.clone()));
        }
        if let Value::Char(s) = value {
            if s.chars().count() != self.char_length {
                return Err(Error::InsertTypeMismatch(self.name.clone()));
            }
        }
        Ok(())
    }

    /// `int` / `char(n)` / `date`
    pub fn type_name(&self) -> String {
        match self.data_type {
            DataType::Char => format!("char({})", self.char_length),
            other => other.to_string(),
        }
    }

    /// DESCRIBE 中 key 一栏的标记
    pub fn key_marker(&self) -> &'static str {
        match (self.primary, self.is_foreign()) {
            (true, true) => "PRI/FOR",
            (true, false) => "PRI",
            (false, true) => "FOR",
            (false, false) => "",
        }
    }
}

/// 外键约束：源列与目标列按位置一一对应
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ForeignKeyConstraint {
    /// 本表中的外键列
    pub columns: Vec<String>,
    /// 被引用的表
    pub table: String,
    /// 被引用表中的主键列
    pub ref_columns: Vec<String>,
    /// 所有外键列都允许为空。删除被引用行时据此决定级联置空还是阻止删除
    pub nullable: bool,
}

impl ForeignKeyConstraint {
    pub fn new(columns: Vec<String>, table: impl Into<String>, ref_columns: Vec<String>) -> Self {
        Self { columns, table: table.into(), ref_columns, nullable: false }
    }
}

/// 在（可能是连接后的）模式中定位一列，返回其位置
///
/// - 不带表名时按列名匹配全部属性；
/// - 带表名时只匹配该表（或别名）下的属性；
/// - 命中多于一列为歧义，带表名但范围内没有该表时报表未指定，否则报列不存在。
pub fn resolve_column(schema: &[Attribute], table: Option<&str>, column: &str) -> Result<usize> {
    let display = match table {
        Some(t) => format!("{t}.{column}"),
        None => column.to_string(),
    };
    let mut found = schema
        .iter()
        .enumerate()
        .filter(|(_, attr)| attr.name == column && table.map_or(true, |t| attr.table == t))
        .map(|(idx, _)| idx);
    let first = found.next();
    if found.next().is_some() {
        return Err(Error::WhereAmbiguousReference(display));
    }
    if let Some(t) = table {
        if !schema.iter().any(|attr| attr.table == t) {
            return Err(Error::WhereTableNotSpecified(t.to_string()));
        }
    }
    first.ok_or(Error::WhereColumnNotExist(display))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(table: &str, name: &str, data_type: DataType, len: usize) -> Attribute {
        let mut attr = Attribute::new(name, data_type, len, true);
        attr.table = table.to_string();
        attr
    }

    #[test]
    fn test_types_match() {
        let a = attr("t", "a", DataType::Char, 5);
        let b = attr("u", "b", DataType::Char, 5);
        let c = attr("u", "c", DataType::Char, 6);
        let d = attr("u", "d", DataType::Integer, 0);
        let e = attr("u", "e", DataType::Integer, 0);
        assert!(Attribute::types_match(&a, &a));
        assert!(Attribute::types_match(&a, &b) && Attribute::types_match(&b, &a));
        assert!(!Attribute::types_match(&a, &c) && !Attribute::types_match(&c, &a));
        assert!(!Attribute::types_match(&a, &d));
        assert!(Attribute::types_match(&d, &e));
    }

    #[test]
    fn test_type_check() {
        let mut name = attr("t", "name", DataType::Char, 5);
        assert_eq!(name.type_check(&Value::from("alice")), Ok(()));
        assert_eq!(name.type_check(&Value::Null), Ok(()));
        assert_eq!(
            name.type_check(&Value::from("bob")),
            Err(Error::InsertTypeMismatch("name".to_string()))
        );
        assert_eq!(
            name.type_check(&Value::Integer(1)),
            Err(Error::InsertTypeMismatch("name".to_string()))
        );
        name.set_primary();
        assert!(!name.nullable);
        assert_eq!(
            name.type_check(&Value::Null),
            Err(Error::InsertColumnNonNullable("name".to_string()))
        );
    }

    #[test]
    fn test_key_marker() {
        let mut a = attr("t", "id", DataType::Integer, 0);
        assert_eq!(a.key_marker(), "");
        a.set_foreign("u", "id");
        assert_eq!(a.key_marker(), "FOR");
        a.set_primary();
        assert_eq!(a.key_marker(), "PRI/FOR");
        assert_eq!(attr("t", "n", DataType::Char, 3).type_name(), "char(3)");
    }

    #[test]
    fn test_resolve_column() {
        let schema = vec![
            attr("s", "id", DataType::Integer, 0),
            attr("s", "name", DataType::Char, 4),
            attr("d", "id", DataType::Integer, 0),
        ];
        assert_eq!(resolve_column(&schema, None, "name"), Ok(1));
        assert_eq!(resolve_column(&schema, Some("d"), "id"), Ok(2));
        assert_eq!(
            resolve_column(&schema, None, "id"),
            Err(Error::WhereAmbiguousReference("id".to_string()))
        );
        assert_eq!(
            resolve_column(&schema, Some("x"), "id"),
            Err(Error::WhereTableNotSpecified("x".to_string()))
        );
        assert_eq!(
            resolve_column(&schema, Some("d"), "name"),
            Err(Error::WhereColumnNotExist("d.name".to_string()))
        );
        assert_eq!(
            resolve_column(&schema, None, "age"),
            Err(Error::WhereColumnNotExist("age".to_string()))
        );
    }
}
