use std::fmt::{Display, Formatter};

use serde::Serialize;
use tracing::{debug, info};

use crate::db_error::{Error, Result};
use crate::sql::ast::Statement;
use crate::sql::Relation;
use crate::storage::Catalog;
use crate::types::{Attribute, Row};
use crate::utils::{render_schema, render_table};

/// 语句执行结果
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ResultSet {
    CreateTable { name: String },
    DropTable { name: String },
    Insert { count: usize },
    Delete { deleted: usize, blocked: usize },
    Select { columns: Vec<String>, rows: Vec<Row> },
    Describe { name: String, columns: Vec<Attribute> },
    ShowTables { tables: Vec<String> },
}

impl Display for ResultSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSet::CreateTable { name } => write!(f, "'{name}' table is created"),
            ResultSet::DropTable { name } => write!(f, "'{name}' table is dropped"),
            ResultSet::Insert { count } => write!(f, "{count} row(s) inserted"),
            ResultSet::Delete { deleted, blocked } => {
                write!(f, "{deleted} row(s) deleted")?;
                if *blocked > 0 {
                    write!(f, "\n{blocked} row(s) are not deleted due to referential integrity")?;
                }
                Ok(())
            }
            ResultSet::Select { columns, rows } => write!(f, "{}", render_table(columns, rows)),
            ResultSet::Describe { name, columns } => write!(f, "{}", render_schema(name, columns)),
            ResultSet::ShowTables { tables } if tables.is_empty() => write!(f, "there is no table"),
            ResultSet::ShowTables { tables } => {
                let separator = "-".repeat(24);
                write!(f, "{separator}\n{}\n{separator}", tables.join("\n"))
            }
        }
    }
}

/// 语句执行器：解析校验表是否存在，调用关系上的操作，并保存被修改的主表
///
/// 对 Catalog 的访问都经过 `&mut self`，语句天然串行执行。
pub struct Executor<C: Catalog> {
    catalog: C,
}

impl<C: Catalog> Executor<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn catalog(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }

    fn load(&mut self, name: &str) -> Result<Relation> {
        self.catalog.load(name)?.ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    pub fn execute(&mut self, statement: Statement) -> Result<ResultSet> {
        debug!(?statement, "executing statement");
        match statement {
            Statement::CreateTable { name, columns, constraints } => {
                if self.catalog.exists(&name)? {
                    return Err(Error::TableExists(name));
                }
                let relation = Relation::create_schema(&name, &columns, &constraints, &mut self.catalog)?;
                self.catalog.save(&relation)?;
                Ok(ResultSet::CreateTable { name })
            }

            Statement::DropTable { name } => {
                let relation = self.load(&name)?;
                relation.drop_cleanup(&mut self.catalog)?;
                self.catalog.delete(&name)?;
                info!(table = %name, "dropped table");
                Ok(ResultSet::DropTable { name })
            }

            Statement::Describe { name } => {
                let relation = self.load(&name)?;
                Ok(ResultSet::Describe { name, columns: relation.schema })
            }

            Statement::ShowTables => Ok(ResultSet::ShowTables { tables: self.catalog.tables()? }),

            Statement::Insert { table, columns, values } => {
                let mut relation = self.load(&table)?;
                relation.insert(columns.as_deref(), values, &mut self.catalog)?;
                self.catalog.save(&relation)?;
                Ok(ResultSet::Insert { count: 1 })
            }

            Statement::Delete { table, r#where } => {
                let mut relation = self.load(&table)?;
                let (deleted, blocked) = relation.delete(r#where.as_ref(), &mut self.catalog)?;
                if deleted > 0 {
                    self.catalog.save(&relation)?;
                }
                Ok(ResultSet::Delete { deleted, blocked })
            }

            Statement::Select { select, from, r#where } => {
                let (columns, rows) =
                    Relation::select(&from, select.as_deref(), r#where.as_ref(), &mut self.catalog)?;
                Ok(ResultSet::Select { columns, rows })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::{Column, FromTable, SelectColumn, TableConstraint};
    use crate::sql::expression::{Comparator, Expression, Operand, Predicate};
    use crate::storage::memory::Memory;
    use crate::storage::EngineCatalog;
    use crate::errdata;
    use crate::types::{DataType, Value};

    fn executor() -> Executor<EngineCatalog> {
        Executor::new(EngineCatalog::new(Box::new(Memory::new())))
    }

    fn insert(table: &str, values: Vec<Value>) -> Statement {
        Statement::Insert { table: table.to_string(), columns: None, values }
    }

    fn id_eq(value: i64) -> Option<Expression> {
        Some(Predicate::new(Comparator::Eq, Operand::column("id"), value).into())
    }

    fn count(executor: &mut Executor<EngineCatalog>, table: &str) -> Result<usize> {
        Ok(executor.load(table)?.rows.len())
    }

    /// 建表、主键冲突、外键引用、删除被阻止的完整流程
    #[test]
    fn test_scenario() -> Result<()> {
        let mut executor = executor();
        let t = Statement::CreateTable {
            name: "T".to_string(),
            columns: vec![Column::new("id", DataType::Integer).primary_key(), Column::char("name", 5)],
            constraints: vec![],
        };
        assert_eq!(executor.execute(t)?, ResultSet::CreateTable { name: "T".to_string() });

        executor.execute(insert("T", vec![Value::Integer(1), "alice".into()]))?;
        assert_eq!(count(&mut executor, "T")?, 1);
        assert_eq!(
            executor.execute(insert("T", vec![Value::Integer(1), "bobby".into()])),
            Err(Error::InsertDuplicatePrimaryKey)
        );
        assert_eq!(count(&mut executor, "T")?, 1);

        let u = Statement::CreateTable {
            name: "U".to_string(),
            // 外键列不可为空，删除被引用的行会被阻止
            columns: vec![Column::new("tid", DataType::Integer).not_null()],
            constraints: vec![TableConstraint::ForeignKey {
                columns: vec!["tid".to_string()],
                table: "T".to_string(),
                references: vec!["id".to_string()],
            }],
        };
        executor.execute(u)?;
        assert_eq!(
            executor.execute(insert("U", vec![Value::Integer(2)])),
            Err(Error::InsertReferentialIntegrity("T".to_string()))
        );
        assert_eq!(executor.execute(insert("U", vec![Value::Integer(1)]))?, ResultSet::Insert { count: 1 });

        let u_before = executor.load("U")?;
        let delete = Statement::Delete { table: "T".to_string(), r#where: id_eq(1) };
        assert_eq!(executor.execute(delete)?, ResultSet::Delete { deleted: 0, blocked: 1 });
        assert_eq!(count(&mut executor, "T")?, 1);
        assert_eq!(executor.load("U")?, u_before);
        Ok(())
    }

    #[test]
    fn test_nullable_foreign_key_cascade() -> Result<()> {
        let mut executor = executor();
        executor.execute(Statement::CreateTable {
            name: "T".to_string(),
            columns: vec![Column::new("id", DataType::Integer).primary_key()],
            constraints: vec![],
        })?;
        // U.tid 可为空，并且不是主键：删除 T 中的行会把引用置空
        executor.execute(Statement::CreateTable {
            name: "U".to_string(),
            columns: vec![Column::new("uid", DataType::Integer).primary_key(), Column::new("tid", DataType::Integer)],
            constraints: vec![TableConstraint::ForeignKey {
                columns: vec!["tid".to_string()],
                table: "T".to_string(),
                references: vec!["id".to_string()],
            }],
        })?;
        executor.execute(insert("T", vec![Value::Integer(1)]))?;
        executor.execute(insert("U", vec![Value::Integer(7), Value::Integer(1)]))?;
        executor.execute(insert("U", vec![Value::Integer(8), Value::Null]))?;

        let delete = Statement::Delete { table: "T".to_string(), r#where: None };
        assert_eq!(executor.execute(delete)?, ResultSet::Delete { deleted: 1, blocked: 0 });
        assert_eq!(count(&mut executor, "T")?, 0);
        assert_eq!(
            executor.load("U")?.rows,
            vec![vec![Value::Integer(7), Value::Null], vec![Value::Integer(8), Value::Null]]
        );
        Ok(())
    }

    #[test]
    fn test_catalog_statements() -> Result<()> {
        let mut executor = executor();
        let create = |name: &str| Statement::CreateTable {
            name: name.to_string(),
            columns: vec![Column::new("id", DataType::Integer).primary_key()],
            constraints: vec![],
        };
        executor.execute(create("b"))?;
        executor.execute(create("a"))?;
        assert_eq!(executor.execute(create("a")), Err(Error::TableExists("a".to_string())));
        assert_eq!(
            executor.execute(Statement::ShowTables)?,
            ResultSet::ShowTables { tables: vec!["a".to_string(), "b".to_string()] }
        );

        let ResultSet::Describe { name, columns } = executor.execute(Statement::Describe { name: "a".to_string() })?
        else {
            return Err(errdata!("expected a describe result"));
        };
        assert_eq!(name, "a");
        assert_eq!(columns[0].key_marker(), "PRI");

        assert_eq!(
            executor.execute(Statement::Describe { name: "zz".to_string() }),
            Err(Error::NoSuchTable("zz".to_string()))
        );
        assert_eq!(
            executor.execute(Statement::DropTable { name: "zz".to_string() }),
            Err(Error::NoSuchTable("zz".to_string()))
        );
        assert_eq!(
            executor.execute(Statement::DropTable { name: "a".to_string() })?,
            ResultSet::DropTable { name: "a".to_string() }
        );
        assert_eq!(
            executor.execute(Statement::ShowTables)?,
            ResultSet::ShowTables { tables: vec!["b".to_string()] }
        );
        Ok(())
    }

    #[test]
    fn test_drop_referenced() -> Result<()> {
        let mut executor = executor();
        executor.execute(Statement::CreateTable {
            name: "T".to_string(),
            columns: vec![Column::new("id", DataType::Integer).primary_key()],
            constraints: vec![],
        })?;
        executor.execute(Statement::CreateTable {
            name: "U".to_string(),
            columns: vec![Column::new("tid", DataType::Integer)],
            constraints: vec![TableConstraint::ForeignKey {
                columns: vec!["tid".to_string()],
                table: "T".to_string(),
                references: vec!["id".to_string()],
            }],
        })?;
        let t_before = executor.load("T")?;
        assert_eq!(
            executor.execute(Statement::DropTable { name: "T".to_string() }),
            Err(Error::DropReferencedTable("T".to_string()))
        );
        assert_eq!(executor.load("T")?, t_before);

        executor.execute(Statement::DropTable { name: "U".to_string() })?;
        executor.execute(Statement::DropTable { name: "T".to_string() })?;
        assert!(executor.catalog().tables()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_select_statement() -> Result<()> {
        let mut executor = executor();
        executor.execute(Statement::CreateTable {
            name: "T".to_string(),
            columns: vec![Column::new("id", DataType::Integer).primary_key(), Column::char("name", 3)],
            constraints: vec![],
        })?;
        executor.execute(insert("T", vec![Value::Integer(1), "amy".into()]))?;
        executor.execute(insert("T", vec![Value::Integer(2), "bob".into()]))?;

        let select = Statement::Select {
            select: Some(vec![SelectColumn::new(Some("t"), "name").with_alias("who")]),
            from: vec![FromTable::alias("T", "t")],
            r#where: Some(Predicate::new(Comparator::Greater, Operand::qualified("t", "id"), 1i64).into()),
        };
        let result = executor.execute(select)?;
        assert_eq!(
            result,
            ResultSet::Select { columns: vec!["who".to_string()], rows: vec![vec!["bob".into()]] }
        );
        assert_eq!(result.to_string(), "+-----+\n| WHO |\n+-----+\n| bob |\n+-----+");
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(ResultSet::CreateTable { name: "t".to_string() }.to_string(), "'t' table is created");
        assert_eq!(ResultSet::Delete { deleted: 2, blocked: 0 }.to_string(), "2 row(s) deleted");
        assert_eq!(
            ResultSet::Delete { deleted: 0, blocked: 1 }.to_string(),
            "0 row(s) deleted\n1 row(s) are not deleted due to referential integrity"
        );
        assert_eq!(ResultSet::ShowTables { tables: vec![] }.to_string(), "there is no table");
    }
}
