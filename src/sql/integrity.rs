//! 完整性约束：主键唯一、外键引用，以及删除时的阻止 / 级联置空

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::db_error::{Error, Result};
use crate::errdata;
use crate::sql::expression::{filter, Expression};
use crate::sql::Relation;
use crate::storage::Catalog;
use crate::types::{Attribute, ForeignKeyConstraint, Value};

/// 校验一个外键定义，通过时返回对应的约束（`nullable` 由调用方按源列计算）
///
/// 检查顺序：列数一致、源列存在、被引用列存在且为主键且类型一致、覆盖被引用表的全部主键。
pub fn validate_foreign_key(
    schema: &[Attribute],
    columns: &[String],
    target: &Relation,
    references: &[String],
) -> Result<ForeignKeyConstraint> {
    if columns.len() != references.len() {
        return Err(Error::ReferenceType(target.name.clone()));
    }
    let mut sources = Vec::with_capacity(columns.len());
    for column in columns {
        let attr = schema
            .iter()
            .find(|a| &a.name == column)
            .ok_or_else(|| Error::NonExistingColumnDef(column.clone()))?;
        sources.push(attr);
    }
    for (source, reference) in sources.iter().zip(references) {
        let attr = target
            .attribute(reference)
            .ok_or_else(|| Error::ReferenceColumnExistence(reference.clone()))?;
        if !attr.primary {
            return Err(Error::ReferenceNonPrimaryKey(reference.clone()));
        }
        if !Attribute::types_match(source, attr) {
            return Err(Error::ReferenceType(source.name.clone()));
        }
    }
    let referenced: BTreeSet<&String> = references.iter().collect();
    let primary: BTreeSet<&String> = target.primary_key.iter().collect();
    if referenced != primary {
        return Err(Error::ReferencePartialKey(target.name.clone()));
    }
    Ok(ForeignKeyConstraint::new(columns.to_vec(), target.name.clone(), references.to_vec()))
}

/// 待插入行的主键在表中已存在时报错
pub fn check_primary_key(relation: &Relation, row: &[Value]) -> Result<()> {
    let key = relation.project_columns(row, &relation.primary_key)?;
    let Some(expr) = Expression::conjunction(key) else {
        return Ok(());
    };
    if !filter(Some(&expr), &relation.schema, &relation.rows)?.is_empty() {
        warn!(table = %relation.name, key = %expr, "duplicate primary key");
        return Err(Error::InsertDuplicatePrimaryKey);
    }
    Ok(())
}

/// 待插入行的每个外键都必须在被引用表中找到对应的行
///
/// 只要有一个外键列为 NULL，就跳过全部外键检查。
pub fn check_foreign_keys(relation: &Relation, row: &[Value], catalog: &mut dyn Catalog) -> Result<()> {
    for fk in &relation.foreign_keys {
        for (_, value) in relation.project_columns(row, &fk.columns)? {
            if value.is_null() {
                debug!(table = %relation.name, "null foreign key, skipping referential checks");
                return Ok(());
            }
        }
    }

    for fk in &relation.foreign_keys {
        let target = catalog
            .load(&fk.table)?
            .ok_or_else(|| Error::InsertReferentialIntegrity(fk.table.clone()))?;
        let values = relation.project_columns(row, &fk.columns)?;
        let key = fk.ref_columns.iter().cloned().zip(values.into_iter().map(|(_, v)| v));
        let expr = Expression::conjunction(key);
        if filter(expr.as_ref(), &target.schema, &target.rows)?.is_empty() {
            warn!(table = %relation.name, target = %fk.table, "foreign key has no referenced row");
            return Err(Error::InsertReferentialIntegrity(fk.table.clone()));
        }
    }
    Ok(())
}

/// `referencing` 中通过外键 `fk` 引用了主键值 `key` 的行
fn referencing_rows(referencing: &Relation, fk: &ForeignKeyConstraint, key: &[(String, Value)]) -> Result<Vec<usize>> {
    let pairs = fk
        .ref_columns
        .iter()
        .zip(&fk.columns)
        .map(|(ref_column, column)| {
            let value = key
                .iter()
                .find(|(name, _)| name == ref_column)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| errdata!("key of {} has no column {ref_column}", fk.table))?;
            Ok((column.clone(), value))
        })
        .collect::<Result<Vec<_>>>()?;
    filter(Expression::conjunction(pairs).as_ref(), &referencing.schema, &referencing.rows)
}

/// 主键值 `key`（属于表 `target`）是否被某张表通过不可为空的外键引用
pub fn is_restricted(referencing: &[Relation], target: &str, key: &[(String, Value)]) -> Result<bool> {
    for relation in referencing {
        for fk in relation.foreign_keys.iter().filter(|fk| fk.table == target && !fk.nullable) {
            if !referencing_rows(relation, fk, key)?.is_empty() {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// 把 `referencing` 中引用了 `key` 的可为空外键列置为 NULL，返回受影响的行数
pub fn cascade_null(referencing: &mut Relation, target: &str, key: &[(String, Value)]) -> Result<usize> {
    let mut count = 0;
    let foreign_keys: Vec<_> = referencing
        .foreign_keys
        .iter()
        .filter(|fk| fk.table == target && fk.nullable)
        .cloned()
        .collect();
    for fk in foreign_keys {
        let rows = referencing_rows(referencing, &fk, key)?;
        let columns = fk.columns.iter().map(|c| referencing.column_index(c)).collect::<Result<Vec<_>>>()?;
        for &row in &rows {
            for &column in &columns {
                referencing.rows[row][column] = Value::Null;
            }
        }
        count += rows.len();
    }
    Ok(count)
}

/// 在被引用表 `target` 中登记引用方 `name`
pub fn add_back_reference(target: &mut Relation, name: &str) {
    target.referenced_by.insert(name.to_string());
}

/// 从被引用表 `target` 中移除引用方 `name`，返回是否有变化
pub fn remove_back_reference(target: &mut Relation, name: &str) -> bool {
    target.referenced_by.remove(name)
}
