use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db_error::{Error, Result};
use crate::errdata;
use crate::sql::ast::{Column, FromTable, SelectColumn, TableConstraint};
use crate::sql::expression::{filter, Expression};
use crate::sql::integrity;
use crate::storage::Catalog;
use crate::types::{resolve_column, Attribute, DataType, ForeignKeyConstraint, Row, Value};
use crate::utils::ValueCodec;

/// 关系（表）：模式、数据行、约束以及反向引用
///
/// 行内值的位置与 `schema` 一一对应。整个结构作为一个单元持久化。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// 表名；连接产生的中间结果没有名字
    pub name: String,
    pub schema: Vec<Attribute>,
    pub rows: Vec<Row>,
    /// 主键列，按定义顺序
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    /// 持有指向本表外键的表名
    pub referenced_by: BTreeSet<String>,
}

impl ValueCodec for Relation {}

impl Relation {
    /// 根据列定义和表级约束构建一张新表
    ///
    /// 所有校验通过之后才会把本表登记到被引用表的反向引用中并保存这些表，
    /// 失败时不会留下任何修改。新表本身由调用方保存。
    pub fn create_schema(
        name: &str,
        columns: &[Column],
        constraints: &[TableConstraint],
        catalog: &mut dyn Catalog,
    ) -> Result<Relation> {
        let mut relation = Relation { name: name.to_string(), ..Default::default() };

        // 1、主键子句：列级 PRIMARY KEY 与表级主键子句合起来最多一个
        let mut clauses: Vec<Vec<String>> =
            columns.iter().filter(|c| c.primary_key).map(|c| vec![c.name.clone()]).collect();
        clauses.extend(constraints.iter().filter_map(|c| match c {
            TableConstraint::PrimaryKey(cols) => Some(cols.clone()),
            TableConstraint::ForeignKey { .. } => None,
        }));
        if clauses.len() > 1 {
            return Err(Error::DuplicatePrimaryKeyDef);
        }

        // 2、列定义
        for column in columns {
            if relation.attribute(&column.name).is_some() {
                return Err(Error::DuplicateColumnDef(column.name.clone()));
            }
            let char_length = match column.datatype {
                DataType::Char if column.char_length <= 0 => {
                    return Err(Error::CharLength(column.name.clone()));
                }
                DataType::Char => column.char_length as usize,
                _ => 0,
            };
            let mut attr = Attribute::new(&column.name, column.datatype, char_length, column.nullable);
            attr.table = name.to_string();
            relation.schema.push(attr);
        }

        // 3、主键列
        for column in clauses.into_iter().flatten() {
            let attr = relation
                .attribute_mut(&column)
                .ok_or_else(|| Error::NonExistingColumnDef(column.clone()))?;
            attr.set_primary();
            if !relation.primary_key.contains(&column) {
                relation.primary_key.push(column);
            }
        }

        // 4、外键
        let mut targets: Vec<Relation> = Vec::new();
        for constraint in constraints {
            let TableConstraint::ForeignKey { columns, table, references } = constraint else {
                continue;
            };
            let target = match targets.iter().position(|t| &t.name == table) {
                Some(idx) => targets.swap_remove(idx),
                None => catalog.load(table)?.ok_or_else(|| Error::ReferenceTableExistence(table.clone()))?,
            };
            let mut fk = integrity::validate_foreign_key(&relation.schema, columns, &target, references)?;
            for (column, ref_column) in fk.columns.iter().zip(&fk.ref_columns) {
                if let Some(attr) = relation.attribute_mut(column) {
                    attr.set_foreign(&target.name, ref_column);
                }
            }
            fk.nullable = fk.columns.iter().all(|c| relation.attribute(c).is_some_and(|a| a.nullable));
            relation.foreign_keys.push(fk);
            targets.push(target);
        }

        // 5、全部校验通过，登记反向引用
        for mut target in targets {
            integrity::add_back_reference(&mut target, name);
            catalog.save(&target)?;
        }
        info!(
            table = %name,
            columns = relation.schema.len(),
            primary_key = ?relation.primary_key,
            foreign_keys = relation.foreign_keys.len(),
            "created table"
        );
        Ok(relation)
    }

    /// 连接的单位元：没有列，只有一行空行
    pub fn placeholder() -> Relation {
        Relation { rows: vec![Vec::new()], ..Default::default() }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.schema.iter().find(|a| a.name == name)
    }

    fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.schema.iter_mut().find(|a| a.name == name)
    }

    /// 列在行内的位置
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| errdata!("table {} has no column {name}", self.name))
    }

    /// 取出一行在若干列上的值，按给定列的顺序组成 (列名, 值)
    pub fn project_columns(&self, row: &[Value], columns: &[String]) -> Result<Vec<(String, Value)>> {
        columns
            .iter()
            .map(|column| {
                let idx = self.column_index(column)?;
                let value = row.get(idx).ok_or_else(|| errdata!("row of {} is shorter than its schema", self.name))?;
                Ok((column.clone(), value.clone()))
            })
            .collect()
    }

    /// 插入一行
    ///
    /// - `columns` 为 `None` 时按模式顺序给出全部值；否则未列出的列取 NULL；
    /// - 依次做类型检查、主键唯一性检查、外键引用检查，全部通过才追加。
    pub fn insert(&mut self, columns: Option<&[String]>, values: Vec<Value>, catalog: &mut dyn Catalog) -> Result<()> {
        let row = self.build_row(columns, values)?;
        integrity::check_primary_key(self, &row)?;
        integrity::check_foreign_keys(self, &row, catalog)?;
        debug!(table = %self.name, row = ?row, "inserted row");
        self.rows.push(row);
        Ok(())
    }

    fn build_row(&self, columns: Option<&[String]>, values: Vec<Value>) -> Result<Row> {
        let Some(columns) = columns else {
            if values.len() != self.schema.len() {
                return Err(Error::InsertTypeMismatch(self.name.clone()));
            }
            for (attr, value) in self.schema.iter().zip(&values) {
                attr.type_check(value)?;
            }
            return Ok(values);
        };

        if columns.len() != values.len() {
            return Err(Error::InsertTypeMismatch(self.name.clone()));
        }
        if let Some(column) = columns.iter().duplicates().next() {
            return Err(Error::InsertTypeMismatch(column.clone()));
        }
        if let Some(column) = columns.iter().find(|c| self.attribute(c).is_none()) {
            return Err(Error::InsertColumnExistence(column.clone()));
        }

        let mut values: Vec<Option<Value>> = values.into_iter().map(Some).collect();
        self.schema
            .iter()
            .map(|attr| match columns.iter().position(|c| c == &attr.name) {
                Some(idx) => {
                    let value = values[idx].take().unwrap_or(Value::Null);
                    attr.type_check(&value)?;
                    Ok(value)
                }
                None if attr.nullable => Ok(Value::Null),
                None => Err(Error::InsertColumnNonNullable(attr.name.clone())),
            })
            .collect()
    }

    /// 按存储顺序返回满足条件的行
    pub fn search(&self, expr: Option<&Expression>) -> Result<Vec<Row>> {
        let matched = filter(expr, &self.schema, &self.rows)?;
        Ok(matched.into_iter().map(|idx| self.rows[idx].clone()).collect())
    }

    /// 删除满足条件的行，返回 (删除的行数, 被阻止的行数)
    ///
    /// 行的主键被某张表通过不可为空的外键引用时该行被阻止；否则把可为空外键的
    /// 引用置为 NULL，保存被修改的引用表，再删除该行。没有主键的表任何行都可删除。
    pub fn delete(&mut self, expr: Option<&Expression>, catalog: &mut dyn Catalog) -> Result<(usize, usize)> {
        let matched = filter(expr, &self.schema, &self.rows)?;

        let mut referencing = Vec::new();
        if !self.primary_key.is_empty() {
            for name in &self.referenced_by {
                match catalog.load(name)? {
                    Some(relation) => referencing.push(relation),
                    None => warn!(table = %self.name, referencing = %name, "dangling back reference"),
                }
            }
        }

        let mut touched = vec![false; referencing.len()];
        let mut removed = BTreeSet::new();
        let mut blocked = 0;
        for idx in matched {
            if self.primary_key.is_empty() {
                removed.insert(idx);
                continue;
            }
            let key = self.project_columns(&self.rows[idx], &self.primary_key)?;
            if integrity::is_restricted(&referencing, &self.name, &key)? {
                debug!(table = %self.name, key = ?key, "delete blocked by foreign key");
                blocked += 1;
                continue;
            }
            for (relation, touched) in referencing.iter_mut().zip(touched.iter_mut()) {
                if integrity::cascade_null(relation, &self.name, &key)? > 0 {
                    *touched = true;
                }
            }
            removed.insert(idx);
        }

        for (relation, _) in referencing.iter().zip(&touched).filter(|(_, touched)| **touched) {
            info!(table = %relation.name, from = %self.name, "nulled foreign keys of deleted rows");
            catalog.save(relation)?;
        }

        let mut idx = 0;
        self.rows.retain(|_| {
            let keep = !removed.contains(&idx);
            idx += 1;
            keep
        });
        let deleted = removed.len();
        info!(table = %self.name, deleted, blocked, "deleted rows");
        Ok((deleted, blocked))
    }

    /// 笛卡尔积：`left` 在外层，`right` 在内层，保持两边的行序
    ///
    /// 列用别名限定；没有别名时用表名，连接出的中间结果保留原有限定。
    pub fn join(left: &Relation, left_alias: Option<&str>, right: &Relation, right_alias: Option<&str>) -> Relation {
        let schema = Self::qualified_schema(left, left_alias)
            .chain(Self::qualified_schema(right, right_alias))
            .collect();
        let rows = left
            .rows
            .iter()
            .cartesian_product(&right.rows)
            .map(|(l, r)| l.iter().chain(r).cloned().collect())
            .collect();
        Relation { schema, rows, ..Default::default() }
    }

    fn qualified_schema<'a>(relation: &'a Relation, alias: Option<&'a str>) -> impl Iterator<Item = Attribute> + 'a {
        let qualifier = alias.or((!relation.name.is_empty()).then_some(relation.name.as_str()));
        relation.schema.iter().cloned().map(move |mut attr| {
            if let Some(qualifier) = qualifier {
                attr.table = qualifier.to_string();
            }
            attr
        })
    }

    /// 查询：对 FROM 中的表从左到右做笛卡尔积，过滤，再投影
    ///
    /// 返回 (表头, 结果行)。
    pub fn select(
        from: &[FromTable],
        projection: Option<&[SelectColumn]>,
        expr: Option<&Expression>,
        catalog: &mut dyn Catalog,
    ) -> Result<(Vec<String>, Vec<Row>)> {
        let mut seen = BTreeSet::new();
        let mut tables = Vec::with_capacity(from.len());
        for table in from {
            let relation = catalog
                .load(&table.name)?
                .ok_or_else(|| Error::SelectTableExistence(table.name.clone()))?;
            // 只检查显式别名，未加别名的同名表允许自连接
            if let Some(alias) = &table.alias {
                if !seen.insert(alias.clone()) {
                    return Err(Error::DuplicateTableAlias(alias.clone()));
                }
            }
            tables.push((relation, table.alias.as_deref()));
        }

        let joined = tables
            .iter()
            .fold(Relation::placeholder(), |acc, (relation, alias)| Relation::join(&acc, None, relation, *alias));
        let rows = joined.search(expr)?;

        let Some(projection) = projection else {
            let headers = joined.schema.iter().map(|a| a.name.clone()).collect_vec();
            debug!(rows = rows.len(), "selected all columns");
            return Ok((headers, rows));
        };

        let indexes = projection
            .iter()
            .map(|column| {
                resolve_column(&joined.schema, column.table.as_deref(), &column.column).map_err(|err| match err {
                    Error::WhereAmbiguousReference(_) | Error::WhereColumnNotExist(_) | Error::WhereTableNotSpecified(_) => {
                        let pattern = match &column.table {
                            Some(table) => format!("{table}.{}", column.column),
                            None => column.column.clone(),
                        };
                        Error::SelectColumnResolve(pattern)
                    }
                    err => err,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let headers = projection.iter().map(|c| c.header().to_string()).collect_vec();
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| indexes.iter().map(|&idx| row[idx].clone()).collect())
            .collect();
        debug!(rows = rows.len(), columns = indexes.len(), "selected rows");
        Ok((headers, rows))
    }

    /// 删表前的清理：仍被引用时拒绝；否则从所有被本表引用的表中移除反向引用
    pub fn drop_cleanup(&self, catalog: &mut dyn Catalog) -> Result<()> {
        if !self.referenced_by.is_empty() {
            warn!(table = %self.name, referenced_by = ?self.referenced_by, "table is still referenced");
            return Err(Error::DropReferencedTable(self.name.clone()));
        }
        for target in self.foreign_keys.iter().map(|fk| fk.table.as_str()).unique() {
            let Some(mut relation) = catalog.load(target)? else {
                continue;
            };
            if integrity::remove_back_reference(&mut relation, &self.name) {
                catalog.save(&relation)?;
            }
        }
        Ok(())
    }
}
