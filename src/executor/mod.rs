pub mod format;

use std::path::Path;

use crate::planner::ast::{ColumnDef, Command, Condition, Literal, Projection};
use crate::storage::catalog::{Catalog, TABLES_META};
use crate::storage::schema::{ColumnAttribute, ColumnSchema, TableSchema};
use crate::storage::table::Filter;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::{type_code_for, value_from_str, OperatorType, SchemaDataType, Value};
use crate::types::TypeCode;

/// What one executed command hands back to the shell.
pub enum ExecutionOutcome {
    Message(String),
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Exit,
}

/// Turns parsed commands into catalog and table-engine calls.
pub struct Executor {
    catalog: Catalog,
}

impl Executor {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        Ok(Self {
            catalog: Catalog::new(data_dir)?,
        })
    }

    pub fn execute(&mut self, command: Command) -> Result<ExecutionOutcome> {
        match command {
            Command::CreateTable {
                table_name,
                columns,
            } => self.execute_create(table_name, columns),
            Command::InsertInto { table_name, values } => self.execute_insert(table_name, values),
            Command::SelectFrom {
                table_name,
                projection,
                where_clause,
            } => self.execute_select(&table_name, &projection, where_clause.as_ref()),
            Command::UpdateSet {
                table_name,
                sets,
                where_clause,
            } => self.execute_update(&table_name, &sets, &where_clause),
            Command::DeleteFrom {
                table_name,
                where_clause,
            } => self.execute_delete(&table_name, &where_clause),
            Command::DropTable { table_name } => {
                self.catalog.drop_table(&table_name)?;
                Ok(ExecutionOutcome::Message(format!(
                    "Table '{}' dropped.",
                    table_name
                )))
            }
            Command::ShowTables => self.execute_select(
                TABLES_META,
                &Projection::Columns(vec!["table_name".to_string()]),
                None,
            ),
            Command::Exit => {
                self.catalog.save_table_info()?;
                Ok(ExecutionOutcome::Exit)
            }
        }
    }

    fn execute_create(
        &mut self,
        table_name: String,
        columns: Vec<ColumnDef>,
    ) -> Result<ExecutionOutcome> {
        let first = columns.first().ok_or_else(|| DatabaseError::InvalidSchema {
            reason: "a table needs at least one column".to_string(),
        })?;
        if first.data_type != SchemaDataType::Int || !first.primary_key {
            return Err(DatabaseError::InvalidSchema {
                reason: "the first column must be INT PRIMARY KEY".to_string(),
            });
        }
        if columns.iter().skip(1).any(|column| column.primary_key) {
            return Err(DatabaseError::InvalidSchema {
                reason: "only the first column can be the primary key".to_string(),
            });
        }

        let schema_columns = columns
            .iter()
            .enumerate()
            .map(|(position, column)| {
                let attribute = if position == 0 {
                    ColumnAttribute::PrimaryKey
                } else if column.not_null {
                    ColumnAttribute::NotNull
                } else {
                    ColumnAttribute::CouldNull
                };
                ColumnSchema::new(&column.name, column.data_type, attribute)
            })
            .collect();

        self.catalog
            .create_table(TableSchema::new(&table_name, schema_columns))?;
        self.catalog.update_table_info(TABLES_META)?;
        self.catalog
            .update_table_info(crate::storage::catalog::COLUMNS_META)?;
        Ok(ExecutionOutcome::Message(format!(
            "Table '{}' created.",
            table_name
        )))
    }

    fn execute_insert(
        &mut self,
        table_name: String,
        literals: Vec<Literal>,
    ) -> Result<ExecutionOutcome> {
        let schema = self.catalog.table(&table_name)?.schema().clone();
        if literals.len() != schema.columns.len() {
            return Err(DatabaseError::ValueCountMismatch {
                table: table_name,
                expected: schema.columns.len(),
                actual: literals.len(),
            });
        }

        let mut type_codes = Vec::with_capacity(literals.len());
        let mut values = Vec::with_capacity(literals.len());
        for (column, literal) in schema.columns.iter().zip(&literals) {
            let (type_code, value) = bind_value(column, literal, false)?;
            type_codes.push(type_code);
            values.push(value);
        }

        self.catalog.table(&table_name)?.insert(&type_codes, &values)?;
        self.catalog.update_table_info(&table_name)?;
        Ok(ExecutionOutcome::Message("1 row inserted.".to_string()))
    }

    fn execute_select(
        &mut self,
        table_name: &str,
        projection: &Projection,
        where_clause: Option<&Condition>,
    ) -> Result<ExecutionOutcome> {
        let schema = self.catalog.table(table_name)?.schema().clone();
        let filter = where_clause
            .map(|condition| bind_condition(&schema, condition))
            .transpose()?;

        let column_indexes: Vec<usize> = match projection {
            Projection::All => (0..schema.columns.len()).collect(),
            Projection::Columns(names) => names
                .iter()
                .map(|name| {
                    schema
                        .column_index(name)
                        .ok_or_else(|| DatabaseError::ColumnNotFound {
                            name: name.clone(),
                            table: table_name.to_string(),
                        })
                })
                .collect::<Result<_>>()?,
        };

        let rows = self.catalog.table(table_name)?.select(filter.as_ref())?;
        let columns = column_indexes
            .iter()
            .map(|i| schema.columns[*i].name.clone())
            .collect();
        let projected = rows
            .iter()
            .map(|row| {
                column_indexes
                    .iter()
                    .map(|i| row.values[*i].clone())
                    .collect()
            })
            .collect();
        Ok(ExecutionOutcome::Rows {
            columns,
            rows: projected,
        })
    }

    fn execute_update(
        &mut self,
        table_name: &str,
        sets: &[(String, Literal)],
        where_clause: &Condition,
    ) -> Result<ExecutionOutcome> {
        let schema = self.catalog.table(table_name)?.schema().clone();
        let key = primary_key_condition(&schema, where_clause, "UPDATE")?;

        let mut bound_sets = Vec::with_capacity(sets.len());
        for (column_name, literal) in sets {
            let column_index = schema.column_index(column_name).ok_or_else(|| {
                DatabaseError::ColumnNotFound {
                    name: column_name.clone(),
                    table: table_name.to_string(),
                }
            })?;
            let (type_code, value) = bind_value(&schema.columns[column_index], literal, false)?;
            bound_sets.push((column_index, type_code, value));
        }

        let updated = self.catalog.table(table_name)?.update(key, &bound_sets)?;
        Ok(ExecutionOutcome::Message(format!(
            "{} column(s) updated.",
            updated
        )))
    }

    fn execute_delete(
        &mut self,
        table_name: &str,
        where_clause: &Condition,
    ) -> Result<ExecutionOutcome> {
        let schema = self.catalog.table(table_name)?.schema().clone();
        let key = primary_key_condition(&schema, where_clause, "DELETE")?;
        let deleted = self.catalog.table(table_name)?.delete(key)?;
        Ok(ExecutionOutcome::Message(format!(
            "{} row(s) deleted.",
            if deleted { 1 } else { 0 }
        )))
    }
}

/// Bind a literal to a column: derive the type code and the typed value.
/// NULLs compress to the narrowest null code; in write position they must
/// land on a nullable column.
fn bind_value(
    column: &ColumnSchema,
    literal: &Literal,
    where_position: bool,
) -> Result<(TypeCode, Value)> {
    match literal {
        Literal::Null => {
            if !where_position && !column.attribute.is_nullable() {
                return Err(DatabaseError::NullViolation {
                    column: column.name.clone(),
                });
            }
            Ok((column.data_type.null_code(), Value::Null))
        }
        Literal::Number(text) | Literal::Text(text) => {
            let value = value_from_str(column.data_type, text).map_err(|err| match err {
                DatabaseError::TypeMismatch {
                    expected, actual, ..
                } => DatabaseError::TypeMismatch {
                    column: column.name.clone(),
                    expected,
                    actual,
                },
                other => other,
            })?;
            Ok((type_code_for(column.data_type, &value)?, value))
        }
    }
}

fn bind_condition(schema: &TableSchema, condition: &Condition) -> Result<Filter> {
    let column_index =
        schema
            .column_index(&condition.column)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: condition.column.clone(),
                table: schema.table_name.clone(),
            })?;
    let (type_code, value) = bind_value(&schema.columns[column_index], &condition.value, true)?;
    Ok(Filter {
        column_index,
        op: condition.op,
        type_code,
        value,
    })
}

/// UPDATE and DELETE address exactly one row through `primary_key = value`.
fn primary_key_condition(
    schema: &TableSchema,
    condition: &Condition,
    operation: &str,
) -> Result<i32> {
    if condition.op != OperatorType::Equal || !schema.is_primary_key(&condition.column) {
        return Err(DatabaseError::PrimaryKeyConditionRequired {
            operation: operation.to_string(),
        });
    }
    match bind_value(&schema.columns[0], &condition.value, true)? {
        (_, Value::Int(key)) => Ok(key),
        _ => Err(DatabaseError::PrimaryKeyConditionRequired {
            operation: operation.to_string(),
        }),
    }
}
