use sqlparser::ast::{
    Assignment, BinaryOperator, ColumnOption, Delete, Expr, FromTable, Insert, ObjectName,
    ObjectType, Query, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator,
    Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::planner::ast::{ColumnDef, Command, Condition, Literal, Projection};
use crate::planner::error::{PlannerError, Result};
use crate::types::value::{OperatorType, SchemaDataType};

pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one semicolon-free statement into a command.
    pub fn parse(&self, sql: &str) -> Result<Command> {
        // EXIT is a shell word, not SQL
        if sql.trim().eq_ignore_ascii_case("exit") {
            return Ok(Command::Exit);
        }

        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, sql)?;
        if statements.len() != 1 {
            return Err(PlannerError::InvalidQuery(
                "expected exactly one statement".to_string(),
            ));
        }
        self.to_command(&statements[0])
    }

    fn to_command(&self, statement: &Statement) -> Result<Command> {
        match statement {
            Statement::CreateTable { name, columns, .. } => {
                let table_name = object_name(name);
                let mut out_columns = Vec::with_capacity(columns.len());
                for column in columns {
                    out_columns.push(convert_column(column)?);
                }
                Ok(Command::CreateTable {
                    table_name,
                    columns: out_columns,
                })
            }
            Statement::Insert(insert) => self.convert_insert(insert),
            Statement::Query(query) => self.convert_select(query),
            Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => self.convert_update(table, assignments, selection.as_ref()),
            Statement::Delete(delete) => self.convert_delete(delete),
            Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            } => {
                let name = names.first().ok_or_else(|| {
                    PlannerError::InvalidQuery("DROP TABLE needs a table name".to_string())
                })?;
                Ok(Command::DropTable {
                    table_name: object_name(name),
                })
            }
            Statement::ShowTables { .. } => Ok(Command::ShowTables),
            other => Err(PlannerError::UnsupportedStatement(other.to_string())),
        }
    }

    fn convert_insert(&self, insert: &Insert) -> Result<Command> {
        let table_name = object_name(&insert.table_name);
        let source = insert.source.as_ref().ok_or_else(|| {
            PlannerError::InvalidQuery("INSERT needs a VALUES clause".to_string())
        })?;
        let rows = match source.body.as_ref() {
            SetExpr::Values(values) => &values.rows,
            other => {
                return Err(PlannerError::UnsupportedExpression(other.to_string()));
            }
        };
        if rows.len() != 1 {
            return Err(PlannerError::InvalidQuery(
                "INSERT expects exactly one VALUES tuple".to_string(),
            ));
        }

        let mut values = Vec::with_capacity(rows[0].len());
        for expr in &rows[0] {
            values.push(convert_literal(expr)?);
        }
        Ok(Command::InsertInto { table_name, values })
    }

    fn convert_select(&self, query: &Query) -> Result<Command> {
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            other => {
                return Err(PlannerError::UnsupportedStatement(other.to_string()));
            }
        };

        let table_name = single_table(&select.from)?;

        let projection = if select
            .projection
            .iter()
            .any(|item| matches!(item, SelectItem::Wildcard(_)))
        {
            Projection::All
        } else {
            let mut columns = Vec::with_capacity(select.projection.len());
            for item in &select.projection {
                match item {
                    SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                        columns.push(ident.value.clone());
                    }
                    other => {
                        return Err(PlannerError::UnsupportedExpression(other.to_string()));
                    }
                }
            }
            Projection::Columns(columns)
        };

        let where_clause = match &select.selection {
            Some(expr) => Some(convert_condition(expr)?),
            None => None,
        };

        Ok(Command::SelectFrom {
            table_name,
            projection,
            where_clause,
        })
    }

    fn convert_update(
        &self,
        table: &TableWithJoins,
        assignments: &[Assignment],
        selection: Option<&Expr>,
    ) -> Result<Command> {
        let table_name = table_factor_name(&table.relation)?;
        let where_clause = selection
            .map(convert_condition)
            .transpose()?
            .ok_or_else(|| {
                PlannerError::InvalidQuery("UPDATE needs a WHERE clause".to_string())
            })?;

        let mut sets = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let column = assignment
                .id
                .last()
                .ok_or_else(|| {
                    PlannerError::InvalidQuery("SET needs a column name".to_string())
                })?
                .value
                .clone();
            sets.push((column, convert_literal(&assignment.value)?));
        }

        Ok(Command::UpdateSet {
            table_name,
            sets,
            where_clause,
        })
    }

    fn convert_delete(&self, delete: &Delete) -> Result<Command> {
        let from = match &delete.from {
            FromTable::WithFromKeyword(from) | FromTable::WithoutKeyword(from) => from,
        };
        let table_name = single_table(from)?;
        let where_clause = delete
            .selection
            .as_ref()
            .map(convert_condition)
            .transpose()?
            .ok_or_else(|| {
                PlannerError::InvalidQuery("DELETE needs a WHERE clause".to_string())
            })?;
        Ok(Command::DeleteFrom {
            table_name,
            where_clause,
        })
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

fn single_table(from: &[TableWithJoins]) -> Result<String> {
    if from.len() != 1 {
        return Err(PlannerError::UnsupportedStatement(
            "exactly one table expected".to_string(),
        ));
    }
    table_factor_name(&from[0].relation)
}

fn table_factor_name(relation: &TableFactor) -> Result<String> {
    match relation {
        TableFactor::Table { name, .. } => Ok(object_name(name)),
        other => Err(PlannerError::UnsupportedStatement(other.to_string())),
    }
}

fn convert_column(column: &sqlparser::ast::ColumnDef) -> Result<ColumnDef> {
    // the Display name of the SQL type is version-stable; precision suffixes
    // like INT(11) are not part of this dialect
    let type_name = column.data_type.to_string();
    let data_type = SchemaDataType::from_sql_name(&type_name)
        .ok_or_else(|| PlannerError::UnsupportedDataType(type_name.clone()))?;

    let mut not_null = false;
    let mut primary_key = false;
    for option in &column.options {
        match &option.option {
            ColumnOption::NotNull => not_null = true,
            ColumnOption::Unique { is_primary, .. } => {
                if *is_primary {
                    primary_key = true;
                }
            }
            _ => {}
        }
    }

    Ok(ColumnDef {
        name: column.name.value.clone(),
        data_type,
        not_null,
        primary_key,
    })
}

fn convert_literal(expr: &Expr) -> Result<Literal> {
    match expr {
        Expr::Value(SqlValue::Number(number, _)) => Ok(Literal::Number(number.clone())),
        Expr::Value(SqlValue::SingleQuotedString(text)) => Ok(Literal::Text(text.clone())),
        Expr::Value(SqlValue::Null) => Ok(Literal::Null),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match convert_literal(expr)? {
            Literal::Number(number) => Ok(Literal::Number(format!("-{}", number))),
            _ => Err(PlannerError::UnsupportedExpression(expr.to_string())),
        },
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn convert_condition(expr: &Expr) -> Result<Condition> {
    match expr {
        Expr::BinaryOp { left, op, right } => {
            let column = match left.as_ref() {
                Expr::Identifier(ident) => ident.value.clone(),
                other => {
                    return Err(PlannerError::UnsupportedExpression(other.to_string()));
                }
            };
            let op = convert_operator(op)?;
            let value = convert_literal(right)?;
            Ok(Condition { column, op, value })
        }
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn convert_operator(op: &BinaryOperator) -> Result<OperatorType> {
    match op {
        BinaryOperator::Eq => Ok(OperatorType::Equal),
        BinaryOperator::NotEq => Ok(OperatorType::Unequal),
        BinaryOperator::Gt => Ok(OperatorType::Larger),
        BinaryOperator::Lt => Ok(OperatorType::Smaller),
        BinaryOperator::GtEq => Ok(OperatorType::NotSmaller),
        BinaryOperator::LtEq => Ok(OperatorType::NotLarger),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}
