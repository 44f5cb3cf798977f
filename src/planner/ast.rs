use crate::types::value::{OperatorType, SchemaDataType};

/// Raw literal as written in the SQL text; the executor binds it against the
/// table schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(String),
    Text(String),
    Null,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: SchemaDataType,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

/// Single-column WHERE condition.
#[derive(Debug, Clone)]
pub struct Condition {
    pub column: String,
    pub op: OperatorType,
    pub value: Literal,
}

#[derive(Debug, Clone)]
pub enum Command {
    CreateTable {
        table_name: String,
        columns: Vec<ColumnDef>,
    },
    InsertInto {
        table_name: String,
        values: Vec<Literal>,
    },
    SelectFrom {
        table_name: String,
        projection: Projection,
        where_clause: Option<Condition>,
    },
    UpdateSet {
        table_name: String,
        sets: Vec<(String, Literal)>,
        where_clause: Condition,
    },
    DeleteFrom {
        table_name: String,
        where_clause: Condition,
    },
    DropTable {
        table_name: String,
    },
    ShowTables,
    Exit,
}
