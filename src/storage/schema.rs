use crate::types::value::SchemaDataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAttribute {
    PrimaryKey,
    NotNull,
    CouldNull,
}

impl ColumnAttribute {
    pub fn is_nullable(&self) -> bool {
        matches!(self, ColumnAttribute::CouldNull)
    }

    /// `is_nullable` catalog column value.
    pub fn nullable_str(&self) -> &'static str {
        if self.is_nullable() {
            "YES"
        } else {
            "NO"
        }
    }

    /// `column_key` catalog column value.
    pub fn key_str(&self) -> &'static str {
        match self {
            ColumnAttribute::PrimaryKey => "PRI",
            _ => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: SchemaDataType,
    pub attribute: ColumnAttribute,
}

impl ColumnSchema {
    pub fn new(name: &str, data_type: SchemaDataType, attribute: ColumnAttribute) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            attribute,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(table_name: &str, columns: Vec<ColumnSchema>) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// The first column; CREATE enforces that it is the INT primary key.
    pub fn primary_key(&self) -> &ColumnSchema {
        &self.columns[0]
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key().name == name
    }
}
