use crate::types::cell;
use crate::types::error::Result;
use crate::types::value::Value;
use crate::types::TypeCode;

/// One decoded tuple: the per-column type codes alongside the values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub type_codes: Vec<TypeCode>,
    pub values: Vec<Value>,
}

impl Row {
    /// Decode every column of a leaf cell.
    pub fn from_leaf_cell(cell_bytes: &[u8]) -> Result<Self> {
        let columns = cell::num_columns(cell_bytes);
        let mut type_codes = Vec::with_capacity(columns);
        let mut values = Vec::with_capacity(columns);
        for i in 0..columns {
            type_codes.push(cell::type_code_at(cell_bytes, i));
            values.push(cell::value_at(cell_bytes, i)?);
        }
        Ok(Row { type_codes, values })
    }
}
