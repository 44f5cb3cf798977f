use crate::types::error::{DatabaseError, Result};
use crate::types::value::{type_code_size, value_to_bytes, Value};
use crate::types::{
    CellKey, PageIndex, TypeCode, INTERIOR_KEY_OFFSET, LEAF_NUM_COLUMNS_OFFSET,
    LEAF_PAYLOAD_OFFSET, LEAF_TYPE_CODES_OFFSET,
};

/// Build a leaf cell:
/// `payload_length(2 BE) | rowid(4 BE) | num_columns(1) | type_codes | values`.
pub fn build_leaf_cell(
    rowid: CellKey,
    type_codes: &[TypeCode],
    values: &[Value],
) -> Result<Vec<u8>> {
    let value_bytes_len: usize = type_codes
        .iter()
        .map(|code| type_code_size(*code) as usize)
        .sum();
    let payload_length = 1 + type_codes.len() + value_bytes_len;

    let mut cell = Vec::with_capacity(LEAF_PAYLOAD_OFFSET + payload_length);
    cell.extend_from_slice(&(payload_length as u16).to_be_bytes());
    cell.extend_from_slice(&rowid.to_be_bytes());
    cell.push(type_codes.len() as u8);
    cell.extend_from_slice(type_codes);
    for (code, value) in type_codes.iter().zip(values) {
        cell.extend_from_slice(&value_to_bytes(*code, value)?);
    }
    Ok(cell)
}

/// Build an interior cell: `left_child(4 BE) | key(4 BE)`.
pub fn build_interior_cell(left_child: PageIndex, key: CellKey) -> Vec<u8> {
    let mut cell = Vec::with_capacity(8);
    cell.extend_from_slice(&left_child.to_be_bytes());
    cell.extend_from_slice(&key.to_be_bytes());
    cell
}

pub fn leaf_cell_rowid(cell: &[u8]) -> CellKey {
    CellKey::from_be_bytes([cell[2], cell[3], cell[4], cell[5]])
}

pub fn interior_cell_key(cell: &[u8]) -> CellKey {
    CellKey::from_be_bytes([
        cell[INTERIOR_KEY_OFFSET],
        cell[INTERIOR_KEY_OFFSET + 1],
        cell[INTERIOR_KEY_OFFSET + 2],
        cell[INTERIOR_KEY_OFFSET + 3],
    ])
}

pub fn num_columns(cell: &[u8]) -> usize {
    cell[LEAF_NUM_COLUMNS_OFFSET] as usize
}

pub fn type_code_at(cell: &[u8], column_index: usize) -> TypeCode {
    cell[LEAF_TYPE_CODES_OFFSET + column_index]
}

// Byte offset of a column's value: values start right after the type-code
// run, each preceding column advancing by its own coded width.
fn value_offset(cell: &[u8], column_index: usize) -> usize {
    let columns = num_columns(cell);
    let mut offset = LEAF_TYPE_CODES_OFFSET + columns;
    for i in 0..column_index {
        offset += type_code_size(type_code_at(cell, i)) as usize;
    }
    offset
}

/// Decode one column value out of a leaf cell.
pub fn value_at(cell: &[u8], column_index: usize) -> Result<Value> {
    let code = type_code_at(cell, column_index);
    let offset = value_offset(cell, column_index);
    let size = type_code_size(code) as usize;
    if offset + size > cell.len() {
        return Err(DatabaseError::CorruptedTable {
            reason: format!("column {} extends past the cell payload", column_index),
        });
    }
    crate::types::value::bytes_to_value(code, &cell[offset..offset + size])
}

/// Rewrite one column of a leaf cell in place.
///
/// Same-width replacements overwrite the value bytes and the type code.
/// Narrower replacements splice the value in and shrink the whole cell by the
/// width delta, rewriting the payload-length header to match. Wider
/// replacements are rejected and leave the cell untouched.
pub fn update_value(
    cell: &mut Vec<u8>,
    column_index: usize,
    new_code: TypeCode,
    value: &Value,
) -> Result<bool> {
    let old_code = type_code_at(cell, column_index);
    let old_size = type_code_size(old_code) as usize;
    let new_size = type_code_size(new_code) as usize;

    if new_size > old_size {
        return Ok(false);
    }

    let offset = value_offset(cell, column_index);
    let new_bytes = value_to_bytes(new_code, value)?;

    cell[LEAF_TYPE_CODES_OFFSET + column_index] = new_code;
    let _ = cell.splice(offset..offset + old_size, new_bytes);

    let payload_length = (cell.len() - LEAF_PAYLOAD_OFFSET) as u16;
    cell[0..2].copy_from_slice(&payload_length.to_be_bytes());

    Ok(true)
}
