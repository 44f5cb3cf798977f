pub mod cell;
pub mod error;
pub mod page;
pub mod row;
pub mod value;

// Common type aliases
pub type PageIndex = u32;
pub type PagePointer = u32;
pub type CellIndex = usize;
pub type CellKey = i32;
pub type TypeCode = u8;

// Page geometry
pub const PAGE_SIZE: usize = 512;

// Page header: type(1) | cell_num(1) | cell_content_offset(2 BE) | right_most_pointer(4 BE)
pub const PAGE_TYPE_OFFSET: usize = 0;
pub const CELL_NUM_OFFSET: usize = 1;
pub const CELL_CONTENT_OFFSET_OFFSET: usize = 2;
pub const RIGHT_MOST_POINTER_OFFSET: usize = 4;
pub const PAGE_HEADER_SIZE: usize = 8;

// Slot array entries are 2-byte big-endian offsets into the page
pub const CELL_POINTER_SIZE: usize = 2;

// Leaf cell: payload_length(2 BE) | rowid(4 BE) | num_columns(1) | type_codes | values
pub const LEAF_ROWID_OFFSET: usize = 2;
pub const LEAF_PAYLOAD_OFFSET: usize = 6;
pub const LEAF_NUM_COLUMNS_OFFSET: usize = 6;
pub const LEAF_TYPE_CODES_OFFSET: usize = 7;

// Interior cell: left_child(4 BE) | key(4 BE)
pub const INTERIOR_CELL_SIZE: usize = 8;
pub const INTERIOR_KEY_OFFSET: usize = 4;
