use std::collections::BTreeSet;

use crate::storage::pager::Pager;
use crate::types::error::{DatabaseError, Result};
use crate::types::{
    CellIndex, CellKey, PageIndex, PagePointer, CELL_CONTENT_OFFSET_OFFSET, CELL_NUM_OFFSET,
    CELL_POINTER_SIZE, INTERIOR_CELL_SIZE, INTERIOR_KEY_OFFSET, LEAF_PAYLOAD_OFFSET,
    LEAF_ROWID_OFFSET, PAGE_HEADER_SIZE, PAGE_SIZE, PAGE_TYPE_OFFSET, RIGHT_MOST_POINTER_OFFSET,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    IndexInterior = 0x02,
    TableInterior = 0x05,
    IndexLeaf = 0x0a,
    TableLeaf = 0x0d,
}

impl PageType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x02 => Ok(PageType::IndexInterior),
            0x05 => Ok(PageType::TableInterior),
            0x0a => Ok(PageType::IndexLeaf),
            0x0d => Ok(PageType::TableLeaf),
            _ => Err(DatabaseError::InvalidPageType(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/*
 * Page layout on disk (512 bytes):
 * ┌──────────────────────────────────────────────────────────────┐
 * │ header: type(1) cell_num(1) content_offset(2 BE) rmp(4 BE)   │
 * ├──────────────────────────────────────────────────────────────┤
 * │ slot array: cell_num x 2-byte BE offsets, key-sorted         │
 * ├──────────────────────────────────────────────────────────────┤
 * │ free space                                                   │
 * ├──────────────────────────────────────────────────────────────┤
 * │ cell heap, growing down from the end of the page             │
 * └──────────────────────────────────────────────────────────────┘
 */
#[derive(Debug)]
pub struct Page {
    page_base: u64,

    // page header
    page_type: PageType,
    cell_num: u8,
    cell_content_offset: u16,
    right_most_pointer: PagePointer,

    // slot array, mirrored in memory
    cell_pointers: Vec<u16>,

    // keys in slot order
    key_set: BTreeSet<CellKey>,

    // in-memory only, rebuilt on load
    parent: PageIndex,
}

impl Page {
    pub fn new(page_base: u64, page_type: PageType) -> Self {
        Self {
            page_base,
            page_type,
            cell_num: 0,
            cell_content_offset: PAGE_SIZE as u16,
            right_most_pointer: 0,
            cell_pointers: Vec::new(),
            key_set: BTreeSet::new(),
            parent: 0,
        }
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    pub fn is_leaf(&self) -> bool {
        self.page_type == PageType::TableLeaf
    }

    pub fn cell_num(&self) -> u8 {
        self.cell_num
    }

    pub fn right_most_pointer(&self) -> PagePointer {
        self.right_most_pointer
    }

    pub fn set_right_most_pointer(&mut self, pointer: PagePointer) {
        self.right_most_pointer = pointer;
    }

    pub fn parent(&self) -> PageIndex {
        self.parent
    }

    pub fn set_parent(&mut self, parent: PageIndex) {
        self.parent = parent;
    }

    pub fn keys(&self) -> impl Iterator<Item = &CellKey> {
        self.key_set.iter()
    }

    /// Read the header, the slot array, and every cell key back from disk.
    pub fn parse_info(&mut self, pager: &mut Pager) -> Result<()> {
        let mut header = [0u8; PAGE_HEADER_SIZE];
        pager.read_at(self.page_base, &mut header)?;

        self.page_type = PageType::from_u8(header[PAGE_TYPE_OFFSET])?;
        self.cell_num = header[CELL_NUM_OFFSET];
        self.cell_content_offset = u16::from_be_bytes([
            header[CELL_CONTENT_OFFSET_OFFSET],
            header[CELL_CONTENT_OFFSET_OFFSET + 1],
        ]);
        self.right_most_pointer = u32::from_be_bytes([
            header[RIGHT_MOST_POINTER_OFFSET],
            header[RIGHT_MOST_POINTER_OFFSET + 1],
            header[RIGHT_MOST_POINTER_OFFSET + 2],
            header[RIGHT_MOST_POINTER_OFFSET + 3],
        ]);

        self.cell_pointers.clear();
        if self.cell_num > 0 {
            let mut buffer = vec![0u8; self.cell_num as usize * CELL_POINTER_SIZE];
            pager.read_at(self.page_base + PAGE_HEADER_SIZE as u64, &mut buffer)?;
            for chunk in buffer.chunks_exact(CELL_POINTER_SIZE) {
                self.cell_pointers.push(u16::from_be_bytes([chunk[0], chunk[1]]));
            }
        }

        self.key_set.clear();
        for index in 0..self.cell_num as usize {
            let key = self.get_cell_key(pager, index)?;
            self.key_set.insert(key);
        }
        Ok(())
    }

    /// Serialize the header and slot array back to the page base.
    pub fn update_info(&self, pager: &mut Pager) -> Result<()> {
        let length = PAGE_HEADER_SIZE + self.cell_num as usize * CELL_POINTER_SIZE;
        let mut data = vec![0u8; length];

        data[PAGE_TYPE_OFFSET] = self.page_type.as_u8();
        data[CELL_NUM_OFFSET] = self.cell_num;
        data[CELL_CONTENT_OFFSET_OFFSET..CELL_CONTENT_OFFSET_OFFSET + 2]
            .copy_from_slice(&self.cell_content_offset.to_be_bytes());
        data[RIGHT_MOST_POINTER_OFFSET..RIGHT_MOST_POINTER_OFFSET + 4]
            .copy_from_slice(&self.right_most_pointer.to_be_bytes());

        for (i, pointer) in self.cell_pointers.iter().enumerate() {
            let offset = PAGE_HEADER_SIZE + i * CELL_POINTER_SIZE;
            data[offset..offset + 2].copy_from_slice(&pointer.to_be_bytes());
        }

        pager.write_at(self.page_base, &data)
    }

    /// Zero the whole 512-byte region on disk.
    pub fn clear(&self, pager: &mut Pager) -> Result<()> {
        pager.write_at(self.page_base, &[0u8; PAGE_SIZE])
    }

    /// Free space sits between the end of the slot array and the lowest used
    /// heap offset; a cell needs its own bytes plus one slot entry.
    pub fn has_space(&self, cell_size: usize) -> bool {
        let slot_array_end = PAGE_HEADER_SIZE + self.cell_num as usize * CELL_POINTER_SIZE;
        let free_space = (self.cell_content_offset as usize).saturating_sub(slot_array_end);
        free_space >= cell_size + CELL_POINTER_SIZE
    }

    /// Write the cell into the heap and slot it at its key rank. Does not
    /// rebalance.
    pub fn insert_cell(&mut self, pager: &mut Pager, key: CellKey, cell: &[u8]) -> Result<()> {
        self.cell_content_offset -= cell.len() as u16;
        self.key_set.insert(key);
        let rank = self.key_set.range(..key).count();

        pager.write_at(self.page_base + self.cell_content_offset as u64, cell)?;
        self.cell_num += 1;
        self.cell_pointers.insert(rank, self.cell_content_offset);
        self.update_info(pager)
    }

    /// Drop the slot and the key. Heap bytes are reclaimed by `reorder`.
    pub fn delete_cell(&mut self, index: CellIndex) {
        if index >= self.cell_num as usize {
            return;
        }
        self.cell_pointers.remove(index);
        if let Some(key) = self.key_set.iter().nth(index).copied() {
            self.key_set.remove(&key);
        }
        self.cell_num -= 1;
    }

    /// Defragmentation pass: read every cell out, zero the page, re-insert in
    /// key order.
    pub fn reorder(&mut self, pager: &mut Pager) -> Result<()> {
        let mut cells = Vec::with_capacity(self.cell_num as usize);
        for index in 0..self.cell_num as usize {
            let key = self.get_cell_key(pager, index)?;
            let cell = self.get_cell(pager, index)?;
            cells.push((key, cell));
        }

        self.clear(pager)?;
        self.cell_num = 0;
        self.cell_content_offset = PAGE_SIZE as u16;
        self.cell_pointers.clear();
        self.key_set.clear();

        for (key, cell) in &cells {
            self.insert_cell(pager, *key, cell)?;
        }
        if cells.is_empty() {
            self.update_info(pager)?;
        }
        Ok(())
    }

    /// Cell key: the rowid of a leaf cell, the separator key of an interior
    /// cell.
    pub fn get_cell_key(&self, pager: &mut Pager, index: CellIndex) -> Result<CellKey> {
        let key_offset = match self.page_type {
            PageType::TableInterior => INTERIOR_KEY_OFFSET,
            _ => LEAF_ROWID_OFFSET,
        };
        let mut buffer = [0u8; 4];
        pager.read_at(
            self.page_base + self.cell_pointers[index] as u64 + key_offset as u64,
            &mut buffer,
        )?;
        Ok(CellKey::from_be_bytes(buffer))
    }

    pub fn get_cell(&self, pager: &mut Pager, index: CellIndex) -> Result<Vec<u8>> {
        let cell_size = if self.is_leaf() {
            let mut length = [0u8; 2];
            pager.read_at(self.page_base + self.cell_pointers[index] as u64, &mut length)?;
            u16::from_be_bytes(length) as usize + LEAF_PAYLOAD_OFFSET
        } else {
            INTERIOR_CELL_SIZE
        };

        let mut cell = vec![0u8; cell_size];
        pager.read_at(self.page_base + self.cell_pointers[index] as u64, &mut cell)?;
        Ok(cell)
    }

    pub fn find_cell(&self, pager: &mut Pager, key: CellKey) -> Result<Option<Vec<u8>>> {
        match self.key_index(key) {
            Some(index) => Ok(Some(self.get_cell(pager, index)?)),
            None => Ok(None),
        }
    }

    /// Rank of the key inside this page, if present.
    pub fn key_index(&self, key: CellKey) -> Option<CellIndex> {
        if self.key_set.contains(&key) {
            Some(self.key_set.range(..key).count())
        } else {
            None
        }
    }

    /// Overwrite the cell bytes at an existing slot.
    pub fn write_cell_at(&self, pager: &mut Pager, index: CellIndex, cell: &[u8]) -> Result<()> {
        pager.write_at(self.page_base + self.cell_pointers[index] as u64, cell)
    }

    pub fn get_cell_left_pointer(&self, pager: &mut Pager, index: CellIndex) -> Result<PagePointer> {
        assert!(
            self.page_type == PageType::TableInterior,
            "left pointer fetched from a non-interior page"
        );
        let mut buffer = [0u8; 4];
        pager.read_at(self.page_base + self.cell_pointers[index] as u64, &mut buffer)?;
        Ok(PagePointer::from_be_bytes(buffer))
    }

    pub fn set_cell_left_pointer(
        &self,
        pager: &mut Pager,
        index: CellIndex,
        pointer: PagePointer,
    ) -> Result<()> {
        assert!(
            self.page_type == PageType::TableInterior,
            "left pointer written to a non-interior page"
        );
        pager.write_at(
            self.page_base + self.cell_pointers[index] as u64,
            &pointer.to_be_bytes(),
        )
    }

    /// The first slot's left child: the subtree below every key on the page.
    pub fn get_left_most_page_pointer(&self, pager: &mut Pager) -> Result<PagePointer> {
        self.get_cell_left_pointer(pager, 0)
    }

    pub fn get_cell_key_range(&self, pager: &mut Pager) -> Result<(CellKey, CellKey)> {
        let min_key = self.get_cell_key(pager, 0)?;
        let max_key = self.get_cell_key(pager, self.cell_num as usize - 1)?;
        Ok((min_key, max_key))
    }

    /// Rank of the first key not below the given key.
    pub fn get_lower_bound(&self, key: CellKey) -> CellIndex {
        self.key_set.range(..key).count()
    }

    pub fn is_key_duplicate(&self, key: CellKey) -> bool {
        self.key_set.contains(&key)
    }
}
