use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::pager::Pager;
use crate::storage::schema::TableSchema;
use crate::types::cell::{build_interior_cell, build_leaf_cell, update_value};
use crate::types::error::{DatabaseError, Result};
use crate::types::page::{Page, PageType};
use crate::types::row::Row;
use crate::types::value::{compare, OperatorType, Value};
use crate::types::{
    CellIndex, CellKey, PageIndex, TypeCode, CELL_POINTER_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE,
};

/// Sentinel for a fanout that has not been learned yet.
pub const FANOUT_UNSET: i32 = i32::MAX;

/// Bound WHERE condition against one column.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column_index: usize,
    pub op: OperatorType,
    pub type_code: TypeCode,
    pub value: Value,
}

/// Median of `existing keys ∪ {incoming key}`, with its rank among the
/// existing keys.
struct CellPivot {
    index: CellIndex,
    key: CellKey,
}

enum InsertSide {
    Target,
    New,
    // the incoming cell is the pivot itself and moves up instead
    Promoted,
}

/// One table file driven as a B+Tree of 512-byte pages. Pages live in a
/// vector indexed by page number and refer to each other by index; parent
/// links are in-memory only.
#[derive(Debug)]
pub struct TableEngine {
    file_path: PathBuf,
    pager: Pager,
    schema: TableSchema,
    root_page: PageIndex,
    fanout: i32,
    pages: Vec<Page>,
}

impl TableEngine {
    /// New table file with a single empty leaf as page 0.
    pub fn create<P: AsRef<Path>>(path: P, schema: TableSchema) -> Result<Self> {
        let pager = Pager::create(&path)?;
        let mut engine = Self {
            file_path: path.as_ref().to_path_buf(),
            pager,
            schema,
            root_page: 0,
            fanout: FANOUT_UNSET,
            pages: Vec::new(),
        };
        engine.create_page(PageType::TableLeaf)?;
        Ok(engine)
    }

    /// Open an existing table file, parse every page, and rebuild parent
    /// links from the known root.
    pub fn load<P: AsRef<Path>>(
        path: P,
        schema: TableSchema,
        root_page: i32,
        fanout: i32,
    ) -> Result<Self> {
        let mut pager = Pager::open(&path)?;
        let size = pager.size()?;
        if size % PAGE_SIZE as u64 != 0 {
            return Err(DatabaseError::CorruptedTable {
                reason: format!("file size {} is not a multiple of {}", size, PAGE_SIZE),
            });
        }

        let page_num = (size / PAGE_SIZE as u64) as usize;
        let mut pages = Vec::with_capacity(page_num);
        for index in 0..page_num {
            let mut page = Page::new((index * PAGE_SIZE) as u64, PageType::TableLeaf);
            page.parse_info(&mut pager)?;
            pages.push(page);
        }

        if root_page < 0 || root_page as usize >= page_num {
            return Err(DatabaseError::CorruptedTable {
                reason: format!("root page {} outside of {} pages", root_page, page_num),
            });
        }

        let mut engine = Self {
            file_path: path.as_ref().to_path_buf(),
            pager,
            schema,
            root_page: root_page as PageIndex,
            fanout: if fanout <= 0 { FANOUT_UNSET } else { fanout },
            pages,
        };
        engine.load_parent(engine.root_page)?;
        Ok(engine)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn root_page(&self) -> i32 {
        self.root_page as i32
    }

    pub fn fanout(&self) -> i32 {
        self.fanout
    }

    /// Insert one tuple; the first value is the primary key. Rejects
    /// duplicate keys without mutating anything.
    pub fn insert(&mut self, type_codes: &[TypeCode], values: &[Value]) -> Result<()> {
        if values.len() != self.schema.columns.len() {
            return Err(DatabaseError::ValueCountMismatch {
                table: self.schema.table_name.clone(),
                expected: self.schema.columns.len(),
                actual: values.len(),
            });
        }
        let key = match &values[0] {
            Value::Int(key) => *key,
            other => {
                return Err(DatabaseError::TypeMismatch {
                    column: self.schema.primary_key().name.clone(),
                    expected: "INT".to_string(),
                    actual: other.to_string(),
                })
            }
        };

        let target = self.search_page(self.root_page, key)?;
        if self.pages[target as usize].is_key_duplicate(key) {
            return Err(DatabaseError::DuplicatePrimaryKey { key });
        }

        let cell = build_leaf_cell(key, type_codes, values)?;
        let max_cell_size = PAGE_SIZE - PAGE_HEADER_SIZE - CELL_POINTER_SIZE;
        if cell.len() > max_cell_size {
            return Err(DatabaseError::RowTooLarge {
                size: cell.len(),
                max: max_cell_size,
            });
        }

        // The first leaf that runs out of room fixes the fanout for good;
        // from then on splits trigger on cell count, not free space.
        if self.fanout == FANOUT_UNSET && !self.pages[target as usize].has_space(cell.len()) {
            self.fanout = self.pages[target as usize].cell_num() as i32 + 1;
            debug!(
                table = %self.schema.table_name,
                fanout = self.fanout,
                "learned fanout"
            );
        }

        self.insert_cell(target, key, cell, None)
    }

    /// All rows passing the filter, in key order. An `=`-style condition on
    /// the primary key narrows the scan to a leaf-chain range; everything
    /// else walks the whole chain. The condition is re-applied to each
    /// decoded row either way.
    pub fn select(&mut self, filter: Option<&Filter>) -> Result<Vec<Row>> {
        let cells = match filter {
            Some(f) if f.column_index == 0 && matches!(f.value, Value::Int(_)) => {
                self.pull_tuples_with_primary(f)?
            }
            _ => self.pull_tuples()?,
        };

        let mut rows = Vec::with_capacity(cells.len());
        for cell_bytes in cells {
            let row = Row::from_leaf_cell(&cell_bytes)?;
            if let Some(f) = filter {
                let lhs_code = row.type_codes[f.column_index];
                if !compare(&row.values[f.column_index], &f.value, lhs_code, f.type_code, f.op) {
                    continue;
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Rewrite columns of the row with the given key in place. Same-width
    /// values overwrite, narrower values shrink the cell, wider values are
    /// rejected per column. Returns how many columns were actually updated.
    pub fn update(&mut self, key: CellKey, sets: &[(usize, TypeCode, Value)]) -> Result<usize> {
        let target = self.search_page(self.root_page, key)?;
        let t = target as usize;
        let index = match self.pages[t].key_index(key) {
            Some(index) => index,
            None => return Ok(0),
        };

        let mut cell_bytes = self.pages[t].get_cell(&mut self.pager, index)?;
        let mut updated = 0;
        for (column_index, type_code, value) in sets {
            if update_value(&mut cell_bytes, *column_index, *type_code, value)? {
                updated += 1;
            }
        }
        self.pages[t].write_cell_at(&mut self.pager, index, &cell_bytes)?;
        Ok(updated)
    }

    /// Remove the row with the given key. The page heap is compacted by the
    /// reorder pass; underfull pages are not merged.
    pub fn delete(&mut self, key: CellKey) -> Result<bool> {
        let target = self.search_page(self.root_page, key)?;
        let t = target as usize;
        let index = match self.pages[t].key_index(key) {
            Some(index) => index,
            None => return Ok(false),
        };
        self.pages[t].delete_cell(index);
        self.pages[t].update_info(&mut self.pager)?;
        self.pages[t].reorder(&mut self.pager)?;
        Ok(true)
    }

    /// Descend from `current` to the leaf that owns `key`.
    fn search_page(&mut self, current: PageIndex, key: CellKey) -> Result<PageIndex> {
        let c = current as usize;
        if self.pages[c].is_leaf() {
            return Ok(current);
        }

        let (min_key, max_key) = self.pages[c].get_cell_key_range(&mut self.pager)?;
        let next = if key < min_key {
            self.pages[c].get_left_most_page_pointer(&mut self.pager)?
        } else if key >= max_key {
            self.pages[c].right_most_pointer()
        } else {
            let bound = self.pages[c].get_lower_bound(key);
            self.pages[c].get_cell_left_pointer(&mut self.pager, bound)?
        };
        self.search_page(next, key)
    }

    fn is_root(&self, page: PageIndex) -> bool {
        page == self.root_page
    }

    fn will_overflow(&self, page: PageIndex) -> bool {
        self.pages[page as usize].cell_num() as i32 + 1 > self.fanout - 1
    }

    /// Append a fresh zeroed page to the file.
    fn create_page(&mut self, page_type: PageType) -> Result<PageIndex> {
        let index = self.pages.len() as PageIndex;
        let page = Page::new(index as u64 * PAGE_SIZE as u64, page_type);
        // zero-fill first so the file length stays a multiple of the page size
        page.clear(&mut self.pager)?;
        page.update_info(&mut self.pager)?;
        self.pages.push(page);
        Ok(index)
    }

    /// Recursive insertion. `right_child` is the page that a lower split
    /// produced; on interior pages it replaces the pointer that used to cover
    /// the split child's key range.
    fn insert_cell(
        &mut self,
        target: PageIndex,
        key: CellKey,
        cell: Vec<u8>,
        right_child: Option<PageIndex>,
    ) -> Result<()> {
        let t = target as usize;

        if !self.will_overflow(target) && self.pages[t].has_space(cell.len()) {
            if !self.pages[t].is_leaf() {
                let right_child = right_child.ok_or_else(|| DatabaseError::CorruptedPage {
                    page: target,
                    reason: "interior insertion without a right child".to_string(),
                })?;
                let bound = self.pages[t].get_lower_bound(key);
                if bound == self.pages[t].cell_num() as usize {
                    self.pages[t].set_right_most_pointer(right_child);
                } else {
                    self.pages[t].set_cell_left_pointer(&mut self.pager, bound, right_child)?;
                }
            } else if let Some(right_child) = right_child {
                // split propagation from below re-threads the leaf chain
                self.pages[t].set_right_most_pointer(right_child);
            }
            self.pages[t].insert_cell(&mut self.pager, key, &cell)?;
            if !self.pages[t].is_leaf() {
                self.update_parent(target)?;
            }
            return Ok(());
        }

        // Overflow: split, then promote the pivot into the parent.
        let pivot = self.cell_pivot(target, key);
        debug!(
            table = %self.schema.table_name,
            page = target,
            pivot_key = pivot.key,
            "splitting page"
        );
        let new_page = if self.pages[t].is_leaf() {
            self.split_leaf_page(target, &pivot, key, &cell)?
        } else {
            self.split_interior_page(target, &pivot, key, &cell, right_child)?
        };

        let parent = if self.is_root(target) {
            let parent = self.create_page(PageType::TableInterior)?;
            self.root_page = parent;
            debug!(table = %self.schema.table_name, root = parent, "new root page");
            parent
        } else {
            self.pages[t].parent()
        };
        self.pages[t].set_parent(parent);
        self.pages[new_page as usize].set_parent(parent);

        let promoted = build_interior_cell(target, pivot.key);
        self.insert_cell(parent, pivot.key, promoted, Some(new_page))
    }

    /// Median of the page's keys joined with the incoming key, ranked against
    /// the existing keys only.
    fn cell_pivot(&self, page: PageIndex, key: CellKey) -> CellPivot {
        let p = &self.pages[page as usize];
        let mut keys: Vec<CellKey> = p.keys().copied().collect();
        // a duplicate incoming key is tolerated here; it is rejected upstream
        if let Err(position) = keys.binary_search(&key) {
            keys.insert(position, key);
        }
        let pivot_key = keys[keys.len() / 2];
        CellPivot {
            index: p.get_lower_bound(pivot_key),
            key: pivot_key,
        }
    }

    /// Split a full leaf. Cells at and above the pivot move to a fresh leaf,
    /// which also takes over the target's position in the leaf chain.
    fn split_leaf_page(
        &mut self,
        target: PageIndex,
        pivot: &CellPivot,
        key: CellKey,
        cell: &[u8],
    ) -> Result<PageIndex> {
        let new_page = self.create_page(PageType::TableLeaf)?;
        let t = target as usize;
        let n = new_page as usize;

        // slots compact after each delete, so the pivot rank is reused until
        // only the lower half remains
        while (self.pages[t].cell_num() as usize) > pivot.index {
            let moved_key = self.pages[t].get_cell_key(&mut self.pager, pivot.index)?;
            let moved_cell = self.pages[t].get_cell(&mut self.pager, pivot.index)?;
            self.pages[n].insert_cell(&mut self.pager, moved_key, &moved_cell)?;
            self.pages[t].delete_cell(pivot.index);
        }

        // leaf chain: target -> new -> target's old successor
        let old_next = self.pages[t].right_most_pointer();
        self.pages[n].set_right_most_pointer(old_next);
        self.pages[t].set_right_most_pointer(new_page);

        self.pages[t].update_info(&mut self.pager)?;
        self.pages[n].update_info(&mut self.pager)?;
        self.pages[t].reorder(&mut self.pager)?;

        if key < pivot.key {
            self.pages[t].insert_cell(&mut self.pager, key, cell)?;
        } else {
            self.pages[n].insert_cell(&mut self.pager, key, cell)?;
        }
        Ok(new_page)
    }

    /// Split a full interior page. The pivot cell is promoted by the caller;
    /// this rewires the children of both halves around the incoming cell and
    /// its right child.
    fn split_interior_page(
        &mut self,
        target: PageIndex,
        pivot: &CellPivot,
        key: CellKey,
        cell: &[u8],
        right_child: Option<PageIndex>,
    ) -> Result<PageIndex> {
        let right_child = right_child.ok_or_else(|| DatabaseError::CorruptedPage {
            page: target,
            reason: "interior split without a right child".to_string(),
        })?;

        let new_page = self.create_page(PageType::TableInterior)?;
        let t = target as usize;
        let n = new_page as usize;

        let (min_key, max_key) = self.pages[t].get_cell_key_range(&mut self.pager)?;
        let cell_num = self.pages[t].cell_num() as usize;
        let old_right_most = self.pages[t].right_most_pointer();

        let side;
        let new_right_most;
        let target_right_most;

        if pivot.index == cell_num {
            // the pivot is the incoming key itself, sorting above every
            // existing cell: nothing moves, the incoming cell is promoted
            new_right_most = right_child;
            target_right_most = old_right_most;
            side = InsertSide::Promoted;
        } else {
            let pivot_left = self.pages[t].get_cell_left_pointer(&mut self.pager, pivot.index)?;

            if key > max_key {
                new_right_most = right_child;
                target_right_most = pivot_left;
                side = InsertSide::New;
            } else if key < min_key {
                new_right_most = old_right_most;
                target_right_most = pivot_left;
                self.pages[t].set_cell_left_pointer(&mut self.pager, 0, right_child)?;
                side = InsertSide::Target;
            } else if key == pivot.key {
                new_right_most = old_right_most;
                target_right_most = pivot_left;
                self.pages[t].set_cell_left_pointer(&mut self.pager, pivot.index, right_child)?;
                side = InsertSide::Promoted;
            } else if key < pivot.key {
                new_right_most = old_right_most;
                if pivot.index >= 1
                    && key > self.pages[t].get_cell_key(&mut self.pager, pivot.index - 1)?
                {
                    // key slots in right below the pivot; its upper half
                    // becomes the target's right-most subtree
                    target_right_most = right_child;
                } else {
                    target_right_most = pivot_left;
                    let bound = self.pages[t].get_lower_bound(key);
                    self.pages[t].set_cell_left_pointer(&mut self.pager, bound, right_child)?;
                }
                side = InsertSide::Target;
            } else {
                new_right_most = old_right_most;
                target_right_most = pivot_left;
                let bound = self.pages[t].get_lower_bound(key);
                self.pages[t].set_cell_left_pointer(&mut self.pager, bound, right_child)?;
                side = InsertSide::New;
            }
        }

        // copy the upper cells into the new page, preserving key order; when
        // the incoming key is the pivot, the cell at the pivot rank moves too
        let copy_index = if key == pivot.key {
            pivot.index
        } else {
            pivot.index + 1
        };
        for index in copy_index..cell_num {
            let copied_key = self.pages[t].get_cell_key(&mut self.pager, index)?;
            let copied_cell = self.pages[t].get_cell(&mut self.pager, index)?;
            self.pages[n].insert_cell(&mut self.pager, copied_key, &copied_cell)?;
        }
        // the promoted pivot cell and everything above it leave the target
        while (self.pages[t].cell_num() as usize) > pivot.index {
            self.pages[t].delete_cell(pivot.index);
        }

        self.pages[n].set_right_most_pointer(new_right_most);
        self.pages[t].set_right_most_pointer(target_right_most);
        self.pages[t].update_info(&mut self.pager)?;
        self.pages[n].update_info(&mut self.pager)?;
        self.pages[t].reorder(&mut self.pager)?;

        match side {
            InsertSide::Target => self.pages[t].insert_cell(&mut self.pager, key, cell)?,
            InsertSide::New => self.pages[n].insert_cell(&mut self.pager, key, cell)?,
            InsertSide::Promoted => {}
        }

        self.update_parent(target)?;
        self.update_parent(new_page)?;
        Ok(new_page)
    }

    /// Point every child referenced from an interior page back at it.
    fn update_parent(&mut self, page: PageIndex) -> Result<()> {
        if self.pages[page as usize].is_leaf() {
            return Ok(());
        }
        let cell_num = self.pages[page as usize].cell_num() as usize;
        for index in 0..cell_num {
            let child = self.pages[page as usize].get_cell_left_pointer(&mut self.pager, index)?;
            self.pages[child as usize].set_parent(page);
        }
        let right = self.pages[page as usize].right_most_pointer();
        self.pages[right as usize].set_parent(page);
        Ok(())
    }

    /// Pre-order walk from the root, recording each child's parent.
    fn load_parent(&mut self, page: PageIndex) -> Result<()> {
        if self.pages[page as usize].is_leaf() {
            return Ok(());
        }
        let cell_num = self.pages[page as usize].cell_num() as usize;
        let mut children = Vec::with_capacity(cell_num + 1);
        for index in 0..cell_num {
            children.push(self.pages[page as usize].get_cell_left_pointer(&mut self.pager, index)?);
        }
        children.push(self.pages[page as usize].right_most_pointer());
        for child in children {
            self.pages[child as usize].set_parent(page);
            self.load_parent(child)?;
        }
        Ok(())
    }

    fn append_all_cells(&mut self, page: PageIndex, out: &mut Vec<Vec<u8>>) -> Result<()> {
        let cell_num = self.pages[page as usize].cell_num() as usize;
        for index in 0..cell_num {
            out.push(self.pages[page as usize].get_cell(&mut self.pager, index)?);
        }
        Ok(())
    }

    /// Every cell in key order, walking the leaf chain to the 0 sentinel.
    fn pull_tuples(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        let mut page = self.search_page(self.root_page, CellKey::MIN)?;
        loop {
            self.append_all_cells(page, &mut out)?;
            let next = self.pages[page as usize].right_most_pointer();
            if next == 0 {
                break;
            }
            page = next;
        }
        Ok(out)
    }

    /// Leaf-chain range scan for a primary-key condition: the operator maps
    /// to a start and end leaf, and the walk stops at the end leaf's
    /// chain-next.
    fn pull_tuples_with_primary(&mut self, filter: &Filter) -> Result<Vec<Vec<u8>>> {
        let key = match &filter.value {
            Value::Int(key) => *key,
            _ => return self.pull_tuples(),
        };

        let target = self.search_page(self.root_page, key)?;
        let min_leaf = self.search_page(self.root_page, CellKey::MIN)?;
        let max_leaf = self.search_page(self.root_page, CellKey::MAX)?;

        let (start, end) = match filter.op {
            OperatorType::Equal => (target, target),
            OperatorType::Unequal => (min_leaf, max_leaf),
            OperatorType::Larger | OperatorType::NotSmaller => (target, max_leaf),
            OperatorType::Smaller | OperatorType::NotLarger => (min_leaf, target),
        };

        let stop = self.pages[end as usize].right_most_pointer();
        let mut out = Vec::new();
        let mut page = start;
        loop {
            self.append_all_cells(page, &mut out)?;
            let next = self.pages[page as usize].right_most_pointer();
            if next == stop || next == 0 {
                break;
            }
            page = next;
        }
        Ok(out)
    }
}
