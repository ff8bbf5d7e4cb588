//! The table itself: a B-tree of fixed-width rows keyed by `id`, backed by a
//! [`Pager`]. Page 0 is always the root, so the table never needs a
//! separate "where's the root" pointer on disk.
//!
//! Insertion keeps every leaf at or under [`LEAF_NODE_MAX_CELLS`] and every
//! internal node at or under [`INTERNAL_NODE_MAX_CELLS`] keys by splitting
//! and, when a split's parent is itself full, recursing one level up. A
//! split at the root allocates a fresh page for the old root's contents and
//! turns page 0 into a new two-child internal node, so page 0 stays root.

use std::path::Path;

use super::cursor::Cursor;
use super::node::{
    NodeType, COMMON_NODE_HEADER_SIZE, INTERNAL_NODE_MAX_CELLS, INVALID_PAGE_NUM,
    LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_RIGHT_SPLIT_COUNT, LEAF_NODE_SPACE_FOR_CELLS, Node,
};
use super::pager::Pager;
use super::row::{encode_row, Row, ROW_SIZE};
use crate::err;
use crate::errors::Error;

pub struct Table {
    pub(crate) root_page_num: u32,
    pub(crate) pager: Pager,
}

impl Table {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;
        let root_page_num = 0;

        if pager.num_pages() == 0 {
            let mut root = Node::zeroed();
            root.initialize_leaf();
            root.set_is_root(true);
            *pager.get_mut(root_page_num)? = root;
        }

        Ok(Table { root_page_num, pager })
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.pager.flush()
    }

    /// Inserts `row`, rejecting it if `row.id` is already present.
    pub fn insert(&mut self, row: &Row) -> Result<(), Error> {
        let cursor = Cursor::find(self, row.id)?;
        let num_cells = self.pager.get(cursor.page_num)?.leaf_num_cells() as usize;

        if cursor.cell_num < num_cells
            && self.pager.get(cursor.page_num)?.leaf_key(cursor.cell_num) == row.id
        {
            return Err(Error::DuplicateKey);
        }

        let encoded = encode_row(row);

        if num_cells >= LEAF_NODE_MAX_CELLS {
            self.leaf_split_and_insert(cursor.page_num, cursor.cell_num, row.id, &encoded)?;
        } else {
            let node = self.pager.get_mut(cursor.page_num)?;
            node.shift_leaf_cells_right(cursor.cell_num, num_cells);
            node.set_leaf_key(cursor.cell_num, row.id);
            node.set_leaf_value(cursor.cell_num, &encoded);
            node.set_leaf_num_cells(num_cells as u32 + 1);
        }

        Ok(())
    }

    pub fn select_all(&mut self) -> Result<Vec<Row>, Error> {
        let mut cursor = Cursor::table_start(self)?;
        let mut rows = Vec::new();
        while !cursor.end_of_table {
            rows.push(cursor.read_row(self)?);
            cursor.advance(self)?;
        }
        Ok(rows)
    }

    pub fn leftmost_leaf(&mut self, mut page_num: u32) -> Result<u32, Error> {
        loop {
            let node = self.pager.get(page_num)?;
            match node.node_type()? {
                NodeType::Leaf => return Ok(page_num),
                NodeType::Internal => page_num = node.internal_child(0),
            }
        }
    }

    /// Finds the leaf that logically follows `leaf_page_num`, by climbing to
    /// the nearest ancestor the leaf isn't the rightmost descendant of, then
    /// redescending that ancestor's next child. Returns `None` once
    /// `leaf_page_num` is the last leaf in the table.
    pub fn next_leaf_after(&mut self, leaf_page_num: u32) -> Result<Option<u32>, Error> {
        let mut current = leaf_page_num;
        loop {
            if current == self.root_page_num {
                return Ok(None);
            }

            let parent_page_num = self.pager.get(current)?.parent();
            let parent = self.pager.get(parent_page_num)?;
            let num_keys = parent.internal_num_keys() as usize;

            let mut index = None;
            for i in 0..=num_keys {
                if parent.internal_child(i) == current {
                    index = Some(i);
                    break;
                }
            }
            let index = index.ok_or_else(|| {
                err!(
                    "page {} not found among children of its recorded parent {}",
                    current,
                    parent_page_num
                )
            })?;

            if index == num_keys {
                current = parent_page_num;
                continue;
            }

            let sibling_page_num = parent.internal_child(index + 1);
            return Ok(Some(self.leftmost_leaf(sibling_page_num)?));
        }
    }

    /// Splits a full leaf in two and inserts `(key, value)` into whichever
    /// half it belongs in, redistributing cells by iterating the combined
    /// `LEAF_NODE_MAX_CELLS + 1` logical slots from high to low so nothing
    /// is overwritten before it's copied out.
    fn leaf_split_and_insert(
        &mut self,
        old_page_num: u32,
        insert_cell: usize,
        key: u32,
        value: &[u8; ROW_SIZE],
    ) -> Result<(), Error> {
        let new_page_num = self.pager.get_unused_page_num()?;
        let old_snapshot = self.pager.get(old_page_num)?.clone();
        let old_is_root = old_snapshot.is_root();
        let old_parent = old_snapshot.parent();
        let old_max = old_snapshot.max_key()?;

        let mut new_node = Node::zeroed();
        new_node.initialize_leaf();
        new_node.set_parent(old_parent);

        let mut old_node = Node::zeroed();
        old_node.initialize_leaf();
        old_node.set_parent(old_parent);

        for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
            let goes_to_new = i >= LEAF_NODE_LEFT_SPLIT_COUNT;
            let index_within = i % LEAF_NODE_LEFT_SPLIT_COUNT;
            let dest: &mut Node = if goes_to_new { &mut new_node } else { &mut old_node };

            if i == insert_cell {
                dest.set_leaf_key(index_within, key);
                dest.set_leaf_value(index_within, value);
            } else if i > insert_cell {
                dest.copy_leaf_cell_from(index_within, &old_snapshot, i - 1);
            } else {
                dest.copy_leaf_cell_from(index_within, &old_snapshot, i);
            }
        }
        old_node.set_leaf_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
        new_node.set_leaf_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

        *self.pager.get_mut(old_page_num)? = old_node;
        *self.pager.get_mut(new_page_num)? = new_node;

        if old_is_root {
            self.create_new_root(new_page_num)?;
        } else {
            let new_max = self.pager.get(old_page_num)?.max_key()?;
            self.update_internal_key(old_parent, old_max, new_max)?;
            self.internal_insert(old_parent, new_page_num)?;
        }

        Ok(())
    }

    /// Allocates a fresh page to hold the current root's contents, then
    /// reinitializes page 0 as a new internal node with that page as its
    /// left child and `right_child_page_num` as its right child. Page 0
    /// stays the root throughout.
    fn create_new_root(&mut self, right_child_page_num: u32) -> Result<(), Error> {
        let root_page_num = self.root_page_num;
        let left_child_page_num = self.pager.get_unused_page_num()?;

        let root_was_internal = self.pager.get(root_page_num)?.node_type()? == NodeType::Internal;
        if root_was_internal {
            self.pager.get_mut(right_child_page_num)?.initialize_internal();
        }

        let root_snapshot = self.pager.get(root_page_num)?.clone();
        {
            let left_child = self.pager.get_mut(left_child_page_num)?;
            *left_child = root_snapshot;
            left_child.set_is_root(false);
        }

        if root_was_internal {
            let num_keys = self.pager.get(left_child_page_num)?.internal_num_keys() as usize;
            for i in 0..num_keys {
                let child_page_num = self.pager.get(left_child_page_num)?.internal_child(i);
                self.pager.get_mut(child_page_num)?.set_parent(left_child_page_num);
            }
            let right_child_of_left = self.pager.get(left_child_page_num)?.internal_right_child();
            self.pager
                .get_mut(right_child_of_left)?
                .set_parent(left_child_page_num);
        }

        let left_child_max_key = self.pager.get(left_child_page_num)?.max_key()?;

        {
            let root = self.pager.get_mut(root_page_num)?;
            root.initialize_internal();
            root.set_is_root(true);
            root.set_internal_num_keys(1);
            root.set_internal_child(0, left_child_page_num);
            root.set_internal_key(0, left_child_max_key);
            root.set_internal_right_child(right_child_page_num);
        }

        self.pager.get_mut(left_child_page_num)?.set_parent(root_page_num);
        self.pager.get_mut(right_child_page_num)?.set_parent(root_page_num);

        Ok(())
    }

    /// Inserts `child_page_num` as a child of `parent_page_num`, splitting
    /// the parent first if it's already at [`INTERNAL_NODE_MAX_CELLS`].
    fn internal_insert(&mut self, parent_page_num: u32, child_page_num: u32) -> Result<(), Error> {
        let child_max_key = self.pager.get(child_page_num)?.max_key()?;
        let parent = self.pager.get(parent_page_num)?;
        let index = parent.internal_find_child(child_max_key);
        let original_num_keys = parent.internal_num_keys() as usize;

        if original_num_keys >= INTERNAL_NODE_MAX_CELLS {
            return self.internal_split_and_insert(parent_page_num, child_page_num);
        }

        let right_child_page_num = parent.internal_right_child();

        if right_child_page_num == INVALID_PAGE_NUM {
            self.pager
                .get_mut(parent_page_num)?
                .set_internal_right_child(child_page_num);
            return Ok(());
        }

        let right_child_max = self.pager.get(right_child_page_num)?.max_key()?;

        let parent = self.pager.get_mut(parent_page_num)?;
        parent.set_internal_num_keys(original_num_keys as u32 + 1);

        if child_max_key > right_child_max {
            parent.set_internal_child(original_num_keys, right_child_page_num);
            parent.set_internal_key(original_num_keys, right_child_max);
            parent.set_internal_right_child(child_page_num);
        } else {
            parent.shift_internal_cells_right(index, original_num_keys);
            parent.set_internal_child(index, child_page_num);
            parent.set_internal_key(index, child_max_key);
        }

        Ok(())
    }

    /// Splits a full internal node, moving its upper half (plus its former
    /// right child) into a new sibling, then inserts `child_page_num` into
    /// whichever half now fits it. If the node being split is the root, the
    /// split goes through [`Table::create_new_root`] instead of inserting
    /// into a parent that doesn't exist yet.
    fn internal_split_and_insert(
        &mut self,
        parent_page_num: u32,
        child_page_num: u32,
    ) -> Result<(), Error> {
        let old_max = self.pager.get(parent_page_num)?.max_key()?;
        let child_max = self.pager.get(child_page_num)?.max_key()?;

        let new_page_num = self.pager.get_unused_page_num()?;
        let splitting_root = self.pager.get(parent_page_num)?.is_root();

        let old_page_num;
        let parent_of_old;
        if splitting_root {
            self.create_new_root(new_page_num)?;
            let root = self.pager.get(self.root_page_num)?;
            old_page_num = root.internal_child(0);
            parent_of_old = self.root_page_num;
        } else {
            old_page_num = parent_page_num;
            parent_of_old = self.pager.get(old_page_num)?.parent();
            let mut fresh = Node::zeroed();
            fresh.initialize_internal();
            *self.pager.get_mut(new_page_num)? = fresh;
        }

        let right_child_page_num = self.pager.get(old_page_num)?.internal_right_child();
        self.internal_insert(new_page_num, right_child_page_num)?;
        self.pager.get_mut(right_child_page_num)?.set_parent(new_page_num);
        self.pager
            .get_mut(old_page_num)?
            .set_internal_right_child(INVALID_PAGE_NUM);

        let mut i = INTERNAL_NODE_MAX_CELLS as i64 - 1;
        while i > INTERNAL_NODE_MAX_CELLS as i64 / 2 {
            let cur_page_num = self.pager.get(old_page_num)?.internal_child(i as usize);
            self.internal_insert(new_page_num, cur_page_num)?;
            self.pager.get_mut(cur_page_num)?.set_parent(new_page_num);

            let old_node = self.pager.get_mut(old_page_num)?;
            let n = old_node.internal_num_keys();
            old_node.set_internal_num_keys(n - 1);
            i -= 1;
        }

        {
            let old_node = self.pager.get_mut(old_page_num)?;
            let n = old_node.internal_num_keys();
            let last_child = old_node.internal_child(n as usize - 1);
            old_node.set_internal_right_child(last_child);
            old_node.set_internal_num_keys(n - 1);
        }

        let max_after_split = self.pager.get(old_page_num)?.max_key()?;
        let destination_page_num = if child_max < max_after_split {
            old_page_num
        } else {
            new_page_num
        };
        self.internal_insert(destination_page_num, child_page_num)?;
        self.pager
            .get_mut(child_page_num)?
            .set_parent(destination_page_num);

        let old_page_max_now = self.pager.get(old_page_num)?.max_key()?;
        self.update_internal_key(parent_of_old, old_max, old_page_max_now)?;

        if !splitting_root {
            self.internal_insert(parent_of_old, new_page_num)?;
            self.pager.get_mut(new_page_num)?.set_parent(parent_of_old);
        }

        Ok(())
    }

    /// Replaces the key cell equal to `old_key` with `new_key`. A no-op if
    /// `old_key` belonged to the node's right-child slot, which has no key
    /// cell of its own to update.
    fn update_internal_key(&mut self, node_page_num: u32, old_key: u32, new_key: u32) -> Result<(), Error> {
        let node = self.pager.get_mut(node_page_num)?;
        let index = node.internal_find_child(old_key);
        if index < node.internal_num_keys() as usize {
            node.set_internal_key(index, new_key);
        }
        Ok(())
    }

    /// Renders the tree structure depth-first, leaf sizes and keys only,
    /// for the `.btree` meta-command.
    pub fn tree_dump(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        self.dump_node(self.root_page_num, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&mut self, page_num: u32, level: usize, out: &mut String) -> Result<(), Error> {
        let node = self.pager.get(page_num)?.clone();
        let indent = "  ".repeat(level);
        let cell_indent = "  ".repeat(level + 1);
        match node.node_type()? {
            NodeType::Leaf => {
                let num_cells = node.leaf_num_cells();
                out.push_str(&format!("{}leaf (size {})\n", indent, num_cells));
                for i in 0..num_cells as usize {
                    out.push_str(&format!("{}- {} : {}\n", cell_indent, i, node.leaf_key(i)));
                }
            }
            NodeType::Internal => {
                let num_keys = node.internal_num_keys();
                out.push_str(&format!("{}internal (size {})\n", indent, num_keys));
                for i in 0..num_keys as usize {
                    let child = node.internal_child(i);
                    self.dump_node(child, level + 1, out)?;
                    out.push_str(&format!("{}- key {}\n", cell_indent, node.internal_key(i)));
                }
                let right_child = node.internal_right_child();
                self.dump_node(right_child, level + 1, out)?;
            }
        }
        Ok(())
    }
}

/// Text report for the `.constants` meta-command: the byte-layout constants
/// that make up the on-disk contract.
pub fn constants_dump() -> String {
    format!(
        "ROW_SIZE: {}\nCOMMON_NODE_HEADER_SIZE: {}\nLEAF_NODE_HEADER_SIZE: {}\nLEAF_NODE_CELL_SIZE: {}\nLEAF_NODE_SPACE_FOR_CELLS: {}\nLEAF_NODE_MAX_CELLS: {}\n",
        ROW_SIZE,
        COMMON_NODE_HEADER_SIZE,
        LEAF_NODE_HEADER_SIZE,
        LEAF_NODE_CELL_SIZE,
        LEAF_NODE_SPACE_FOR_CELLS,
        LEAF_NODE_MAX_CELLS,
    )
}
