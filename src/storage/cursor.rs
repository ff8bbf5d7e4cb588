//! A cursor locates a logical position in the table: `(page_num, cell_num)`
//! of a leaf cell. Cursors are re-derived from the root on each `find`, and
//! `advance` walks forward from there, never a raw pointer into a page,
//! since splits and cache evictions can move or rewrite the page a cursor
//! was sitting on.

use super::btree::Table;
use super::node::NodeType;
use super::row::{decode_row, Row, ROW_SIZE};
use crate::errors::Error;

pub struct Cursor {
    pub page_num: u32,
    pub cell_num: usize,
    pub end_of_table: bool,
}

impl Cursor {
    /// A cursor at the first row of the table, in key order.
    pub fn table_start(table: &mut Table) -> Result<Self, Error> {
        let page_num = table.leftmost_leaf(table.root_page_num)?;
        let node = table.pager.get(page_num)?;
        let end_of_table = node.leaf_num_cells() == 0;
        Ok(Cursor {
            page_num,
            cell_num: 0,
            end_of_table,
        })
    }

    /// A cursor at the position `key` occupies, or where it would be
    /// inserted if absent.
    pub fn find(table: &mut Table, key: u32) -> Result<Self, Error> {
        let mut page_num = table.root_page_num;
        loop {
            let node = table.pager.get(page_num)?;
            match node.node_type()? {
                NodeType::Leaf => return Self::leaf_find(table, page_num, key),
                NodeType::Internal => {
                    let child_index = node.internal_find_child(key);
                    page_num = node.internal_child(child_index);
                }
            }
        }
    }

    fn leaf_find(table: &mut Table, page_num: u32, key: u32) -> Result<Self, Error> {
        let node = table.pager.get(page_num)?;
        let num_cells = node.leaf_num_cells() as usize;

        let mut min_index = 0usize;
        let mut one_past_max = num_cells;
        while min_index != one_past_max {
            let mid = min_index + (one_past_max - min_index) / 2;
            let key_at_mid = node.leaf_key(mid);
            if key == key_at_mid {
                return Ok(Cursor {
                    page_num,
                    cell_num: mid,
                    end_of_table: false,
                });
            }
            if key < key_at_mid {
                one_past_max = mid;
            } else {
                min_index = mid + 1;
            }
        }

        Ok(Cursor {
            page_num,
            cell_num: min_index,
            end_of_table: min_index >= num_cells,
        })
    }

    pub fn value<'a>(&self, table: &'a mut Table) -> Result<&'a [u8], Error> {
        let node = table.pager.get(self.page_num)?;
        Ok(node.leaf_value(self.cell_num))
    }

    pub fn read_row(&self, table: &mut Table) -> Result<Row, Error> {
        let bytes: [u8; ROW_SIZE] = self.value(table)?.try_into().expect("leaf value is ROW_SIZE");
        Ok(decode_row(&bytes))
    }

    /// Moves forward one row, crossing into the next leaf by climbing to the
    /// nearest ancestor the current leaf isn't the rightmost descendant of,
    /// then redescending that ancestor's next child's leftmost spine. There
    /// is no sibling pointer in the leaf header; this re-descent is how
    /// cross-leaf scans work instead.
    pub fn advance(&mut self, table: &mut Table) -> Result<(), Error> {
        let node = table.pager.get(self.page_num)?;
        let num_cells = node.leaf_num_cells() as usize;

        if self.cell_num + 1 < num_cells {
            self.cell_num += 1;
            return Ok(());
        }

        match table.next_leaf_after(self.page_num)? {
            Some(next_page) => {
                self.page_num = next_page;
                self.cell_num = 0;
            }
            None => {
                self.cell_num = num_cells;
                self.end_of_table = true;
            }
        }
        Ok(())
    }
}
