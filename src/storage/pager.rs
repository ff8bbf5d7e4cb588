//! Owns the table's file handle and its in-memory page cache.
//!
//! The pager is the only thing that ever reads or writes the file: the
//! B-tree works purely in terms of page numbers and never touches `File`
//! directly. The cache is capped at [`TABLE_MAX_PAGES`] resident pages using
//! a fixed-capacity `heapless::Vec`, so exceeding it is a hard error rather
//! than the cache silently growing.
//!
//! Durability is flush-on-close only: there is no write-ahead log, so a
//! crash between writes can lose or corrupt pages already believed to be on
//! disk. That matches the REPL's single-process, single-session usage.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::node::{Node, PAGE_SIZE};
use crate::err;
use crate::errors::Error;

pub const TABLE_MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: usize,
    pages: heapless::Vec<Option<Node>, TABLE_MAX_PAGES>,
}

impl Pager {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_length = file.metadata()?.len();

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                "db file is {} bytes, not a whole number of {}-byte pages",
                file_length,
                PAGE_SIZE
            ));
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as usize;
        if num_pages > TABLE_MAX_PAGES {
            return Err(err!(
                "db file has {} pages, exceeding the {}-page cache bound",
                num_pages,
                TABLE_MAX_PAGES
            ));
        }

        let mut pages = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            let _ = pages.push(None);
        }

        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages,
        })
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Returns a new, unused page number, growing the table by one page.
    /// Callers are expected to immediately initialize and write to it.
    pub fn get_unused_page_num(&mut self) -> Result<u32, Error> {
        let page_num = self.num_pages;
        if page_num >= TABLE_MAX_PAGES {
            return Err(err!(
                "cannot grow table past the {}-page cache bound",
                TABLE_MAX_PAGES
            ));
        }
        self.num_pages += 1;
        Ok(page_num as u32)
    }

    /// Returns a reference to `page_num`, loading it from disk (or
    /// allocating a fresh zeroed page, if it's past the current end of
    /// file) the first time it's requested.
    pub fn get(&mut self, page_num: u32) -> Result<&Node, Error> {
        self.load_if_absent(page_num)?;
        Ok(self.pages[page_num as usize].as_ref().unwrap())
    }

    pub fn get_mut(&mut self, page_num: u32) -> Result<&mut Node, Error> {
        self.load_if_absent(page_num)?;
        Ok(self.pages[page_num as usize].as_mut().unwrap())
    }

    fn load_if_absent(&mut self, page_num: u32) -> Result<(), Error> {
        let idx = page_num as usize;
        if idx >= TABLE_MAX_PAGES {
            return Err(err!(
                "page {} is out of bounds for the {}-page cache",
                page_num,
                TABLE_MAX_PAGES
            ));
        }
        if self.pages[idx].is_some() {
            return Ok(());
        }

        let mut data = [0u8; PAGE_SIZE];
        let num_pages_on_disk = (self.file_length / PAGE_SIZE as u64) as usize;
        if idx < num_pages_on_disk {
            debug!(page_num, "loading page from disk");
            self.file.seek(SeekFrom::Start(idx as u64 * PAGE_SIZE as u64))?;
            self.file.read_exact(&mut data)?;
        } else {
            debug!(page_num, "allocating fresh page");
        }

        self.pages[idx] = Some(Node::new(data));
        if idx >= self.num_pages {
            self.num_pages = idx + 1;
        }
        Ok(())
    }

    /// Writes every resident page back to disk. Called once, on REPL exit.
    pub fn flush(&mut self) -> Result<(), Error> {
        for page_num in 0..self.num_pages {
            let Some(node) = self.pages[page_num].as_ref() else {
                continue;
            };
            self.file
                .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
            self.file.write_all(node.as_bytes())?;
        }
        self.file.flush()?;
        self.file_length = self.num_pages as u64 * PAGE_SIZE as u64;
        Ok(())
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush pager on drop");
        }
    }
}
