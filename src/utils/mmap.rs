//! Read-only memory mapping of files.

use crate::error::IndexError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A file's contents mapped read-only into memory.
///
/// The file handle is closed as soon as the mapping exists; the mapping
/// itself lives until the `FileMap` is dropped. Both the indexer and the
/// searcher touch every byte of a file exactly once, so zero-copy access
/// matters more than anything else here.
#[derive(Debug)]
pub struct FileMap {
    map: Option<Mmap>,
}

impl FileMap {
    /// Open `path` and map it shared-read.
    ///
    /// Zero-length files cannot be mapped, so they yield an empty buffer
    /// instead; `bytes()` still honors its contract.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let io = |source| IndexError::io(path, source);
        let file = File::open(path).map_err(io)?;
        let len = file.metadata().map_err(io)?.len();
        if len == 0 {
            return Ok(Self { map: None });
        }
        let map = unsafe { Mmap::map(&file) }.map_err(io)?;
        Ok(Self { map: Some(map) })
    }

    /// The mapped contents, valid for the lifetime of this buffer.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
