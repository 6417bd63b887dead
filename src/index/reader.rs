//! Memory-mapped index reading and searching.
//!
//! Loading binds the fixed tables by offset arithmetic only; nothing in the
//! payload is parsed until a lookup needs it. Posting lists stream straight
//! out of the mapping, and the search itself is a lazy iterator that maps
//! one candidate file at a time.

use crate::error::{IndexError, Result};
use crate::index::FileId;
use crate::query::{Query, Scanner};
use crate::utils::{bucket, decode_varuint, read_u64_le, FileMap, NUM_BUCKETS};
use memchr::memmem::Finder;
use std::path::Path;

/// Byte size of the bucket-offset table at the start of the index file.
pub const BUCKET_TABLE_BYTES: usize = NUM_BUCKETS * 8;

/// A loaded index file.
pub struct Index {
    map: FileMap,
    num_files: u64,
    payload_start: usize,
}

impl Index {
    /// Map an index file and validate its fixed-table geometry. The payload
    /// itself is validated lazily, lookup by lookup.
    pub fn open(path: &Path) -> Result<Self> {
        let map = FileMap::open(path)?;
        let bytes = map.bytes();
        let num_files = read_u64_le(bytes, BUCKET_TABLE_BYTES)
            .ok_or_else(|| IndexError::Corrupt("file truncated before file count".into()))?;
        let payload_start = u64::try_from(BUCKET_TABLE_BYTES + 8)
            .ok()
            .and_then(|fixed| num_files.checked_mul(8)?.checked_add(fixed))
            .filter(|&end| end <= bytes.len() as u64)
            .ok_or_else(|| IndexError::Corrupt("file truncated inside file-offset table".into()))?;
        Ok(Self {
            map,
            num_files,
            payload_start: payload_start as usize,
        })
    }

    /// Number of indexed files; FileIDs are dense below this.
    pub fn num_files(&self) -> u64 {
        self.num_files
    }

    fn payload(&self) -> &[u8] {
        &self.map.bytes()[self.payload_start..]
    }

    fn fixed_u64(&self, offset: usize) -> Result<u64> {
        read_u64_le(self.map.bytes(), offset)
            .ok_or_else(|| IndexError::Corrupt(format!("offset table read at {offset} out of range")))
    }

    /// Path bytes of file `id`, borrowed from the mapped payload.
    pub fn file_name(&self, id: FileId) -> Result<&[u8]> {
        if u64::from(id) >= self.num_files {
            return Err(IndexError::Corrupt(format!(
                "file id {id} out of range (have {})",
                self.num_files
            )));
        }
        let offset = self.fixed_u64(BUCKET_TABLE_BYTES + 8 + id as usize * 8)?;
        let corrupt = || IndexError::Corrupt(format!("file record {id} outside payload"));
        let record = self
            .payload()
            .get(usize::try_from(offset).map_err(|_| corrupt())?..)
            .ok_or_else(corrupt)?;
        let (len, consumed) = decode_varuint(record).ok_or_else(corrupt)?;
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| consumed.checked_add(len))
            .ok_or_else(corrupt)?;
        record.get(consumed..end).ok_or_else(corrupt)
    }

    /// Lazy posting-list cursor for one bucket.
    pub fn postings(&self, bucket: usize) -> Result<Postings<'_>> {
        let offset = self.fixed_u64(bucket * 8)?;
        let corrupt = || IndexError::Corrupt(format!("bucket {bucket} record outside payload"));
        let record = self
            .payload()
            .get(usize::try_from(offset).map_err(|_| corrupt())?..)
            .ok_or_else(corrupt)?;
        let (count, consumed) = decode_varuint(record).ok_or_else(corrupt)?;
        Ok(Postings {
            data: &record[consumed..],
            remaining: count,
            current: 0,
        })
    }

    /// Files that contain every trigram bucket of the query, in increasing
    /// FileID order. This over-approximates the true matches: bucket
    /// collisions can admit files that never contained the term, which is
    /// why every candidate is re-verified against its contents.
    pub fn candidates(&self, query: &Query) -> Result<Vec<FileId>> {
        let mut candidates: Vec<FileId> = Vec::new();
        let mut first = true;
        for trigram in query.trigrams() {
            let postings = self.postings(bucket(trigram))?;
            if first {
                first = false;
                candidates = postings.collect();
            } else {
                // Two-pointer intersection: catch the candidate cursor up to
                // each posting, keeping only exact meetings. Both sequences
                // are sorted, so one pass suffices.
                let n = candidates.len();
                let (mut i, mut j) = (0, 0);
                for posting in postings {
                    if i == n {
                        break;
                    }
                    while i < n && candidates[i] < posting {
                        i += 1;
                    }
                    if i < n && candidates[i] == posting {
                        candidates[j] = candidates[i];
                        i += 1;
                        j += 1;
                    }
                }
                candidates.truncate(j);
            }
            if candidates.is_empty() {
                break;
            }
        }
        Ok(candidates)
    }

    /// Lazily search every candidate file for the query. Results arrive in
    /// `(file id, match position)` order; dropping the iterator unmaps the
    /// file being scanned.
    pub fn search<'a>(&'a self, query: &'a Query) -> Result<Search<'a>> {
        let candidates = self.candidates(query)?;
        Ok(Search {
            index: self,
            finder: Finder::new(query.as_str().as_bytes()),
            term_len: query.len(),
            candidates: candidates.into_iter(),
            current: None,
        })
    }
}

/// Streaming decoder of one bucket's posting list: a running sum over the
/// varint deltas stored in the mapped payload.
pub struct Postings<'a> {
    data: &'a [u8],
    remaining: u64,
    current: FileId,
}

impl Iterator for Postings<'_> {
    type Item = FileId;

    fn next(&mut self) -> Option<FileId> {
        if self.remaining == 0 {
            return None;
        }
        let (delta, consumed) = decode_varuint(self.data)?;
        self.data = &self.data[consumed..];
        self.remaining -= 1;
        self.current = self.current.wrapping_add(delta as FileId);
        Some(self.current)
    }
}

/// One verified occurrence of a query.
///
/// Fields are owned copies: the path bytes live in the index mapping and
/// the line text in the per-file mapping, neither of which may outlive the
/// search iterator, so nothing borrowed escapes here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub line_contents: String,
}

struct FileScan {
    path: String,
    map: FileMap,
    scanner: Scanner,
}

impl FileScan {
    fn next_result(&mut self, finder: &Finder<'_>, term_len: usize) -> Option<SearchResult> {
        let text = self.map.bytes();
        let found = self.scanner.next_match(finder, text, term_len)?;

        // The column already measures the distance to the line start; the
        // line ends at the next CR, LF, or end of file.
        let line_start = found.start - (found.column as usize - 1);
        let mut line_end = found.start;
        while line_end < text.len() && text[line_end] != b'\r' && text[line_end] != b'\n' {
            line_end += 1;
        }

        Some(SearchResult {
            path: self.path.clone(),
            line: found.line,
            column: found.column,
            line_contents: String::from_utf8_lossy(&text[line_start..line_end]).into_owned(),
        })
    }
}

/// Lazy stream of [`SearchResult`]s over the candidate files.
pub struct Search<'a> {
    index: &'a Index,
    finder: Finder<'a>,
    term_len: usize,
    candidates: std::vec::IntoIter<FileId>,
    current: Option<FileScan>,
}

impl Iterator for Search<'_> {
    type Item = Result<SearchResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(scan) = self.current.as_mut() {
                if let Some(result) = scan.next_result(&self.finder, self.term_len) {
                    return Some(Ok(result));
                }
                self.current = None;
            }
            let id = self.candidates.next()?;
            let path = match self.index.file_name(id) {
                Ok(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                Err(e) => return Some(Err(e)),
            };
            // Files that vanished or became unreadable since the index was
            // built are silently skipped.
            match FileMap::open(Path::new(&path)) {
                Ok(map) => {
                    self.current = Some(FileScan {
                        path,
                        map,
                        scanner: Scanner::new(),
                    })
                }
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".index");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert!(matches!(Index::open(&path), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn test_open_rejects_overlong_file_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".index");
        // A valid bucket table followed by a file count the file cannot hold.
        let mut bytes = vec![0u8; BUCKET_TABLE_BYTES];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(Index::open(&path), Err(IndexError::Corrupt(_))));
    }
}
