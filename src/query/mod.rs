//! Literal query compilation and matching.
//!
//! A [`Query`] wraps a literal search term of at least three bytes. It
//! exposes the term's trigram windows (which drive candidate narrowing
//! against the index) and a lazy match scanner over arbitrary text (which
//! drives per-file verification).

use crate::error::QueryError;
use memchr::memmem::Finder;

/// Minimum query length; shorter terms have no trigram to look up.
pub const MIN_QUERY_LEN: usize = 3;

/// A compiled literal search term.
#[derive(Debug, Clone)]
pub struct Query {
    term: String,
}

impl Query {
    /// Compile a literal term. Fails with [`QueryError::TooShort`] for terms
    /// under three bytes; no I/O happens here or in any later query step
    /// until a search iterator is driven.
    pub fn new(term: impl Into<String>) -> Result<Self, QueryError> {
        let term = term.into();
        if term.len() < MIN_QUERY_LEN {
            return Err(QueryError::TooShort(term.len()));
        }
        Ok(Self { term })
    }

    pub fn as_str(&self) -> &str {
        &self.term
    }

    pub fn len(&self) -> usize {
        self.term.len()
    }

    pub fn is_empty(&self) -> bool {
        false // a query is never shorter than MIN_QUERY_LEN
    }

    /// Every length-3 sliding window of the term, in order. A term of `n`
    /// bytes yields exactly `n - 2` trigrams; duplicates are preserved
    /// (they re-apply the same constraint, which intersection absorbs).
    pub fn trigrams(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.term.as_bytes().windows(3)
    }

    /// Lazy in-order matches of the term inside `text`.
    pub fn search<'q, 't>(&'q self, text: &'t [u8]) -> Matches<'q, 't> {
        Matches {
            finder: Finder::new(self.term.as_bytes()),
            term_len: self.term.len(),
            text,
            scanner: Scanner::new(),
        }
    }
}

/// A single occurrence of the query term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// 1-based line, counting `\n` from the start of the text.
    pub line: u32,
    /// 1-based column of the first matched byte, reset by `\n`.
    pub column: u32,
    /// Byte offset of the match.
    pub start: usize,
    /// `start + query.len()`.
    pub end: usize,
}

/// Line/column bookkeeping for a scan over one text buffer.
///
/// `line`/`column` always describe the byte at `counted`; advancing to a
/// match only walks the bytes between the previous match and the new one,
/// so a full scan is linear regardless of match count.
#[derive(Debug, Clone)]
pub struct Scanner {
    next_start: usize,
    counted: usize,
    line: u32,
    column: u32,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            next_start: 0,
            counted: 0,
            line: 1,
            column: 1,
        }
    }

    /// Find the next occurrence of `finder`'s needle in `text` at or after
    /// the current position. Matches may overlap: the scan resumes one byte
    /// past the start of each match, not past its end.
    pub fn next_match(
        &mut self,
        finder: &Finder<'_>,
        text: &[u8],
        term_len: usize,
    ) -> Option<Match> {
        if self.next_start > text.len() {
            return None;
        }
        let start = finder.find(&text[self.next_start..])? + self.next_start;
        for &byte in &text[self.counted..start] {
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.counted = start;
        self.next_start = start + 1;
        Some(Match {
            line: self.line,
            column: self.column,
            start,
            end: start + term_len,
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over [`Match`]es of a query in a borrowed text.
pub struct Matches<'q, 't> {
    finder: Finder<'q>,
    term_len: usize,
    text: &'t [u8],
    scanner: Scanner,
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.scanner.next_match(&self.finder, self.text, self.term_len)
    }
}
