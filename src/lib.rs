//! # tgs - trigram-indexed literal code search
//!
//! tgs builds a persistent on-disk index of the source files beneath a
//! directory and answers literal substring queries (three bytes or longer)
//! from it: every occurrence is reported with file path, line, column, and
//! the text of the containing line.
//!
//! ## Architecture
//!
//! - [`index`] - index building (parallel) and reading (memory-mapped, lazy)
//! - [`query`] - query validation, trigram extraction, literal match scanning
//! - [`output`] - result formatting and interactive truncation
//! - [`config`] - worker count and extension allow-list
//! - [`utils`] - varint codec, memory mapping, trigram hashing, progress
//!
//! ## Quick start
//!
//! ```ignore
//! use tgs::config::IndexConfig;
//! use tgs::index::{self, Index};
//! use tgs::query::Query;
//! use std::path::Path;
//!
//! // Build an index of the current tree.
//! index::build(Path::new("."), Path::new(".index"), &IndexConfig::default())?;
//!
//! // Search it.
//! let index = Index::open(Path::new(".index"))?;
//! let query = Query::new("fn main")?;
//! for result in index.search(&query)? {
//!     let result = result?;
//!     println!("{}:{}:{}: {}", result.path, result.line, result.column, result.line_contents);
//! }
//! ```
//!
//! The index trades precision for size: trigrams are hashed into 65,536
//! buckets, so candidate files are an over-approximation and every match is
//! re-verified against the file's actual contents before it is reported.

pub mod config;
pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;
