//! Parallel index construction.
//!
//! The pipeline is discover → distribute → index → merge → save. Each phase
//! completes before the next begins: indexing workers are scoped threads
//! joined at the end of the phase, and the merge hands rayon one contiguous
//! bucket range per thread.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::index::FileId;
use crate::utils::progress::ProgressBar;
use crate::utils::{bucket, encode_varuint, write_u64_le, BucketBitmap, FileMap, NUM_BUCKETS};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Per-worker partial index: one posting list per bucket, plus timing
/// counters for the post-build report.
struct WorkerBatch {
    postings: Vec<Vec<FileId>>,
    open_time: Duration,
    scan_time: Duration,
}

impl WorkerBatch {
    fn new() -> Self {
        Self {
            postings: vec![Vec::new(); NUM_BUCKETS],
            open_time: Duration::ZERO,
            scan_time: Duration::ZERO,
        }
    }

    /// Map one file and record its FileID under every bucket it touches.
    ///
    /// Files that cannot be mapped are skipped: their FileID stays assigned
    /// (the file table keeps the path) but no posting list mentions them.
    fn index_file(&mut self, id: FileId, path: &str, seen: &mut BucketBitmap) {
        let start = Instant::now();
        let map = match FileMap::open(Path::new(path)) {
            Ok(map) => map,
            Err(_) => return,
        };
        let opened = Instant::now();

        seen.clear();
        for window in map.bytes().windows(3) {
            seen.set(bucket(window));
        }
        for b in seen.iter() {
            self.postings[b].push(id);
        }

        self.open_time += opened - start;
        self.scan_time += opened.elapsed();
    }
}

/// Recursively enumerate indexable files beneath `root`, sorted
/// lexicographically. The sorted position of a path is its FileID.
///
/// Symlinks are never followed, which also guarantees termination on
/// cyclic link structures. Paths that are not valid UTF-8 are skipped with
/// a warning.
fn discover(root: &Path, config: &IndexConfig) -> Vec<String> {
    let start = Instant::now();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue, // unreadable directory entries are skipped
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if !config.allows(entry.path()) {
            continue;
        }
        match entry.path().to_str() {
            Some(path) => files.push(path.to_string()),
            None => eprintln!(
                "skipping file with unrepresentable name: {}",
                entry.path().display()
            ),
        }
    }
    files.sort_unstable();
    println!("discovering: {} files in {:.1?}", files.len(), start.elapsed());
    files
}

/// Run the indexing workers over the discovered files.
///
/// A shared atomic counter hands out FileIDs; each worker appends to its
/// own posting lists, so nothing is locked on the hot path. Because IDs are
/// claimed monotonically and each worker appends in claim order, every
/// per-worker posting list comes out sorted.
fn index_files(files: &[String], workers: usize) -> Vec<WorkerBatch> {
    let start = Instant::now();
    let total = files.len() as u32;
    let next = AtomicU32::new(0);
    let done = AtomicU32::new(0);
    let mut batches: Vec<WorkerBatch> = (0..workers).map(|_| WorkerBatch::new()).collect();

    std::thread::scope(|scope| {
        let next = &next;
        let done = &done;
        for batch in &mut batches {
            scope.spawn(move || {
                let mut seen = BucketBitmap::new();
                loop {
                    let id = next.fetch_add(1, Ordering::Relaxed);
                    if id >= total {
                        break;
                    }
                    batch.index_file(id, &files[id as usize], &mut seen);
                    done.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        // The main thread only reports progress while the workers drain
        // the queue; the relaxed counter reads are cosmetic.
        let bar = ProgressBar::new(u64::from(total));
        loop {
            let current = done.load(Ordering::Relaxed);
            bar.set_position(u64::from(current));
            if current >= total {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        bar.finish_and_clear();
    });

    println!("indexing: {:.1?}", start.elapsed());
    batches
}

/// Merge the per-worker posting lists into the final table.
///
/// Each rayon task owns a disjoint range of buckets, concatenates the
/// worker lists for its buckets and sorts the result. Duplicates are
/// impossible because every FileID was processed by exactly one worker.
fn merge(batches: Vec<WorkerBatch>) -> Vec<Vec<FileId>> {
    let start = Instant::now();
    let mut table: Vec<Vec<FileId>> = vec![Vec::new(); NUM_BUCKETS];
    table.par_iter_mut().enumerate().for_each(|(b, list)| {
        for batch in &batches {
            list.extend_from_slice(&batch.postings[b]);
        }
        list.sort_unstable();
    });

    let open: Duration = batches.iter().map(|b| b.open_time).sum();
    let scan: Duration = batches.iter().map(|b| b.scan_time).sum();
    println!("opening: {open:.1?}");
    println!("scanning: {scan:.1?}");
    println!("merging: {:.1?}", start.elapsed());
    table
}

/// Serialize the index and atomically move it onto `target`.
///
/// Pass one builds the variable-length payload in memory (file records,
/// then posting lists) while recording offsets; pass two writes the fixed
/// tables followed by the payload. Writing goes to `<target>.tmp` first so
/// a failed save never leaves a partial index behind.
fn save(files: &[String], table: &[Vec<FileId>], target: &Path) -> Result<()> {
    let start = Instant::now();

    let mut data = Vec::new();
    let mut file_offsets = Vec::with_capacity(files.len());
    for file in files {
        file_offsets.push(data.len() as u64);
        encode_varuint(file.len() as u64, &mut data);
        data.extend_from_slice(file.as_bytes());
    }
    let mut bucket_offsets = Vec::with_capacity(NUM_BUCKETS);
    for list in table {
        bucket_offsets.push(data.len() as u64);
        encode_varuint(list.len() as u64, &mut data);
        let mut previous: FileId = 0;
        for &id in list {
            // Always representable: the list is strictly increasing.
            encode_varuint(u64::from(id - previous), &mut data);
            previous = id;
        }
    }

    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let io = |source| IndexError::io(target, source);
    let mut out = BufWriter::new(fs::File::create(&tmp).map_err(io)?);
    for &offset in &bucket_offsets {
        write_u64_le(&mut out, offset).map_err(io)?;
    }
    write_u64_le(&mut out, files.len() as u64).map_err(io)?;
    for &offset in &file_offsets {
        write_u64_le(&mut out, offset).map_err(io)?;
    }
    out.write_all(&data).map_err(io)?;
    out.into_inner().map_err(|e| io(e.into_error()))?;
    fs::rename(&tmp, target).map_err(io)?;

    println!("saving: {:.1?}", start.elapsed());
    Ok(())
}

/// Build an index of the tree beneath `root` and write it to `target`.
pub fn build(root: &Path, target: &Path, config: &IndexConfig) -> Result<()> {
    let files = discover(root, config);
    let batches = index_files(&files, config.workers.max(1));
    let table = merge(batches);
    save(&files, &table, target)
}
