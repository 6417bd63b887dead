//! End-to-end scenarios through the library API: build an index over a
//! temporary corpus, then search it.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tgs::config::IndexConfig;
use tgs::index::{self, FileId, Index, SearchResult};
use tgs::query::Query;
use tgs::utils::{bucket, NUM_BUCKETS};

/// Write the given files into a fresh tempdir and index it.
fn corpus(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    let target = dir.path().join(".index");
    index::build(dir.path(), &target, &IndexConfig::default()).unwrap();
    (dir, target)
}

fn search(index: &Index, term: &str) -> Vec<SearchResult> {
    let query = Query::new(term).unwrap();
    index.search(&query).unwrap().map(|r| r.unwrap()).collect()
}

/// Resolve the FileID of a path by suffix.
fn id_of(index: &Index, suffix: &str) -> FileId {
    (0..index.num_files() as FileId)
        .find(|&id| {
            std::str::from_utf8(index.file_name(id).unwrap())
                .unwrap()
                .ends_with(suffix)
        })
        .unwrap()
}

#[test]
fn test_single_file_single_match() {
    let (_dir, target) = corpus(&[("a.txt", "hello world\n")]);
    let index = Index::open(&target).unwrap();

    let results = search(&index, "world");
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("a.txt"));
    assert_eq!(results[0].line, 1);
    assert_eq!(results[0].column, 7);
    assert_eq!(results[0].line_contents, "hello world");
}

#[test]
fn test_multiline_matches() {
    let (_dir, target) = corpus(&[("a.txt", "foo\nbar\nfoo\n")]);
    let index = Index::open(&target).unwrap();

    let results = search(&index, "foo");
    assert_eq!(results.len(), 2);
    assert_eq!((results[0].line, results[0].column), (1, 1));
    assert_eq!((results[1].line, results[1].column), (3, 1));
    assert_eq!(results[0].line_contents, "foo");
    assert_eq!(results[1].line_contents, "foo");
}

#[test]
fn test_overlapping_matches() {
    let (_dir, target) = corpus(&[("a.txt", "aaaa")]);
    let index = Index::open(&target).unwrap();

    let results = search(&index, "aaa");
    assert_eq!(results.len(), 2);
    assert_eq!((results[0].line, results[0].column), (1, 1));
    assert_eq!((results[1].line, results[1].column), (1, 2));
    assert_eq!(results[0].line_contents, "aaaa");
}

#[test]
fn test_verification_filters_non_containing_files() {
    let (_dir, target) = corpus(&[
        ("a.txt", "the needle is here\n"),
        ("b.txt", "nothing of interest\n"),
    ]);
    let index = Index::open(&target).unwrap();

    let results = search(&index, "needle");
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.path.ends_with("a.txt")));
}

#[test]
fn test_crlf_line_trimmed() {
    let (_dir, target) = corpus(&[("a.txt", "foo\r\nbar")]);
    let index = Index::open(&target).unwrap();

    let results = search(&index, "bar");
    assert_eq!(results.len(), 1);
    assert_eq!((results[0].line, results[0].column), (2, 1));
    assert_eq!(results[0].line_contents, "bar");

    // The CR never leaks into the reported line either.
    let results = search(&index, "foo");
    assert_eq!(results[0].line_contents, "foo");
}

#[test]
fn test_results_in_file_id_order() {
    let (_dir, target) = corpus(&[
        ("z.txt", "shared term\n"),
        ("a.txt", "shared term\n"),
        ("m.txt", "shared term\n"),
    ]);
    let index = Index::open(&target).unwrap();

    let paths: Vec<String> = search(&index, "shared")
        .into_iter()
        .map(|r| r.path)
        .collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
    assert_eq!(paths.len(), 3);
}

#[test]
fn test_stale_index_entry_skipped() {
    let (dir, target) = corpus(&[("a.txt", "needle a\n"), ("b.txt", "needle b\n")]);
    let index = Index::open(&target).unwrap();

    fs::remove_file(dir.path().join("a.txt")).unwrap();

    let results = search(&index, "needle");
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("b.txt"));
}

#[test]
fn test_tiny_files_contribute_no_postings() {
    let (_dir, target) = corpus(&[
        ("empty.txt", ""),
        ("two.txt", "ab"),
        ("three.txt", "abc"),
        ("long.txt", "abcdef\n"),
    ]);
    let index = Index::open(&target).unwrap();
    assert_eq!(index.num_files(), 4);

    let empty = id_of(&index, "empty.txt");
    let two = id_of(&index, "two.txt");
    let three = id_of(&index, "three.txt");

    let mut buckets_of_three = 0;
    for b in 0..NUM_BUCKETS {
        let ids: Vec<FileId> = index.postings(b).unwrap().collect();
        assert!(!ids.contains(&empty), "empty file in bucket {b}");
        assert!(!ids.contains(&two), "2-byte file in bucket {b}");
        if ids.contains(&three) {
            buckets_of_three += 1;
        }
    }
    // A 3-byte file has exactly one trigram, hence exactly one bucket.
    assert_eq!(buckets_of_three, 1);
    assert!(index
        .postings(bucket(b"abc"))
        .unwrap()
        .any(|id| id == three));
}

#[test]
fn test_posting_lists_sorted_and_in_range() {
    let (_dir, target) = corpus(&[
        ("a.md", "alpha beta gamma\n"),
        ("b.md", "beta gamma delta\n"),
        ("c.md", "gamma delta alpha\n"),
        ("d.py", "def alpha(): return 'beta'\n"),
    ]);
    let index = Index::open(&target).unwrap();
    let n = index.num_files() as FileId;

    for b in 0..NUM_BUCKETS {
        let ids: Vec<FileId> = index.postings(b).unwrap().collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "bucket {b} not sorted");
        assert!(ids.iter().all(|&id| id < n), "bucket {b} id out of range");
    }
}

#[test]
fn test_completeness_every_trigram_lists_its_file() {
    let contents = "fn main() {\n    println!(\"hi\");\n}\n";
    let (_dir, target) = corpus(&[("main.py", contents), ("other.py", "unrelated\n")]);
    let index = Index::open(&target).unwrap();
    let id = id_of(&index, "main.py");

    for window in contents.as_bytes().windows(3) {
        assert!(
            index.postings(bucket(window)).unwrap().any(|f| f == id),
            "trigram {window:?} missing its file"
        );
    }
}

#[test]
fn test_length_three_query_candidates_equal_postings() {
    let (_dir, target) = corpus(&[
        ("a.txt", "abc and more\n"),
        ("b.txt", "no match here\n"),
        ("c.txt", "abcabc\n"),
    ]);
    let index = Index::open(&target).unwrap();

    let query = Query::new("abc").unwrap();
    let candidates = index.candidates(&query).unwrap();
    let postings: Vec<FileId> = index.postings(bucket(b"abc")).unwrap().collect();
    assert_eq!(candidates, postings);
}

#[test]
fn test_rebuild_is_byte_identical() {
    let files = [
        ("src.py", "def alpha():\n    return 42\n"),
        ("doc.md", "# alpha\nbeta gamma\n"),
        ("sub/more.txt", "alpha beta\n"),
    ];
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    let first = dir.path().join(".index");
    index::build(dir.path(), &first, &IndexConfig::default()).unwrap();
    // `.index` carries no extension, so the rebuild never indexes it.
    let second = dir.path().join("rebuilt");
    index::build(dir.path(), &second, &IndexConfig::default()).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_search_is_lazy() {
    let (_dir, target) = corpus(&[("a.txt", "term term term\n"), ("b.txt", "term again\n")]);
    let index = Index::open(&target).unwrap();

    // Taking a prefix must not require draining the stream.
    let query = Query::new("term").unwrap();
    let first_two: Vec<SearchResult> = index
        .search(&query)
        .unwrap()
        .take(2)
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(first_two.len(), 2);
    assert!(first_two.iter().all(|r| r.path.ends_with("a.txt")));
}

#[test]
fn test_no_match_after_collision_narrowing() {
    let (_dir, target) = corpus(&[("a.txt", "completely different\n")]);
    let index = Index::open(&target).unwrap();
    assert!(search(&index, "absent").is_empty());
}
