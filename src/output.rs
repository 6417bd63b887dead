//! Output formatting for search results.

use crate::error::Result;
use crate::index::SearchResult;
use std::io::Write;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

/// Interactive mode prints at most this many files per query.
pub const MAX_MATCHED_FILES: usize = 5;

/// Interactive mode prints at most this many matches per file.
pub const MAX_MATCHES_PER_FILE: usize = 5;

/// Print one match as `path:line:column: text`.
fn print_match(stdout: &mut StandardStream, result: &SearchResult) -> std::io::Result<()> {
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    write!(stdout, "{}", result.path)?;
    stdout.reset()?;
    write!(stdout, ":")?;
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(stdout, "{}:{}", result.line, result.column)?;
    stdout.reset()?;
    writeln!(stdout, ": {}", result.line_contents)
}

/// Print every match the iterator yields.
pub fn print_all<I>(stdout: &mut StandardStream, results: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = Result<SearchResult>>,
{
    for result in results {
        print_match(stdout, &result?)?;
    }
    Ok(())
}

/// Print matches with the interactive limits applied: at most
/// [`MAX_MATCHED_FILES`] files and [`MAX_MATCHES_PER_FILE`] matches per
/// file, with `...` marking each truncation. Consumption stops as soon as
/// the file limit is hit, so the underlying search stays lazy.
pub fn print_truncated<I>(stdout: &mut StandardStream, results: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = Result<SearchResult>>,
{
    let mut current_file: Option<String> = None;
    let mut files_seen = 0usize;
    let mut matches_in_file = 0usize;
    let mut file_truncated = false;

    for result in results {
        let result = result?;
        if current_file.as_deref() != Some(result.path.as_str()) {
            if files_seen == MAX_MATCHED_FILES {
                writeln!(stdout, "...")?;
                return Ok(());
            }
            current_file = Some(result.path.clone());
            files_seen += 1;
            matches_in_file = 0;
            file_truncated = false;
        }
        if matches_in_file == MAX_MATCHES_PER_FILE {
            if !file_truncated {
                writeln!(stdout, "...")?;
                file_truncated = true;
            }
            continue;
        }
        matches_in_file += 1;
        print_match(stdout, &result)?;
    }
    Ok(())
}
