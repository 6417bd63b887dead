use anyhow::{bail, Context, Result};
use clap::Parser;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tgs::config::{IndexConfig, INDEX_FILE_NAME};
use tgs::index::{self, Index};
use tgs::output;
use tgs::query::Query;
use termcolor::{ColorChoice, StandardStream};

#[derive(Parser)]
#[command(name = "tgs")]
#[command(about = "Trigram-indexed literal code search")]
struct Cli {
    /// Build the index at `.index` in the current directory
    #[arg(long, conflicts_with_all = ["update", "interactive", "query"])]
    index: bool,

    /// Rebuild the nearest ancestor `.index`
    #[arg(long, conflicts_with_all = ["interactive", "query"])]
    update: bool,

    /// Read queries from stdin, one per line
    #[arg(long, conflicts_with = "query")]
    interactive: bool,

    /// Literal search term (at least 3 bytes)
    query: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.index {
        let root = env::current_dir().context("cannot determine working directory")?;
        let config = IndexConfig::load(&root)?;
        index::build(&root, &root.join(INDEX_FILE_NAME), &config)?;
        return Ok(());
    }

    if cli.update {
        let index_path = find_index()?;
        let root = index_path
            .parent()
            .context("index file has no parent directory")?
            .to_path_buf();
        env::set_current_dir(&root)
            .with_context(|| format!("cannot change to {}", root.display()))?;
        let config = IndexConfig::load(&root)?;
        index::build(&root, &index_path, &config)?;
        return Ok(());
    }

    match cli.query {
        Some(term) => {
            // Validate before touching the filesystem so a short query
            // costs no I/O.
            let query = Query::new(term)?;
            let index = Index::open(&find_index()?)?;
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            output::print_all(&mut stdout, index.search(&query)?)
        }
        None => {
            let index = Index::open(&find_index()?)?;
            run_interactive(&index)
        }
    }
}

/// Walk from the current directory toward the filesystem root looking for
/// a `.index` file; the first one found wins.
fn find_index() -> Result<PathBuf> {
    let start = env::current_dir().context("cannot determine working directory")?;
    let mut current = start.as_path();
    loop {
        let candidate = current.join(INDEX_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    bail!(
        "no {INDEX_FILE_NAME} found in {} or any parent; run `tgs --index` first",
        start.display()
    )
}

/// Prompt loop: one query per line until EOF, truncated output per query.
fn run_interactive(index: &Index) -> Result<()> {
    let mut stdin = io::stdin().lock();
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }
        let term = line.trim_end_matches(['\r', '\n']);
        if term.is_empty() {
            continue;
        }
        match Query::new(term) {
            Ok(query) => output::print_truncated(&mut stdout, index.search(&query)?)?,
            Err(e) => writeln!(stdout, "{e}")?,
        }
    }
}
