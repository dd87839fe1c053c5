//! Tab-separated match file
//!
//! One `match<TAB>url` line per distinct match, written and flushed as soon
//! as the match is first seen.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only writer for the match file
pub struct MatchWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: u64,
}

impl MatchWriter {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Writes one line and flushes it to the file
    pub fn write_match(&mut self, found: &str, url: &str) -> io::Result<()> {
        self.out.write_all(format_line(found, url).as_bytes())?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and syncs the file
    pub fn close(mut self) -> io::Result<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()
    }
}

/// Formats one output line
///
/// Backslashes, tabs and line breaks inside either field are written as
/// `\\`, `\t`, `\n` and `\r`, so every line splits back into exactly the
/// pair that was written.
///
/// # Example
///
/// ```
/// use gsdl_harvest::output::format_line;
///
/// assert_eq!(format_line("a\tb", "http://x/"), "a\\tb\thttp://x/\n");
/// ```
pub fn format_line(found: &str, url: &str) -> String {
    format!("{}\t{}\n", escape(found), escape(url))
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Unknown escapes are kept as written
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Reads a match file back into `(match, url)` pairs, in file order
pub fn read_matches(path: &Path) -> io::Result<Vec<(String, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut pairs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (found, url) = line.split_once('\t').unwrap_or((line.as_str(), ""));
        pairs.push((unescape(found), unescape(url)));
    }
    Ok(pairs)
}
