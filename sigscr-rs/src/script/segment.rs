//! Split a stream of logical lines into per-script segments.
//!
//! `SCRIPT <name>` opens a segment that runs to the next marker.
//! `REM SCRIPT <name>` closes the current segment and discards everything up
//! to the next `SCRIPT`.  Lines ahead of the first `SCRIPT` are ignored.

use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;

use super::reader::{LineReader, SourceLine};

static SCRIPT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SCRIPT\s+(.+)$").expect("static regex"));
static REM_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^REM\s+SCRIPT\b").expect("static regex"));

/// The raw lines of one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Name as written, trimmed.
    pub name: String,
    /// Line of the `SCRIPT` marker.
    pub line: usize,
    pub lines: Vec<SourceLine>,
}

enum Marker {
    Script(String),
    Rem,
}

fn marker(text: &str) -> Option<Marker> {
    if let Some(caps) = SCRIPT_MARKER.captures(text) {
        return Some(Marker::Script(caps[1].trim().to_owned()));
    }
    REM_MARKER.is_match(text).then_some(Marker::Rem)
}

/// Read every segment from `reader`.
pub fn read_segments<R: BufRead>(reader: &mut LineReader<R>) -> io::Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;

    while let Some(line) = reader.next_line()? {
        match marker(&line.text) {
            Some(Marker::Script(name)) => {
                segments.extend(current.take());
                current = Some(Segment { name, line: line.line, lines: Vec::new() });
            }
            Some(Marker::Rem) => {
                tracing::debug!(line = line.line, "skipping disabled script");
                segments.extend(current.take());
            }
            None => match current.as_mut() {
                Some(seg) => seg.lines.push(line),
                None => tracing::trace!(line = line.line, text = %line.text, "outside any script"),
            },
        }
    }
    segments.extend(current);
    Ok(segments)
}
