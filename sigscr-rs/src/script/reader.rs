//! Line preprocessing for signal script files.
//!
//! [`LineReader`] turns raw file lines into *logical* lines:
//!
//! - `//` comments are dropped to end of line, `/* … */` comments may span
//!   lines;
//! - text is uppercased, tabs become spaces, surrounding blanks are trimmed;
//! - empty results are skipped;
//! - a line is split at the first `;`, `{` or `}`.  A `;` stays on the
//!   emitted part, a brace is always emitted on its own, and the rest is kept
//!   pending and returned by the next call;
//! - `IF(` is normalized to `IF (`.
//!
//! Sources are UTF-8 unless they open with a UTF-16 byte order mark.  Bytes
//! that do not decode become U+FFFD instead of failing the read, so a stray
//! Latin-1 character in a comment costs nothing.
//!
//! The pending remainder belongs to the reader, so independent readers can
//! run side by side.

use std::io::{self, BufRead, Read};

/// One logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    /// 1-based number of the physical line the text came from.
    pub line: usize,
}

impl SourceLine {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self { text: text.into(), line }
    }
}

/// Text encoding of a source, decided from its byte order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

pub struct LineReader<R> {
    source: R,
    line_no: usize,
    pending: Option<SourceLine>,
    in_comment: bool,
    encoding: Option<Encoding>,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self { source, line_no: 0, pending: None, in_comment: false, encoding: None, buf: Vec::new() }
    }

    /// Consume a byte order mark, if any, on first use.
    fn encoding(&mut self) -> io::Result<Encoding> {
        if let Some(enc) = self.encoding {
            return Ok(enc);
        }
        let head = self.source.fill_buf()?;
        let (enc, bom) = if head.starts_with(&[0xEF, 0xBB, 0xBF]) {
            (Encoding::Utf8, 3)
        } else if head.starts_with(&[0xFF, 0xFE]) {
            (Encoding::Utf16Le, 2)
        } else if head.starts_with(&[0xFE, 0xFF]) {
            (Encoding::Utf16Be, 2)
        } else {
            (Encoding::Utf8, 0)
        };
        self.source.consume(bom);
        tracing::trace!(?enc, "source encoding");
        self.encoding = Some(enc);
        Ok(enc)
    }

    /// Next physical line, decoded, or `None` at end of input.
    fn read_raw(&mut self) -> io::Result<Option<String>> {
        match self.encoding()? {
            Encoding::Utf8 => {
                self.buf.clear();
                if self.source.read_until(b'\n', &mut self.buf)? == 0 {
                    return Ok(None);
                }
                Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            enc => {
                let mut units = Vec::new();
                while let Some(pair) = read_unit(&mut self.source)? {
                    let unit = match enc {
                        Encoding::Utf16Be => u16::from_be_bytes(pair),
                        _ => u16::from_le_bytes(pair),
                    };
                    units.push(unit);
                    if unit == u16::from(b'\n') {
                        break;
                    }
                }
                if units.is_empty() {
                    return Ok(None);
                }
                Ok(Some(
                    char::decode_utf16(units)
                        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                        .collect(),
                ))
            }
        }
    }

    /// Next logical line, or `None` once the source and the pending
    /// remainder are both exhausted.
    pub fn next_line(&mut self) -> io::Result<Option<SourceLine>> {
        loop {
            let (text, line) = match self.pending.take() {
                Some(p) => (p.text, p.line),
                None => {
                    let Some(raw) = self.read_raw()? else {
                        return Ok(None);
                    };
                    self.line_no += 1;
                    let cleaned = strip_comments(&raw, &mut self.in_comment);
                    (cleaned, self.line_no)
                }
            };

            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let (head, rest) = split_at_delimiter(text);
            if let Some(rest) = rest {
                self.pending = Some(SourceLine::new(rest, line));
            }
            return Ok(Some(SourceLine::new(head.replace("IF(", "IF ("), line)));
        }
    }

    /// Drain the reader into a vector.
    pub fn collect_lines(mut self) -> io::Result<Vec<SourceLine>> {
        let mut out = Vec::new();
        while let Some(l) = self.next_line()? {
            out.push(l);
        }
        Ok(out)
    }
}

/// One UTF-16 code unit; a trailing odd byte is dropped.
fn read_unit<R: Read>(source: &mut R) -> io::Result<Option<[u8; 2]>> {
    let mut pair = [0u8; 2];
    match source.read_exact(&mut pair) {
        Ok(()) => Ok(Some(pair)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Uppercase `raw`, replace tabs and remove comments.  `in_comment` carries
/// an open `/*` across calls.
fn strip_comments(raw: &str, in_comment: &mut bool) -> String {
    let upper = raw.to_uppercase().replace('\t', " ");
    let mut out = String::with_capacity(upper.len());
    let mut rest = upper.as_str();

    loop {
        if *in_comment {
            match rest.find("*/") {
                Some(end) => {
                    *in_comment = false;
                    rest = &rest[end + 2..];
                    out.push(' ');
                }
                None => break,
            }
        } else {
            let line_c = rest.find("//");
            let block_c = rest.find("/*");
            match (line_c, block_c) {
                (Some(l), b) if b.map_or(true, |b| l < b) => {
                    out.push_str(&rest[..l]);
                    break;
                }
                (_, Some(b)) => {
                    out.push_str(&rest[..b]);
                    *in_comment = true;
                    rest = &rest[b + 2..];
                }
                _ => {
                    out.push_str(rest);
                    break;
                }
            }
        }
    }
    out
}

/// Split at the first `;`, `{` or `}`.  Returns the part to emit now and the
/// remainder, if any text follows.
fn split_at_delimiter(text: &str) -> (&str, Option<&str>) {
    let Some(pos) = text.find([';', '{', '}']) else {
        return (text, None);
    };
    let (head, rest) = if text.as_bytes()[pos] == b';' || pos == 0 {
        text.split_at(pos + 1)
    } else {
        text.split_at(pos)
    };
    let rest = rest.trim();
    (head.trim(), (!rest.is_empty()).then_some(rest))
}
