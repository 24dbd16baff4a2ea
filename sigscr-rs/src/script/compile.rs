//! Script compilation: declarations plus structure, per segment and per
//! source.

use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;

use super::ast::Script;
use super::block::structure;
use super::reader::{LineReader, SourceLine};
use super::segment::{read_segments, Segment};
use super::term::Scope;
use crate::diag::{Diagnostics, ScriptDiag};

static EXTERN_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^EXTERN\s+FLOAT\s").expect("static regex"));
static FLOAT_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^FLOAT\s+([^;]*?)\s*;?$").expect("static regex"));

/// Consume the leading declarations of a script body.  Returns the local
/// variable names in slot order and the remaining lines.
pub fn scan_declarations(lines: Vec<SourceLine>) -> (Vec<String>, Vec<SourceLine>) {
    let mut iter = lines.into_iter().peekable();

    while iter.next_if(|l| EXTERN_DECL.is_match(&l.text)).is_some() {}

    let mut locals: Vec<String> = Vec::new();
    while let Some(line) = iter.next_if(|l| FLOAT_DECL.is_match(&l.text)) {
        let Some(caps) = FLOAT_DECL.captures(&line.text) else { continue };
        let name = caps[1].trim();
        if !name.is_empty() && !locals.iter().any(|l| l == name) {
            locals.push(name.to_owned());
        }
    }

    (locals, iter.collect())
}

/// Compile one script segment.  Problems are recorded in `diags`; the
/// returned script holds everything that could be compiled.
pub fn compile_segment(segment: Segment, diags: &mut Diagnostics) -> Script {
    let Segment { name, line, lines } = segment;
    let (locals, body) = scan_declarations(lines);
    tracing::debug!(script = %name, line, locals = locals.len(), "compiling script");

    let stmts = {
        let mut sd = ScriptDiag::new(diags, &name);
        let mut scope = Scope { locals: &locals, diag: &mut sd, line };
        structure(body, &mut scope)
    };

    Script { name, line, locals, stmts }
}

/// Compile every script in a source.  The scripts come back in source
/// order, unregistered.
pub fn compile_source<R: BufRead>(source: R, diags: &mut Diagnostics) -> io::Result<Vec<Script>> {
    let mut reader = LineReader::new(source);
    let segments = read_segments(&mut reader)?;
    Ok(segments.into_iter().map(|seg| compile_segment(seg, diags)).collect())
}

/// Compile a single script from an in-memory string.  Convenience for tests
/// and tools; the text should contain exactly one `SCRIPT` segment.
pub fn compile_str(text: &str) -> (Option<Script>, Diagnostics) {
    let mut diags = Diagnostics::new("<string>");
    let scripts = compile_source(text.as_bytes(), &mut diags).unwrap_or_default();
    (scripts.into_iter().next(), diags)
}
