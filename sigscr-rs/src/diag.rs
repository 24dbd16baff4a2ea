//! Non-fatal compile diagnostics.
//!
//! Nothing in the compiler aborts on bad input.  Problems are recorded as
//! [`Diagnostic`] values, logged through `tracing` at `warn` level as they
//! occur, and handed back to the caller alongside whatever did compile.

use std::fmt;

/// Broad category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Bracket, brace or terminator problems; parsing recovered.
    Structure,
    /// A name or term that could not be resolved.
    Resolution,
    /// A script that could not be registered for a signal type.
    Registration,
    /// A source file that could not be read.
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    /// Script the problem was found in, empty outside any script.
    pub script: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if !self.script.is_empty() {
            write!(f, " [{}]", self.script)?;
        }
        write!(f, " {}", self.message)
    }
}

/// Collects diagnostics for one compile session.
#[derive(Debug, Default)]
pub struct Diagnostics {
    file: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into(), entries: Vec::new() }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn push(&mut self, kind: DiagnosticKind, line: usize, script: &str, message: impl Into<String>) {
        let d = Diagnostic {
            file: self.file.clone(),
            line,
            script: script.to_owned(),
            kind,
            message: message.into(),
        };
        tracing::warn!(file = %d.file, line = d.line, script = %d.script, kind = ?d.kind, "{}", d.message);
        self.entries.push(d);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// A [`Diagnostics`] view scoped to one script, used by the per-script
/// parsing stages.
pub struct ScriptDiag<'a> {
    sink: &'a mut Diagnostics,
    script: &'a str,
}

impl<'a> ScriptDiag<'a> {
    pub fn new(sink: &'a mut Diagnostics, script: &'a str) -> Self {
        Self { sink, script }
    }

    pub fn structure(&mut self, line: usize, message: impl Into<String>) {
        self.sink.push(DiagnosticKind::Structure, line, self.script, message);
    }

    pub fn resolution(&mut self, line: usize, message: impl Into<String>) {
        self.sink.push(DiagnosticKind::Resolution, line, self.script, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_script_when_known() {
        let mut diags = Diagnostics::new("sigscr.dat");
        diags.push(DiagnosticKind::Resolution, 12, "UK_HOME", "unknown term 'FOO'");
        diags.push(DiagnosticKind::Io, 0, "", "cannot open");
        let out: Vec<String> = diags.entries().iter().map(ToString::to_string).collect();
        assert_eq!(out[0], "sigscr.dat:12 [UK_HOME] unknown term 'FOO'");
        assert_eq!(out[1], "sigscr.dat:0 cannot open");
    }

    #[test]
    fn scoped_view_tags_script_name() {
        let mut diags = Diagnostics::new("a.dat");
        ScriptDiag::new(&mut diags, "S1").structure(3, "missing ;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.entries()[0].script, "S1");
        assert_eq!(diags.entries()[0].kind, DiagnosticKind::Structure);
    }
}
