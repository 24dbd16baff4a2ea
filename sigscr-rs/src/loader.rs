//! Script registry: compiles script files and keeps one compiled script per
//! signal type.
//!
//! Loading never fails as a whole.  Unknown or duplicate script names,
//! compile problems and unreadable files all end up as [`Diagnostic`]s; the
//! registry simply lacks an entry for whatever could not be compiled, and
//! [`crate::signal::update_signal`] falls back to the built-in rule for those
//! types.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::script::ast::Script;
use crate::script::compile::compile_source;
use crate::signal::SignalTypeCatalog;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Compiled scripts keyed by signal type.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: BTreeMap<String, Arc<Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Script for `signal_type`, ignoring case.
    pub fn get(&self, signal_type: &str) -> Option<&Arc<Script>> {
        self.scripts.get(&Self::key(signal_type))
    }

    pub fn contains(&self, signal_type: &str) -> bool {
        self.scripts.contains_key(&Self::key(signal_type))
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Script>> {
        self.scripts.values()
    }

    /// Script names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.values().map(|s| s.name.as_str())
    }

    /// Register `script` under its signal type.  The first script for a
    /// type wins; later ones and unknown types are reported and dropped.
    pub fn register(&mut self, script: Script, catalog: &SignalTypeCatalog, diags: &mut Diagnostics) -> bool {
        let Some(canonical) = catalog.resolve(&script.name) else {
            diags.push(
                DiagnosticKind::Registration,
                script.line,
                &script.name,
                format!("ignored script for unknown signal type '{}'", script.name.trim()),
            );
            return false;
        };

        let key = Self::key(canonical);
        if self.scripts.contains_key(&key) {
            diags.push(
                DiagnosticKind::Registration,
                script.line,
                &script.name,
                format!("ignored duplicate script for signal type '{canonical}'"),
            );
            return false;
        }

        tracing::debug!(signal_type = canonical, locals = script.locals.len(), "registered script");
        self.scripts.insert(key, Arc::new(script));
        true
    }

    /// Compile every script in `source` and register the results.
    pub fn load_source<R: BufRead>(
        &mut self,
        file_name: &str,
        source: R,
        catalog: &SignalTypeCatalog,
    ) -> Result<Vec<Diagnostic>, LoadError> {
        let mut diags = Diagnostics::new(file_name);
        let scripts = compile_source(source, &mut diags)
            .map_err(|source| LoadError::Io { path: PathBuf::from(file_name), source })?;
        for script in scripts {
            self.register(script, catalog, &mut diags);
        }
        Ok(diags.into_vec())
    }

    /// Compile and register one script file.
    pub fn load_file(&mut self, path: &Path, catalog: &SignalTypeCatalog) -> Result<Vec<Diagnostic>, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io { path: path.to_owned(), source })?;
        let name = path.display().to_string();
        self.load_source(&name, BufReader::new(file), catalog)
    }

    /// Load `files` (resolved against `route_dir` when relative) in order.
    ///
    /// A file that cannot be read is reported as an I/O diagnostic and the
    /// remaining files are still loaded.
    pub fn load<P: AsRef<Path>>(route_dir: &Path, files: &[P], catalog: &SignalTypeCatalog) -> (Self, Vec<Diagnostic>) {
        let mut registry = Self::new();
        let mut all = Vec::new();

        for file in files {
            let path = route_dir.join(file.as_ref());
            match registry.load_file(&path, catalog) {
                Ok(diags) => all.extend(diags),
                Err(err) => {
                    let mut diags = Diagnostics::new(path.display().to_string());
                    diags.push(DiagnosticKind::Io, 0, "", err.to_string());
                    all.extend(diags.into_vec());
                }
            }
        }

        tracing::info!(scripts = registry.len(), diagnostics = all.len(), "script load complete");
        (registry, all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SignalTypeCatalog {
        ["UKHome", "UKDist", "Shunt"].into_iter().collect()
    }

    #[test]
    fn registers_known_types_case_insensitively() {
        let mut reg = ScriptRegistry::new();
        let diags = reg
            .load_source("a.dat", "SCRIPT ukhome\nstate = 0;\nSCRIPT UKDIST\nstate = 1;\n".as_bytes(), &catalog())
            .unwrap();
        assert!(diags.is_empty());
        assert_eq!(reg.len(), 2);
        assert!(reg.contains("UKHome"));
        assert_eq!(reg.get("ukdist").map(|s| s.name.as_str()), Some("UKDIST"));
    }

    #[test]
    fn unknown_type_is_skipped_and_later_scripts_compile() {
        let mut reg = ScriptRegistry::new();
        let diags = reg
            .load_source("a.dat", "SCRIPT Nowhere\nstate = 0;\nSCRIPT Shunt\nstate = 1;\n".as_bytes(), &catalog())
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Registration);
        assert_eq!(diags[0].line, 1);
        assert!(reg.contains("shunt"));
        assert!(!reg.contains("nowhere"));
    }

    #[test]
    fn first_duplicate_wins() {
        let mut reg = ScriptRegistry::new();
        let diags = reg
            .load_source("a.dat", "SCRIPT UKHome\ndraw_state = 1;\nSCRIPT ukhome\ndraw_state = 2;\n".as_bytes(), &catalog())
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("duplicate"));
        assert_eq!(reg.get("UKHome").map(|s| s.line), Some(1));
    }

    #[test]
    fn undecodable_bytes_do_not_drop_the_file() {
        let mut reg = ScriptRegistry::new();
        let src: &[u8] = b"SCRIPT UKHome\nstate = 1;\n// caf\xe9 comment\nSCRIPT Shunt\nstate = 2;\n";
        let diags = reg.load_source("x.dat", src, &catalog()).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn missing_file_is_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sigscr.dat"), "SCRIPT UKHome\nstate = 0;\n").unwrap();

        let (reg, diags) = ScriptRegistry::load(dir.path(), &["missing.dat", "sigscr.dat"], &catalog());
        assert_eq!(reg.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Io);
        assert!(diags[0].file.ends_with("missing.dat"));
    }

    #[test]
    fn duplicates_across_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dat"), "SCRIPT UKHome\nstate = 1;\n").unwrap();
        std::fs::write(dir.path().join("b.dat"), "SCRIPT UKHome\nstate = 2;\nSCRIPT UKDist\nstate = 3;\n").unwrap();

        let (reg, diags) = ScriptRegistry::load(dir.path(), &["a.dat", "b.dat"], &catalog());
        assert_eq!(reg.len(), 2);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].file.ends_with("b.dat"));
    }
}
