//! Signal configuration file parser.
//!
//! Lists the signal types a route defines and the script files to compile
//! for them:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/routedir <dir>` | directory script files are resolved against |
//! | `/signaltype <name> …` | register one or more signal type names |
//! | `/scriptfile <file> …` | add script files, loaded in order |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |

use std::path::{Path, PathBuf};

use crate::signal::SignalTypeCatalog;

/// File name looked up by [`find_config`].
pub const CONFIG_FILE_NAME: &str = "sigcfg.tf";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parsed signal configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub route_dir: Option<PathBuf>,
    pub signal_types: Vec<String>,
    pub script_files: Vec<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and a list of any errors on recognised lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let args = split_args(args_str.trim());

            let result = match cmd.to_ascii_lowercase().as_str() {
                "routedir" => config.parse_routedir(&args),
                "signaltype" => config.parse_signaltype(&args),
                "scriptfile" => config.parse_scriptfile(&args),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// The declared signal types as a lookup catalog.
    pub fn catalog(&self) -> SignalTypeCatalog {
        self.signal_types.iter().collect()
    }

    /// Directory script files are resolved against; the current directory
    /// when unset.
    pub fn route_dir(&self) -> &Path {
        self.route_dir.as_deref().unwrap_or_else(|| Path::new("."))
    }

    fn parse_routedir(&mut self, args: &[String]) -> Result<(), String> {
        match args {
            [dir] => {
                self.route_dir = Some(PathBuf::from(dir));
                Ok(())
            }
            [] => Err("/routedir requires a directory".to_owned()),
            _ => Err(format!("/routedir takes one directory, got {}", args.len())),
        }
    }

    fn parse_signaltype(&mut self, args: &[String]) -> Result<(), String> {
        if args.is_empty() {
            return Err("/signaltype requires at least one name".to_owned());
        }
        self.signal_types.extend(args.iter().cloned());
        Ok(())
    }

    fn parse_scriptfile(&mut self, args: &[String]) -> Result<(), String> {
        if args.is_empty() {
            return Err("/scriptfile requires a file name".to_owned());
        }
        self.script_files.extend(args.iter().map(PathBuf::from));
        Ok(())
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                }
                quoted = false;
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Search for the config file: the current directory first, then the
/// platform config directory.  Returns the first path that exists.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    directories::ProjectDirs::from("", "", "sigscr")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}
