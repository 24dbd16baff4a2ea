//! Command-line argument parsing.
//!
//! Usage:
//!   sigscr [-c <config>] [-r <dir>] [-t <type>]... [--dump] [<files>...]
//!   sigscr ... --eval <type> [--block-state <v>] [--next <fn=aspect>]...

use std::path::PathBuf;

use clap::Parser;

use crate::script::catalog::{sigfn, Namespace};
use crate::signal::FixedSignal;

// ── Public types ──────────────────────────────────────────────────────────────

/// Compile signal scripts, report diagnostics and optionally evaluate one
/// signal type against fixed surroundings.
#[derive(Debug, Parser)]
#[command(name = "sigscr")]
#[command(version)]
pub struct Cli {
    /// Signal configuration file (default: ./sigcfg.tf, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Route directory script files are resolved against
    #[arg(short, long = "route")]
    pub route_dir: Option<PathBuf>,

    /// Additional signal type name (repeatable)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub signal_types: Vec<String>,

    /// Print the compiled form of every registered script
    #[arg(long)]
    pub dump: bool,

    /// Evaluate the script for this signal type and print STATE and DRAW_STATE
    #[arg(long, value_name = "TYPE")]
    pub eval: Option<String>,

    /// Log registration and evaluation detail
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub bindings: Bindings,

    /// Script files, loaded after those named in the config
    pub files: Vec<PathBuf>,
}

/// Fixed surroundings for `--eval`.
///
/// Values accept either a number or a name from the script language, with or
/// without its prefix: `--block-state occupied`, `--next normal=clear_2`.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Bindings {
    /// Initial STATE
    #[arg(long, value_name = "ASPECT", value_parser = aspect_value)]
    pub state: Option<i32>,

    /// Initial DRAW_STATE
    #[arg(long, value_name = "N")]
    pub draw_state: Option<i32>,

    /// Signal is enabled by the dispatcher
    #[arg(long)]
    pub enabled: bool,

    /// Block state ahead of the signal
    #[arg(long, value_name = "BLOCK", value_parser = block_value)]
    pub block_state: Option<i32>,

    /// Route ahead is set
    #[arg(long)]
    pub route_set: bool,

    /// Aspect of the next signal ahead for a signal function
    #[arg(long = "next", value_name = "FN=ASPECT", value_parser = sigfn_aspect)]
    pub next: Vec<(i32, i32)>,

    /// Aspect of this signal's own head for a signal function
    #[arg(long = "this", value_name = "FN=ASPECT", value_parser = sigfn_aspect)]
    pub this: Vec<(i32, i32)>,

    /// Aspect of the next opposing signal for a signal function
    #[arg(long = "opp", value_name = "FN=ASPECT", value_parser = sigfn_aspect)]
    pub opp: Vec<(i32, i32)>,

    /// Optional signal feature present on the shape
    #[arg(long = "feature", value_name = "FEATURE", value_parser = feature_value)]
    pub features: Vec<i32>,

    /// Draw state the shape defines for an aspect
    #[arg(long = "draw", value_name = "ASPECT=N", value_parser = aspect_draw_state)]
    pub draw_states: Vec<(i32, i32)>,
}

impl Bindings {
    /// Build the signal these bindings describe.
    pub fn signal(&self) -> FixedSignal {
        let mut sig = FixedSignal {
            enabled: self.enabled,
            route_set: self.route_set,
            ..FixedSignal::default()
        };
        if let Some(state) = self.state {
            sig.state = state;
        }
        if let Some(draw_state) = self.draw_state {
            sig.draw_state = draw_state;
        }
        if let Some(block_state) = self.block_state {
            sig.block_state = block_state;
        }
        // Parsers guarantee in-range signal function and feature indices.
        for &(func, aspect) in &self.next {
            sig.next_sig[func as usize] = aspect;
        }
        for &(func, aspect) in &self.this {
            sig.this_sig[func as usize] = Some(aspect);
        }
        for &(func, aspect) in &self.opp {
            sig.opp_sig[func as usize] = aspect;
        }
        for &feature in &self.features {
            sig.features[feature as usize] = true;
        }
        sig.draw_states.extend(self.draw_states.iter().copied());
        sig
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a slice of argument strings, without the program name (exposed for
/// testing).
pub fn parse_argv(argv: &[String]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("sigscr").chain(argv.iter().map(String::as_str)))
}

/// A number, or a member of `ns` by name with or without the namespace prefix.
fn named_value(ns: Namespace, s: &str) -> Result<i32, String> {
    let s = s.trim();
    let value = match s.parse::<i32>() {
        Ok(n) => n,
        Err(_) => {
            let upper = s.to_ascii_uppercase();
            let token = if upper.starts_with(ns.prefix()) {
                upper
            } else {
                format!("{}{upper}", ns.prefix())
            };
            match Namespace::resolve(&token) {
                Some((found, value)) if found == ns => value,
                _ => return Err(format!("unknown {}* name `{s}`", ns.prefix())),
            }
        }
    };
    if ns.member_name(value).is_none() {
        return Err(format!("{value} is out of range for {}*", ns.prefix()));
    }
    Ok(value)
}

fn aspect_value(s: &str) -> Result<i32, String> {
    named_value(Namespace::Aspect, s)
}

fn block_value(s: &str) -> Result<i32, String> {
    named_value(Namespace::Block, s)
}

fn feature_value(s: &str) -> Result<i32, String> {
    named_value(Namespace::Feature, s)
}

fn sigfn_aspect(s: &str) -> Result<(i32, i32), String> {
    let (func, aspect) = s.split_once('=').ok_or_else(|| format!("expected FN=ASPECT, got `{s}`"))?;
    let func = named_value(Namespace::SignalFunction, func)?;
    if func > sigfn::INFO {
        return Err("SIGFN_UNKNOWN cannot be bound".to_owned());
    }
    Ok((func, aspect_value(aspect)?))
}

fn aspect_draw_state(s: &str) -> Result<(i32, i32), String> {
    let (aspect, n) = s.split_once('=').ok_or_else(|| format!("expected ASPECT=N, got `{s}`"))?;
    let n = n.trim().parse::<i32>().map_err(|e| format!("draw state `{n}`: {e}"))?;
    Ok((aspect_value(aspect)?, n))
}
