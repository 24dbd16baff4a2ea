//! Host-side glue: the signal-type catalog, the per-tick update entry point
//! and an in-memory [`SignalEnv`].

use std::collections::BTreeMap;

use crate::loader::ScriptRegistry;
use crate::script::catalog::{aspect, block};
use crate::script::interp::{run, ControlFlow, SignalEnv};

// ── Signal types ──────────────────────────────────────────────────────────────

/// Known signal type names.  Lookups ignore case and surrounding blanks.
#[derive(Debug, Clone, Default)]
pub struct SignalTypeCatalog {
    by_key: BTreeMap<String, String>,
}

impl SignalTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Add a type.  Returns `false` if it was already known.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let key = Self::key(name);
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key, name.to_owned());
        true
    }

    /// Canonical spelling of `name`, if known.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_key.get(&Self::key(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_key.values().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SignalTypeCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut cat = Self::new();
        for name in iter {
            cat.insert(name.as_ref());
        }
        cat
    }
}

// ── Update ────────────────────────────────────────────────────────────────────

/// What [`update_signal`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// The type's script ran.
    Script(ControlFlow),
    /// No script for the type; the built-in block rule was applied.
    Fallback,
}

/// Evaluate the state of one signal for this tick.
///
/// Uses the compiled script for `signal_type` when there is one.  Otherwise
/// a clear block shows the least restrictive aspect and anything else the
/// most restrictive.
pub fn update_signal(registry: &ScriptRegistry, signal_type: &str, env: &mut dyn SignalEnv) -> Update {
    match registry.get(signal_type) {
        Some(script) => Update::Script(run(script, env)),
        None => {
            if env.block_state() == block::CLEAR {
                env.set_least_restrictive_aspect();
            } else {
                env.set_most_restrictive_aspect();
            }
            Update::Fallback
        }
    }
}

// ── Fixed bindings ────────────────────────────────────────────────────────────

const SIGFN_COUNT: usize = 5;
const FEATURE_COUNT: usize = 10;

/// A signal whose surroundings are fixed values.  Used by the command-line
/// evaluator and tests.
///
/// Per-function arrays are indexed by `SIGFN_*` value; out-of-range indices
/// read as `SIGASP_STOP` (or "no head" for [`SignalEnv::this_sig_lr`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedSignal {
    pub state: i32,
    pub draw_state: i32,
    pub enabled: bool,
    pub block_state: i32,
    pub route_set: bool,
    /// Aspect of the next signal ahead, per signal function.
    pub next_sig: [i32; SIGFN_COUNT],
    /// Aspect of this signal's own head, per signal function.
    pub this_sig: [Option<i32>; SIGFN_COUNT],
    /// Aspect of the next signal facing the other way.
    pub opp_sig: [i32; SIGFN_COUNT],
    pub features: [bool; FEATURE_COUNT],
    /// Aspect to draw state mapping; unmapped aspects give `-1`.
    pub draw_states: BTreeMap<i32, i32>,
}

fn by_sigfn<T: Copy>(table: &[T; SIGFN_COUNT], sigfn: i32, missing: T) -> T {
    usize::try_from(sigfn).ok().and_then(|i| table.get(i).copied()).unwrap_or(missing)
}

impl SignalEnv for FixedSignal {
    fn state(&self) -> i32 {
        self.state
    }

    fn set_state(&mut self, aspect: i32) {
        self.state = aspect;
    }

    fn draw_state(&self) -> i32 {
        self.draw_state
    }

    fn set_draw_state(&mut self, draw_state: i32) {
        self.draw_state = draw_state;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn block_state(&self) -> i32 {
        self.block_state
    }

    fn route_set(&self) -> bool {
        self.route_set
    }

    fn next_sig_lr(&self, sigfn: i32) -> i32 {
        by_sigfn(&self.next_sig, sigfn, aspect::STOP)
    }

    fn next_sig_mr(&self, sigfn: i32) -> i32 {
        by_sigfn(&self.next_sig, sigfn, aspect::STOP)
    }

    fn this_sig_lr(&self, sigfn: i32) -> Option<i32> {
        by_sigfn(&self.this_sig, sigfn, None)
    }

    fn this_sig_mr(&self, sigfn: i32) -> Option<i32> {
        by_sigfn(&self.this_sig, sigfn, None)
    }

    fn opp_sig_lr(&self, sigfn: i32) -> i32 {
        by_sigfn(&self.opp_sig, sigfn, aspect::STOP)
    }

    fn opp_sig_mr(&self, sigfn: i32) -> i32 {
        by_sigfn(&self.opp_sig, sigfn, aspect::STOP)
    }

    fn dist_multi_sig_mr(&self, sigfn1: i32, _sigfn2: i32) -> i32 {
        by_sigfn(&self.next_sig, sigfn1, aspect::STOP)
    }

    fn sig_feature(&self, feature: i32) -> bool {
        usize::try_from(feature).ok().and_then(|i| self.features.get(i).copied()).unwrap_or(false)
    }

    fn def_draw_state(&self, aspect: i32) -> i32 {
        self.draw_states.get(&aspect).copied().unwrap_or(-1)
    }
}
