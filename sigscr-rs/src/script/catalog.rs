//! Static name tables for the signal script language.
//!
//! Everything a script can name outside its own `FLOAT` locals resolves
//! through here at compile time: the four external variables, the function
//! catalog (with argument counts), and the four enumerated constant
//! namespaces (`BLOCK_*`, `SIGASP_*`, `SIGFN_*`, `SIGFEAT_*`).

// ── External variables ────────────────────────────────────────────────────────

/// A named value owned by the host signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalVar {
    State,
    DrawState,
    Enabled,
    BlockState,
}

impl ExternalVar {
    pub const ALL: [ExternalVar; 4] = [
        ExternalVar::State,
        ExternalVar::DrawState,
        ExternalVar::Enabled,
        ExternalVar::BlockState,
    ];

    /// Look up an (already uppercased) name.
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "STATE" => Some(Self::State),
            "DRAW_STATE" => Some(Self::DrawState),
            "ENABLED" => Some(Self::Enabled),
            "BLOCK_STATE" => Some(Self::BlockState),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::State => "STATE",
            Self::DrawState => "DRAW_STATE",
            Self::Enabled => "ENABLED",
            Self::BlockState => "BLOCK_STATE",
        }
    }

    /// Only `STATE` and `DRAW_STATE` accept assignment.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::State | Self::DrawState)
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// A query function supplied by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    BlockState,
    RouteSet,
    NextSigLr,
    NextSigMr,
    ThisSigLr,
    ThisSigMr,
    OppSigLr,
    OppSigMr,
    DistMultiSigMr,
    SigFeature,
    DefDrawState,
    DebugHeader,
    DebugOut,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "BLOCK_STATE" => Self::BlockState,
            "ROUTE_SET" => Self::RouteSet,
            "NEXT_SIG_LR" => Self::NextSigLr,
            "NEXT_SIG_MR" => Self::NextSigMr,
            "THIS_SIG_LR" => Self::ThisSigLr,
            "THIS_SIG_MR" => Self::ThisSigMr,
            "OPP_SIG_LR" => Self::OppSigLr,
            "OPP_SIG_MR" => Self::OppSigMr,
            "DIST_MULTI_SIG_MR" => Self::DistMultiSigMr,
            "SIG_FEATURE" => Self::SigFeature,
            "DEF_DRAW_STATE" => Self::DefDrawState,
            "DEBUG_HEADER" => Self::DebugHeader,
            "DEBUG_OUT" => Self::DebugOut,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BlockState => "BLOCK_STATE",
            Self::RouteSet => "ROUTE_SET",
            Self::NextSigLr => "NEXT_SIG_LR",
            Self::NextSigMr => "NEXT_SIG_MR",
            Self::ThisSigLr => "THIS_SIG_LR",
            Self::ThisSigMr => "THIS_SIG_MR",
            Self::OppSigLr => "OPP_SIG_LR",
            Self::OppSigMr => "OPP_SIG_MR",
            Self::DistMultiSigMr => "DIST_MULTI_SIG_MR",
            Self::SigFeature => "SIG_FEATURE",
            Self::DefDrawState => "DEF_DRAW_STATE",
            Self::DebugHeader => "DEBUG_HEADER",
            Self::DebugOut => "DEBUG_OUT",
        }
    }

    /// Number of arguments the function takes.
    pub fn arity(self) -> usize {
        match self {
            Self::BlockState | Self::RouteSet | Self::DebugHeader | Self::DebugOut => 0,
            Self::DistMultiSigMr => 2,
            _ => 1,
        }
    }
}

// ── Enumerated constants ──────────────────────────────────────────────────────

/// The prefix family a named constant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Block,
    Aspect,
    SignalFunction,
    Feature,
}

const BLOCK_STATES: &[&str] = &["CLEAR", "OCCUPIED", "JN_OBSTRUCTED"];

const ASPECTS: &[&str] = &[
    "STOP",
    "STOP_AND_PROCEED",
    "RESTRICTING",
    "APPROACH_1",
    "APPROACH_2",
    "APPROACH_3",
    "CLEAR_1",
    "CLEAR_2",
    "UNKNOWN",
];

const SIGNAL_FUNCTIONS: &[&str] = &["NORMAL", "DISTANCE", "REPEATER", "SHUNTING", "INFO", "UNKNOWN"];

const FEATURES: &[&str] = &[
    "DECOR",
    "SIGNAL_HEAD",
    "DUMMY1",
    "DUMMY2",
    "NUMBER_PLATE",
    "GRADIENT_PLATE",
    "USER1",
    "USER2",
    "USER3",
    "USER4",
];

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Block,
        Namespace::Aspect,
        Namespace::SignalFunction,
        Namespace::Feature,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Block => "BLOCK_",
            Self::Aspect => "SIGASP_",
            Self::SignalFunction => "SIGFN_",
            Self::Feature => "SIGFEAT_",
        }
    }

    fn members(self) -> &'static [&'static str] {
        match self {
            Self::Block => BLOCK_STATES,
            Self::Aspect => ASPECTS,
            Self::SignalFunction => SIGNAL_FUNCTIONS,
            Self::Feature => FEATURES,
        }
    }

    /// Resolve a full token such as `SIGASP_CLEAR_2` to its namespace and
    /// value.
    pub fn resolve(token: &str) -> Option<(Self, i32)> {
        Self::ALL.into_iter().find_map(|ns| {
            let member = token.strip_prefix(ns.prefix())?;
            let idx = ns.members().iter().position(|m| *m == member)?;
            Some((ns, idx as i32))
        })
    }

    /// The member name for `value`, if it is in range.
    pub fn member_name(self, value: i32) -> Option<&'static str> {
        usize::try_from(value).ok().and_then(|i| self.members().get(i).copied())
    }
}

// ── Well-known values used by the host glue ───────────────────────────────────

pub mod block {
    pub const CLEAR: i32 = 0;
    pub const OCCUPIED: i32 = 1;
    pub const JN_OBSTRUCTED: i32 = 2;
}

pub mod aspect {
    pub const STOP: i32 = 0;
    pub const STOP_AND_PROCEED: i32 = 1;
    pub const RESTRICTING: i32 = 2;
    pub const APPROACH_1: i32 = 3;
    pub const APPROACH_2: i32 = 4;
    pub const APPROACH_3: i32 = 5;
    pub const CLEAR_1: i32 = 6;
    pub const CLEAR_2: i32 = 7;
    pub const UNKNOWN: i32 = 8;
}

pub mod sigfn {
    pub const NORMAL: i32 = 0;
    pub const DISTANCE: i32 = 1;
    pub const REPEATER: i32 = 2;
    pub const SHUNTING: i32 = 3;
    pub const INFO: i32 = 4;
}
