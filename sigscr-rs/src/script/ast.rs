//! Compiled representation of a signal script.
//!
//! A [`Script`] is built once per signal type and never mutated afterwards.
//! Statements hold their arithmetic as a flat [`Term`] chain: every term
//! carries the sublevel it belongs to, and a [`TermKind::Sublevel`] marker in
//! a parent chain stands for the reduced value of the nested chain with that
//! id.  Level `0` is the top of the statement.

use super::catalog::{ExternalVar, Function, Namespace};

// ── Script ────────────────────────────────────────────────────────────────────

/// One compiled script, shared by every signal of its type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    /// Signal type name as written after `SCRIPT`.
    pub name: String,
    /// Line of the `SCRIPT` marker.
    pub line: usize,
    /// Local variable names, indexed by slot.
    pub locals: Vec<String>,
    pub stmts: Vec<Stmt>,
}

impl Script {
    /// Slot of a local variable, if declared.
    pub fn local_index(&self, name: &str) -> Option<usize> {
        self.locals.iter().position(|l| l == name)
    }
}

/// A top-level or nested entry in a script body.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(Statement),
    If(ConditionBlock),
}

// ── Statements and terms ──────────────────────────────────────────────────────

/// Where a statement's result goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    External(ExternalVar),
    Local(usize),
    /// Call-only statement; the result is discarded.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: Target,
    pub terms: Vec<Term>,
    /// Source line the statement started on.
    pub line: usize,
}

/// Operator combining a term with the running value of its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Op {
    /// First term of a chain: replaces the running value.
    #[default]
    None,
    Minus,
    Plus,
    Multiply,
    Divide,
    Modulo,
}

impl Op {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Self::Minus),
            '+' => Some(Self::Plus),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            '%' => Some(Self::Modulo),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Minus => "-",
            Self::Plus => "+",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub negate: bool,
    pub op: Op,
    /// Sublevel this term belongs to.
    pub level: u32,
    pub kind: TermKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Atom(Atom),
    /// Aborts the whole script when reached.
    Return,
    /// Stands for the value of the chain at the given level.
    Sublevel(u32),
}

/// A single value-producing element: an operand or a function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Operand(Operand),
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub function: Function,
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Constant(i32),
    Local(usize),
    External(ExternalVar),
    Named(Namespace, i32),
}

// ── Conditions ────────────────────────────────────────────────────────────────

/// An `IF` with its `ELSEIF` arms and optional `ELSE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBlock {
    pub condition: Vec<CondItem>,
    pub if_body: Vec<Stmt>,
    pub else_ifs: Vec<(Vec<CondItem>, Vec<Stmt>)>,
    pub else_body: Option<Vec<Stmt>>,
}

/// One element of a condition list, folded strictly left to right.
#[derive(Debug, Clone, PartialEq)]
pub enum CondItem {
    Cond(Condition),
    Join(Join),
    /// Inverts the next leaf or group only.
    Negate,
    Group(Vec<CondItem>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    pub fn apply(self, left: i32, right: i32) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Eq => left == right,
            Self::Ne => left != right,
        }
    }
}

/// Atomic comparison.  Without a comparator it tests `left != 0`.
///
/// The negate flags record what was written.  Only `negate_left` on a bare
/// operand changes the result.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Atom,
    pub negate_left: bool,
    pub cmp: Option<Comparator>,
    pub right: Option<Atom>,
    pub negate_right: bool,
}
