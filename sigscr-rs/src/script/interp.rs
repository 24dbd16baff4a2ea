//! Signal script interpreter.
//!
//! The [`Interpreter`] walks a compiled [`Script`] against a
//! [`SignalEnv`], the host's view of one signal.  Each run gets a fresh,
//! zeroed local-variable array; nothing in the script itself is mutated, so a
//! single `Arc<Script>` can serve every signal of its type.

use super::ast::{Atom, Call, CondItem, Condition, ConditionBlock, Join, Op, Operand, Script, Statement, Stmt, Target, Term, TermKind};
use super::catalog::{aspect, ExternalVar, Function};

// ── Environment ───────────────────────────────────────────────────────────────

/// Bindings a signal exposes to its script.  All values are the integer
/// codes used by the script language (see [`super::catalog`]).
pub trait SignalEnv {
    fn state(&self) -> i32;
    fn set_state(&mut self, aspect: i32);
    fn draw_state(&self) -> i32;
    fn set_draw_state(&mut self, draw_state: i32);
    fn enabled(&self) -> bool;
    fn block_state(&self) -> i32;
    fn route_set(&self) -> bool;

    /// Least restrictive aspect of the next signal of type `sigfn`.
    fn next_sig_lr(&self, sigfn: i32) -> i32;
    fn next_sig_mr(&self, sigfn: i32) -> i32;
    /// Aspect of this signal's own head of type `sigfn`, `None` if it has
    /// no such head.
    fn this_sig_lr(&self, sigfn: i32) -> Option<i32>;
    fn this_sig_mr(&self, sigfn: i32) -> Option<i32>;
    fn opp_sig_lr(&self, sigfn: i32) -> i32;
    fn opp_sig_mr(&self, sigfn: i32) -> i32;
    /// Most restrictive aspect over the run of `sigfn1` signals up to the
    /// next `sigfn2` signal.
    fn dist_multi_sig_mr(&self, sigfn1: i32, sigfn2: i32) -> i32;
    fn sig_feature(&self, feature: i32) -> bool;
    /// Default draw state for an aspect.
    fn def_draw_state(&self, aspect: i32) -> i32;

    fn set_least_restrictive_aspect(&mut self) {
        self.set_state(aspect::CLEAR_2);
    }

    fn set_most_restrictive_aspect(&mut self) {
        self.set_state(aspect::STOP);
    }
}

// ── Control flow ──────────────────────────────────────────────────────────────

/// How a block finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    /// A `RETURN` was reached; the script stops.
    Return,
}

/// Raised inside expression evaluation when a `RETURN` term is reached.
struct Returned;

type Eval<T> = Result<T, Returned>;

fn flip(v: i32) -> i32 {
    if v == 0 { 1 } else { 0 }
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter<'s> {
    script: &'s Script,
    locals: Vec<i32>,
}

impl<'s> Interpreter<'s> {
    pub fn new(script: &'s Script) -> Self {
        Self { script, locals: vec![0; script.locals.len()] }
    }

    /// Local variable values after (or during) a run.
    pub fn locals(&self) -> &[i32] {
        &self.locals
    }

    /// Run the whole script once.
    pub fn exec(&mut self, env: &mut dyn SignalEnv) -> ControlFlow {
        tracing::trace!(script = %self.script.name, "run");
        let script = self.script;
        let flow = self.exec_block(&script.stmts, env);
        if flow == ControlFlow::Return {
            tracing::trace!(script = %self.script.name, "returned early");
        }
        flow
    }

    fn exec_block(&mut self, stmts: &'s [Stmt], env: &mut dyn SignalEnv) -> ControlFlow {
        for stmt in stmts {
            let flow = match stmt {
                Stmt::Assign(s) => self.exec_statement(s, env),
                Stmt::If(b) => self.exec_if(b, env),
            };
            if flow == ControlFlow::Return {
                return ControlFlow::Return;
            }
        }
        ControlFlow::Continue
    }

    fn exec_statement(&mut self, stmt: &Statement, env: &mut dyn SignalEnv) -> ControlFlow {
        let Ok(value) = self.eval_chain(&stmt.terms, 0, env) else {
            return ControlFlow::Return;
        };
        match stmt.target {
            Target::External(var) if !var.is_writable() => {
                tracing::trace!(var = var.name(), line = stmt.line, "ignored write to read-only variable");
            }
            Target::External(ExternalVar::DrawState) => env.set_draw_state(value),
            Target::External(_) => env.set_state(value),
            Target::Local(idx) => {
                if let Some(slot) = self.locals.get_mut(idx) {
                    *slot = value;
                }
            }
            Target::None => {}
        }
        ControlFlow::Continue
    }

    fn exec_if(&mut self, block: &'s ConditionBlock, env: &mut dyn SignalEnv) -> ControlFlow {
        if self.eval_condition(&block.condition, env) {
            return self.exec_block(&block.if_body, env);
        }
        for (cond, body) in &block.else_ifs {
            if self.eval_condition(cond, env) {
                return self.exec_block(body, env);
            }
        }
        match &block.else_body {
            Some(body) => self.exec_block(body, env),
            None => ControlFlow::Continue,
        }
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    /// Fold the terms of one sublevel left to right, no precedence.
    fn eval_chain(&self, terms: &[Term], level: u32, env: &dyn SignalEnv) -> Eval<i32> {
        let mut total = 0i32;
        for term in terms.iter().filter(|t| t.level == level) {
            let mut value = match &term.kind {
                TermKind::Return => return Err(Returned),
                TermKind::Sublevel(id) => self.eval_chain(terms, *id, env)?,
                TermKind::Atom(atom) => self.eval_atom(atom, env),
            };
            if term.negate {
                value = flip(value);
            }
            total = match term.op {
                Op::None => value,
                Op::Plus => total.wrapping_add(value),
                Op::Minus => total.wrapping_sub(value),
                Op::Multiply => total.wrapping_mul(value),
                Op::Divide => total.checked_div(value).unwrap_or(0),
                Op::Modulo => total.checked_rem(value).unwrap_or(0),
            };
        }
        Ok(total)
    }

    fn eval_atom(&self, atom: &Atom, env: &dyn SignalEnv) -> i32 {
        match atom {
            Atom::Operand(op) => self.eval_operand(op, env),
            Atom::Call(call) => self.eval_call(call, env),
        }
    }

    fn eval_operand(&self, operand: &Operand, env: &dyn SignalEnv) -> i32 {
        match *operand {
            Operand::Constant(v) | Operand::Named(_, v) => v,
            Operand::Local(idx) => self.locals.get(idx).copied().unwrap_or(0),
            Operand::External(ExternalVar::State) => env.state(),
            Operand::External(ExternalVar::DrawState) => env.draw_state(),
            Operand::External(ExternalVar::Enabled) => i32::from(env.enabled()),
            Operand::External(ExternalVar::BlockState) => env.block_state(),
        }
    }

    fn eval_call(&self, call: &Call, env: &dyn SignalEnv) -> i32 {
        let arg = |i: usize| call.args.get(i).map_or(0, |a| self.eval_operand(a, env));
        let (p1, p2) = (arg(0), arg(1));

        let value = match call.function {
            Function::BlockState => env.block_state(),
            Function::RouteSet => i32::from(env.route_set()),
            Function::NextSigLr => env.next_sig_lr(p1),
            Function::NextSigMr => env.next_sig_mr(p1),
            Function::ThisSigLr => env.this_sig_lr(p1).unwrap_or(-1),
            Function::ThisSigMr => env.this_sig_mr(p1).unwrap_or(-1),
            Function::OppSigLr => env.opp_sig_lr(p1),
            Function::OppSigMr => env.opp_sig_mr(p1),
            Function::DistMultiSigMr => env.dist_multi_sig_mr(p1, p2),
            Function::SigFeature => i32::from(env.sig_feature(p1)),
            Function::DefDrawState => env.def_draw_state(p1),
            Function::DebugHeader => {
                tracing::debug!(script = %self.script.name, "debug header");
                0
            }
            Function::DebugOut => {
                tracing::debug!(script = %self.script.name, locals = ?self.locals, "debug out");
                0
            }
        };
        tracing::trace!(function = call.function.name(), p1, p2, value, "function result");
        value
    }

    // ── Conditions ────────────────────────────────────────────────────────────

    /// Strict left fold: `A OR B AND C` is `(A OR B) AND C`.  An empty list
    /// (a condition that failed to parse) is false.
    fn eval_condition(&self, items: &[CondItem], env: &dyn SignalEnv) -> bool {
        let mut result = false;
        let mut join: Option<Join> = None;
        let mut negate = false;

        for item in items {
            let value = match item {
                CondItem::Negate => {
                    negate = true;
                    continue;
                }
                CondItem::Join(j) => {
                    join = Some(*j);
                    continue;
                }
                CondItem::Cond(c) => self.eval_single(c, env),
                CondItem::Group(sub) => self.eval_condition(sub, env),
            };
            let value = value != std::mem::take(&mut negate);
            result = match join {
                Some(Join::And) => result && value,
                Some(Join::Or) => result || value,
                None => value,
            };
        }
        result
    }

    /// Side negation only applies to a bare operand; in a comparison both
    /// sides are compared as written.
    fn eval_single(&self, cond: &Condition, env: &dyn SignalEnv) -> bool {
        let left = self.eval_atom(&cond.left, env);

        let outcome = match (cond.cmp, &cond.right) {
            (Some(cmp), Some(right)) => cmp.apply(left, self.eval_atom(right, env)),
            _ if cond.negate_left => flip(left) != 0,
            _ => left != 0,
        };
        tracing::trace!(?cond.cmp, left, outcome, "condition");
        outcome
    }
}

/// Run `script` once against `env` with fresh locals.
pub fn run(script: &Script, env: &mut dyn SignalEnv) -> ControlFlow {
    Interpreter::new(script).exec(env)
}
