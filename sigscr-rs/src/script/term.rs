//! Statement and term parsing.
//!
//! A statement's text (already isolated by the block structurer) becomes an
//! optional assignment [`Target`] and a flat, leveled [`Term`] chain.  Terms
//! are split at the arithmetic operators `- + * / %`; a parenthesized group
//! that is not a function call opens a new sublevel, recorded as a
//! [`TermKind::Sublevel`] marker in the enclosing chain.

use super::ast::{Atom, Call, Op, Operand, Statement, Target, Term, TermKind};
use super::catalog::{ExternalVar, Function, Namespace};
use crate::diag::ScriptDiag;

/// Name resolution state shared by the statement and condition parsers.
pub struct Scope<'s, 'd> {
    pub locals: &'s [String],
    pub diag: &'s mut ScriptDiag<'d>,
    pub line: usize,
}

impl Scope<'_, '_> {
    fn local(&self, name: &str) -> Option<usize> {
        self.locals.iter().position(|l| l == name)
    }
}

fn is_operator(c: char) -> bool {
    Op::from_char(c).is_some()
}

// ── Operands and calls ────────────────────────────────────────────────────────

/// Resolve a single operand token.  Unknown names are reported and read as
/// zero.
pub fn resolve_operand(token: &str, scope: &mut Scope<'_, '_>) -> Operand {
    let token = token.strip_prefix('#').unwrap_or(token).trim();

    if let Ok(n) = token.parse::<i32>() {
        return Operand::Constant(n);
    }
    if let Some(v) = ExternalVar::lookup(token) {
        return Operand::External(v);
    }
    if let Some(idx) = scope.local(token) {
        return Operand::Local(idx);
    }
    if let Some((ns, value)) = Namespace::resolve(token) {
        return Operand::Named(ns, value);
    }

    let what = Namespace::ALL
        .into_iter()
        .find(|ns| token.starts_with(ns.prefix()))
        .map_or("parameter", |ns| match ns {
            Namespace::Block => "block state",
            Namespace::Aspect => "aspect",
            Namespace::SignalFunction => "signal function",
            Namespace::Feature => "signal feature",
        });
    scope.diag.resolution(scope.line, format!("unknown {what} '{token}'"));
    Operand::Constant(0)
}

/// Parse `NAME(arg[,arg])`.  Returns `None` (after reporting) when the call
/// cannot be resolved.
pub fn parse_call(token: &str, scope: &mut Scope<'_, '_>) -> Option<Call> {
    let (name, rest) = token.split_once('(')?;
    let name = name.trim();

    if rest.contains('(') {
        scope.diag.resolution(scope.line, format!("unexpected '(' in function call '{token}'"));
        return None;
    }
    let Some(function) = Function::lookup(name) else {
        scope.diag.resolution(scope.line, format!("unknown function '{name}'"));
        return None;
    };

    let params = rest.replace(')', "");
    let params = params.trim();
    let args: Vec<Operand> = if params.is_empty() {
        Vec::new()
    } else {
        params.split(',').map(|p| resolve_operand(p.trim(), scope)).collect()
    };

    if args.len() != function.arity() {
        scope.diag.resolution(
            scope.line,
            format!("{} expects {} argument(s), found {}", function.name(), function.arity(), args.len()),
        );
    }
    Some(Call { function, args })
}

/// A single operand or call.  Unresolved calls are reported by
/// [`parse_call`] and yield `None`.
pub fn parse_atom(token: &str, scope: &mut Scope<'_, '_>) -> Option<Atom> {
    if token.contains('(') {
        parse_call(token, scope).map(Atom::Call)
    } else {
        Some(Atom::Operand(resolve_operand(token, scope)))
    }
}

/// Strip a leading `!` or `NOT ` from `text`.
pub fn strip_negation(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('!') {
        (true, rest.trim_start())
    } else if let Some(rest) = text.strip_prefix("NOT ") {
        (true, rest.trim_start())
    } else {
        (false, text)
    }
}

/// Byte index of the `)` matching the `(` at index 0 of `text`.
pub fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Chains ────────────────────────────────────────────────────────────────────

/// Why a chain could not be parsed.  Already reported when returned.
struct ChainError;

struct ChainBuilder<'a, 's, 'd> {
    scope: &'a mut Scope<'s, 'd>,
    terms: Vec<Term>,
    next_level: u32,
    source: &'a str,
    /// A `RETURN` term was reached; nothing after it is parsed.
    returned: bool,
    trailing_reported: bool,
}

impl ChainBuilder<'_, '_, '_> {
    fn syntax_error(&mut self, what: &str) -> ChainError {
        let msg = format!("{what} in '{}'", self.source);
        self.scope.diag.structure(self.scope.line, msg);
        ChainError
    }

    /// Called at each level once `RETURN` has ended the chain.
    fn end_after_return(&mut self, rest: &str) {
        if !rest.is_empty() && !self.trailing_reported {
            self.trailing_reported = true;
            let msg = format!("text after RETURN ignored in '{}'", self.source);
            self.scope.diag.structure(self.scope.line, msg);
        }
    }

    fn parse(&mut self, text: &str, level: u32) -> Result<(), ChainError> {
        let mut rest = text.trim();

        while !rest.is_empty() {
            let mut op = Op::None;
            if let Some(o) = rest.chars().next().and_then(Op::from_char) {
                op = o;
                rest = rest[1..].trim_start();
            }

            let (negate, after_not) = strip_negation(rest);
            rest = after_not;

            if rest.starts_with('(') {
                let Some(close) = matching_paren(rest) else {
                    return Err(self.syntax_error("unmatched brackets"));
                };
                let inner = &rest[1..close];
                rest = rest[close + 1..].trim_start();

                self.next_level += 1;
                let id = self.next_level;
                self.terms.push(Term { negate, op, level, kind: TermKind::Sublevel(id) });
                self.parse(inner, id)?;
                if self.returned {
                    self.end_after_return(rest);
                    return Ok(());
                }

                if rest.chars().next().is_some_and(|c| !is_operator(c)) {
                    return Err(self.syntax_error("missing operator after ')'"));
                }
                continue;
            }

            let mut depth = 0i32;
            let end = rest
                .char_indices()
                .find(|&(_, c)| {
                    match c {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    depth == 0 && is_operator(c)
                })
                .map_or(rest.len(), |(i, _)| i);

            let token = rest[..end].trim();
            rest = &rest[end..];
            if token.is_empty() {
                return Err(self.syntax_error("empty term"));
            }

            if token == "RETURN" {
                self.terms.push(Term { negate, op, level, kind: TermKind::Return });
                self.returned = true;
                self.end_after_return(rest.trim());
                return Ok(());
            }
            let Some(atom) = parse_atom(token, self.scope) else {
                return Err(ChainError);
            };
            self.terms.push(Term { negate, op, level, kind: TermKind::Atom(atom) });
        }
        Ok(())
    }
}

/// Parse the right-hand side of a statement into a leveled term chain.
/// Returns `None` (after reporting) if the chain is unusable.
pub fn parse_chain(text: &str, scope: &mut Scope<'_, '_>) -> Option<Vec<Term>> {
    let opens = text.matches('(').count();
    let closes = text.matches(')').count();
    if opens != closes {
        scope.diag.structure(scope.line, format!("unmatched brackets in '{text}'"));
        return None;
    }

    let mut builder = ChainBuilder {
        scope,
        terms: Vec::new(),
        next_level: 0,
        source: text,
        returned: false,
        trailing_reported: false,
    };
    builder.parse(text, 0).ok()?;
    Some(builder.terms)
}

// ── Statements ────────────────────────────────────────────────────────────────

/// Reduce `==`, `=#` and `==#` after the first `=` to a plain `=`.
fn normalize_assignment(text: &str) -> String {
    let Some(eq) = text.find('=') else {
        return text.to_owned();
    };
    let (head, tail) = text.split_at(eq + 1);
    let tail = tail
        .strip_prefix("=#")
        .or_else(|| tail.strip_prefix('#'))
        .or_else(|| tail.strip_prefix('='))
        .unwrap_or(tail);
    format!("{head}{tail}")
}

/// Parse one complete statement.  Returns `None` when the statement is
/// dropped; the reason has been reported.
pub fn parse_statement(text: &str, scope: &mut Scope<'_, '_>) -> Option<Statement> {
    let line = normalize_assignment(text).replace(';', "");
    let parts: Vec<&str> = line.split('=').map(str::trim).collect();

    let (target, rhs) = match parts.as_slice() {
        [rhs] => (Target::None, *rhs),
        [lhs, rhs] => {
            if lhs.is_empty() || rhs.is_empty() {
                scope.diag.structure(scope.line, format!("incomplete assignment '{}'", line.trim()));
                return None;
            }
            let target = if let Some(v) = ExternalVar::lookup(lhs) {
                Target::External(v)
            } else if let Some(idx) = scope.local(lhs) {
                Target::Local(idx)
            } else {
                scope.diag.resolution(scope.line, format!("unknown assignment target '{lhs}'"));
                return None;
            };
            (target, *rhs)
        }
        _ => {
            scope.diag.structure(scope.line, format!("unexpected number of '=' in '{}'", line.trim()));
            return None;
        }
    };

    let terms = parse_chain(rhs, scope)?;
    if terms.is_empty() {
        scope.diag.structure(scope.line, "empty statement");
        return None;
    }
    Some(Statement { target, terms, line: scope.line })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;

    fn with_scope<T>(locals: &[&str], f: impl FnOnce(&mut Scope<'_, '_>) -> T) -> (T, Diagnostics) {
        let locals: Vec<String> = locals.iter().map(|s| s.to_string()).collect();
        let mut diags = Diagnostics::new("test.dat");
        let out = {
            let mut sd = ScriptDiag::new(&mut diags, "T");
            let mut scope = Scope { locals: &locals, diag: &mut sd, line: 1 };
            f(&mut scope)
        };
        (out, diags)
    }

    fn stmt(text: &str, locals: &[&str]) -> (Option<Statement>, Diagnostics) {
        with_scope(locals, |s| parse_statement(text, s))
    }

    fn constant(v: i32) -> TermKind {
        TermKind::Atom(Atom::Operand(Operand::Constant(v)))
    }

    #[test]
    fn simple_assignment() {
        let (s, d) = stmt("STATE = SIGASP_STOP;", &[]);
        let s = s.unwrap();
        assert!(d.is_empty());
        assert_eq!(s.target, Target::External(ExternalVar::State));
        assert_eq!(s.terms.len(), 1);
        assert_eq!(s.terms[0].kind, TermKind::Atom(Atom::Operand(Operand::Named(Namespace::Aspect, 0))));
    }

    #[test]
    fn decorated_equals_is_reduced() {
        for src in ["X == 2;", "X =# 2;", "X ==# 2;", "X = #2;"] {
            let (s, d) = stmt(src, &["X"]);
            let s = s.unwrap_or_else(|| panic!("{src} dropped"));
            assert!(d.is_empty(), "{src}: {:?}", d.entries());
            assert_eq!(s.target, Target::Local(0));
            assert_eq!(s.terms[0].kind, constant(2));
        }
    }

    #[test]
    fn operators_in_order() {
        let (s, _) = stmt("X = 1 + 2 * 3 - 4 / 5 % 6;", &["X"]);
        let ops: Vec<Op> = s.unwrap().terms.iter().map(|t| t.op).collect();
        assert_eq!(ops, vec![Op::None, Op::Plus, Op::Multiply, Op::Minus, Op::Divide, Op::Modulo]);
    }

    #[test]
    fn groups_open_sublevels() {
        let (s, _) = stmt("X = (1 + (2 * 3)) - 4;", &["X"]);
        let terms = s.unwrap().terms;
        let shape: Vec<(u32, &TermKind)> = terms.iter().map(|t| (t.level, &t.kind)).collect();
        assert_eq!(
            shape,
            vec![
                (0, &TermKind::Sublevel(1)),
                (1, &constant(1)),
                (1, &TermKind::Sublevel(2)),
                (2, &constant(2)),
                (2, &constant(3)),
                (0, &constant(4)),
            ]
        );
        assert_eq!(terms[2].op, Op::Plus);
        assert_eq!(terms[5].op, Op::Minus);
    }

    #[test]
    fn leading_minus_is_unary() {
        let (s, _) = stmt("X = -5;", &["X"]);
        let t = &s.unwrap().terms[0];
        assert_eq!(t.op, Op::Minus);
        assert_eq!(t.kind, constant(5));
    }

    #[test]
    fn minus_after_operator_drops_statement() {
        let (s, d) = stmt("X = 3 * -2;", &["X"]);
        assert!(s.is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn negation_prefixes() {
        let (s, _) = stmt("X = !ENABLED + NOT (1);", &["X"]);
        let terms = s.unwrap().terms;
        assert!(terms[0].negate);
        assert_eq!(terms[0].kind, TermKind::Atom(Atom::Operand(Operand::External(ExternalVar::Enabled))));
        assert!(terms[1].negate);
        assert_eq!(terms[1].kind, TermKind::Sublevel(1));
    }

    #[test]
    fn function_calls() {
        let (s, d) = stmt("STATE = NEXT_SIG_LR(SIGFN_NORMAL);", &[]);
        assert!(d.is_empty());
        let s = s.unwrap();
        assert_eq!(
            s.terms[0].kind,
            TermKind::Atom(Atom::Call(Call {
                function: Function::NextSigLr,
                args: vec![Operand::Named(Namespace::SignalFunction, 0)],
            }))
        );

        let (s, _) = stmt("X = DIST_MULTI_SIG_MR(SIGFN_NORMAL, SIGFN_DISTANCE) + 1;", &["X"]);
        let terms = s.unwrap().terms;
        assert_eq!(terms.len(), 2);
        let TermKind::Atom(Atom::Call(call)) = &terms[0].kind else { panic!("not a call") };
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn call_only_statement() {
        let (s, _) = stmt("DEBUG_HEADER();", &[]);
        let s = s.unwrap();
        assert_eq!(s.target, Target::None);
        assert!(matches!(s.terms[0].kind, TermKind::Atom(Atom::Call(_))));
    }

    #[test]
    fn arity_mismatch_is_reported_but_kept() {
        let (s, d) = stmt("X = NEXT_SIG_LR();", &["X"]);
        assert!(s.is_some());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn unknown_function_drops_statement() {
        let (s, d) = stmt("X = FROB(1);", &["X"]);
        assert!(s.is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn unknown_operand_reads_as_zero() {
        let (s, d) = stmt("X = WIBBLE + SIGASP_PURPLE;", &["X"]);
        let terms = s.unwrap().terms;
        assert_eq!(terms[0].kind, constant(0));
        assert_eq!(terms[1].kind, constant(0));
        assert_eq!(d.len(), 2);
        assert!(d.entries()[1].message.contains("aspect"));
    }

    #[test]
    fn unknown_target_drops_statement() {
        let (s, d) = stmt("NOPE = 1;", &["X"]);
        assert!(s.is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn too_many_equals_drops_statement() {
        let (s, d) = stmt("X = Y = 1;", &["X", "Y"]);
        assert!(s.is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn unbalanced_brackets_drop_statement() {
        let (s, d) = stmt("X = (1 + 2;", &["X"]);
        assert!(s.is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn return_sentinel() {
        let (s, _) = stmt("RETURN;", &[]);
        assert_eq!(s.unwrap().terms[0].kind, TermKind::Return);
    }

    #[test]
    fn return_ends_the_chain() {
        let (s, d) = stmt("X = 1 + RETURN + 2;", &["X"]);
        let terms = s.unwrap().terms;
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].kind, TermKind::Return);
        assert_eq!(d.len(), 1);
        assert!(d.entries()[0].message.contains("after RETURN"));

        let (s, d) = stmt("X = (RETURN + 3) * 2;", &["X"]);
        assert_eq!(s.unwrap().terms.last().map(|t| t.kind.clone()), Some(TermKind::Return));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn locals_shadowed_by_externals() {
        let (s, _) = stmt("X = STATE;", &["X", "STATE"]);
        assert_eq!(
            s.unwrap().terms[0].kind,
            TermKind::Atom(Atom::Operand(Operand::External(ExternalVar::State)))
        );
    }
}
