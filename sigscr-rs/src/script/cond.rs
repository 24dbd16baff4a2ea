//! `IF` condition parsing.
//!
//! A condition becomes a flat list of [`CondItem`]s that the interpreter folds
//! strictly left to right.  Parenthesized compounds (groups containing a
//! separator) are lifted out first, replaced by `[n]` placeholders, and
//! parsed recursively into [`CondItem::Group`]s.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use super::ast::{Atom, CondItem, Comparator, Condition, Join, Operand};
use super::term::{matching_paren, parse_atom, strip_negation, Scope};

const SEPARATORS: [&str; 4] = ["&&", "||", " AND ", " OR "];

static SEPARATOR_AC: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostFirst)
        .build(SEPARATORS)
});

fn join_for(pattern: usize) -> Join {
    match pattern {
        0 | 2 => Join::And,
        _ => Join::Or,
    }
}

fn has_separator(text: &str) -> bool {
    SEPARATOR_AC.is_match(text)
}

/// Parse the condition of an `IF`/`ELSEIF` line, i.e. the text between its
/// first `(` and last `)`.
pub fn parse_condition(text: &str, scope: &mut Scope<'_, '_>) -> Vec<CondItem> {
    let (Some(start), Some(end)) = (text.find('('), text.rfind(')')) else {
        scope.diag.structure(scope.line, format!("missing condition in '{text}'"));
        return Vec::new();
    };
    if end <= start {
        scope.diag.structure(scope.line, format!("malformed condition in '{text}'"));
        return Vec::new();
    }
    parse_list(text[start + 1..end].trim(), scope)
}

/// Replace top-level parenthesized compounds with `[n]` placeholders.
fn lift_groups(text: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(text.len());
    let mut groups = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('(') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = matching_paren(tail) else {
            out.push_str(tail);
            return (out, groups);
        };
        let group = &tail[..=close];
        if has_separator(group) {
            out.push_str(&format!("[{}]", groups.len()));
            groups.push(group[1..close].trim().to_owned());
        } else {
            out.push_str(group);
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    (out, groups)
}

fn parse_list(text: &str, scope: &mut Scope<'_, '_>) -> Vec<CondItem> {
    let (line, groups) = lift_groups(text);
    let mut items = Vec::new();
    let mut rest = line.as_str();

    while let Some(m) = SEPARATOR_AC.find(rest) {
        push_segment(&rest[..m.start()], &groups, &mut items, scope);
        items.push(CondItem::Join(join_for(m.pattern())));
        rest = &rest[m.end()..];
    }
    push_segment(rest, &groups, &mut items, scope);
    items
}

fn push_segment(segment: &str, groups: &[String], items: &mut Vec<CondItem>, scope: &mut Scope<'_, '_>) {
    let segment = segment.trim();
    if segment.is_empty() {
        scope.diag.structure(scope.line, "empty condition");
        return;
    }

    let (negate, segment) = strip_negation(segment);
    if negate {
        items.push(CondItem::Negate);
    }

    if let Some(idx) = placeholder(segment) {
        if let Some(group) = groups.get(idx) {
            items.push(CondItem::Group(parse_list(group, scope)));
            return;
        }
    }

    let mut segment = segment;
    while segment.starts_with('(') && matching_paren(segment) == Some(segment.len() - 1) {
        segment = segment[1..segment.len() - 1].trim();
    }
    items.push(CondItem::Cond(parse_atomic(segment, scope)));
}

fn placeholder(segment: &str) -> Option<usize> {
    segment.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
}

/// Byte index and comparator of the first comparison operator.  A `!` only
/// counts when followed by `=`.
fn find_comparator(text: &str) -> Option<(usize, usize, Option<Comparator>)> {
    let bytes = text.as_bytes();
    let pos = bytes.iter().enumerate().position(|(i, &b)| match b {
        b'<' | b'>' | b'=' => true,
        b'!' => bytes.get(i + 1) == Some(&b'='),
        _ => false,
    })?;
    let doubled = bytes.get(pos + 1) == Some(&b'=');
    let cmp = match (bytes[pos], doubled) {
        (b'>', false) => Some(Comparator::Gt),
        (b'>', true) => Some(Comparator::Ge),
        (b'<', false) => Some(Comparator::Lt),
        (b'<', true) => Some(Comparator::Le),
        (b'=', true) => Some(Comparator::Eq),
        (b'!', true) => Some(Comparator::Ne),
        _ => None,
    };
    let len = if doubled { 2 } else { 1 };
    Some((pos, len, cmp))
}

fn side(text: &str, scope: &mut Scope<'_, '_>) -> (bool, Atom) {
    let (negate, text) = strip_negation(text.trim());
    let text = text.trim();
    if text.is_empty() {
        scope.diag.structure(scope.line, "missing operand in condition");
        return (negate, Atom::Operand(Operand::Constant(0)));
    }
    let atom = parse_atom(text, scope).unwrap_or(Atom::Operand(Operand::Constant(0)));
    (negate, atom)
}

/// Parse a single comparison such as `BLOCK_STATE == #BLOCK_CLEAR`.
pub fn parse_atomic(text: &str, scope: &mut Scope<'_, '_>) -> Condition {
    let Some((pos, len, cmp)) = find_comparator(text) else {
        let (negate_left, left) = side(text, scope);
        return Condition { left, negate_left, cmp: None, right: None, negate_right: false };
    };

    let cmp = cmp.unwrap_or_else(|| {
        scope.diag.structure(scope.line, format!("'=' used as comparison in '{text}', read as '=='"));
        Comparator::Eq
    });

    let (negate_left, left) = side(&text[..pos], scope);
    let right_text = text[pos + len..].trim();
    let right_text = right_text.strip_prefix('#').unwrap_or(right_text);
    let (negate_right, right) = side(right_text, scope);

    Condition { left, negate_left, cmp: Some(cmp), right: Some(right), negate_right }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Diagnostics, ScriptDiag};
    use crate::script::ast::Call;
    use crate::script::catalog::{ExternalVar, Function, Namespace};

    fn cond(text: &str, locals: &[&str]) -> (Vec<CondItem>, Diagnostics) {
        let locals: Vec<String> = locals.iter().map(|s| s.to_string()).collect();
        let mut diags = Diagnostics::new("test.dat");
        let items = {
            let mut sd = ScriptDiag::new(&mut diags, "T");
            let mut scope = Scope { locals: &locals, diag: &mut sd, line: 1 };
            parse_condition(text, &mut scope)
        };
        (items, diags)
    }

    fn local(idx: usize) -> Atom {
        Atom::Operand(Operand::Local(idx))
    }

    fn truthy(idx: usize) -> CondItem {
        CondItem::Cond(Condition { left: local(idx), negate_left: false, cmp: None, right: None, negate_right: false })
    }

    #[test]
    fn comparison_with_hash_constant() {
        let (items, d) = cond("IF ( BLOCK_STATE == #BLOCK_CLEAR )", &[]);
        assert!(d.is_empty());
        assert_eq!(
            items,
            vec![CondItem::Cond(Condition {
                left: Atom::Operand(Operand::External(ExternalVar::BlockState)),
                negate_left: false,
                cmp: Some(Comparator::Eq),
                right: Some(Atom::Operand(Operand::Named(Namespace::Block, 0))),
                negate_right: false,
            })]
        );
    }

    #[test]
    fn all_comparators() {
        for (src, want) in [
            (">", Comparator::Gt),
            (">=", Comparator::Ge),
            ("<", Comparator::Lt),
            ("<=", Comparator::Le),
            ("==", Comparator::Eq),
            ("!=", Comparator::Ne),
        ] {
            let (items, _) = cond(&format!("IF (A {src} 2)"), &["A"]);
            let [CondItem::Cond(c)] = items.as_slice() else { panic!("{src}: {items:?}") };
            assert_eq!(c.cmp, Some(want), "{src}");
            assert_eq!(c.right, Some(Atom::Operand(Operand::Constant(2))));
        }
    }

    #[test]
    fn lone_equals_is_reported() {
        let (items, d) = cond("IF (A = 2)", &["A"]);
        let [CondItem::Cond(c)] = items.as_slice() else { panic!() };
        assert_eq!(c.cmp, Some(Comparator::Eq));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn flat_separators_in_order() {
        let (items, _) = cond("IF (A || B && C)", &["A", "B", "C"]);
        assert_eq!(
            items,
            vec![truthy(0), CondItem::Join(Join::Or), truthy(1), CondItem::Join(Join::And), truthy(2)]
        );

        let (items, _) = cond("IF (A OR B AND C)", &["A", "B", "C"]);
        assert_eq!(
            items,
            vec![truthy(0), CondItem::Join(Join::Or), truthy(1), CondItem::Join(Join::And), truthy(2)]
        );
    }

    #[test]
    fn nested_groups() {
        let (items, _) = cond("IF (A && (B || (C AND D)))", &["A", "B", "C", "D"]);
        assert_eq!(
            items,
            vec![
                truthy(0),
                CondItem::Join(Join::And),
                CondItem::Group(vec![
                    truthy(1),
                    CondItem::Join(Join::Or),
                    CondItem::Group(vec![truthy(2), CondItem::Join(Join::And), truthy(3)]),
                ]),
            ]
        );
    }

    #[test]
    fn simple_parens_are_stripped() {
        let (items, _) = cond("IF ((A > 1) && (B))", &["A", "B"]);
        assert_eq!(items.len(), 3);
        let CondItem::Cond(c) = &items[0] else { panic!() };
        assert_eq!(c.cmp, Some(Comparator::Gt));
        assert_eq!(items[2], truthy(1));
    }

    #[test]
    fn negation_markers() {
        let (items, _) = cond("IF (!A && NOT (B || C))", &["A", "B", "C"]);
        assert_eq!(items[0], CondItem::Negate);
        assert_eq!(items[1], truthy(0));
        assert_eq!(items[3], CondItem::Negate);
        assert!(matches!(items[4], CondItem::Group(_)));
    }

    #[test]
    fn negated_right_side() {
        let (items, _) = cond("IF (A == !B)", &["A", "B"]);
        let [CondItem::Cond(c)] = items.as_slice() else { panic!() };
        assert!(c.negate_right);
        assert!(!c.negate_left);
        assert_eq!(c.right, Some(local(1)));
    }

    #[test]
    fn function_call_sides() {
        let (items, d) = cond("IF (NEXT_SIG_LR(SIGFN_NORMAL) >= SIGASP_APPROACH_1)", &[]);
        assert!(d.is_empty());
        let [CondItem::Cond(c)] = items.as_slice() else { panic!() };
        assert_eq!(
            c.left,
            Atom::Call(Call { function: Function::NextSigLr, args: vec![Operand::Named(Namespace::SignalFunction, 0)] })
        );
        assert_eq!(c.right, Some(Atom::Operand(Operand::Named(Namespace::Aspect, 3))));
    }

    #[test]
    fn unknown_function_reads_as_zero() {
        let (items, d) = cond("IF (FROB(1))", &[]);
        let [CondItem::Cond(c)] = items.as_slice() else { panic!() };
        assert_eq!(c.left, Atom::Operand(Operand::Constant(0)));
        assert_eq!(d.len(), 1);
    }
}
