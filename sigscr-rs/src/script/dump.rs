//! Human-readable listing of a compiled script.
//!
//! The listing reflects what the compiler understood, not the source text:
//! resolved names, explicit grouping of sublevels, and the flattened
//! condition lists.

use std::fmt;

use super::ast::{Atom, Call, CondItem, Condition, ConditionBlock, Join, Op, Operand, Script, Stmt, Target, Term, TermKind};

const INDENT: &str = "    ";

/// Render `script` as text, one statement per line.
pub fn dump_script(script: &Script) -> String {
    Listing(script).to_string()
}

/// `Display` adapter behind [`dump_script`].
pub struct Listing<'a>(pub &'a Script);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let script = self.0;
        writeln!(f, "SCRIPT {}", script.name)?;
        for (idx, name) in script.locals.iter().enumerate() {
            writeln!(f, "{INDENT}FLOAT {name}  ; slot {idx}")?;
        }
        Dumper { script }.block(f, &script.stmts, 1)
    }
}

struct Dumper<'a> {
    script: &'a Script,
}

impl Dumper<'_> {
    fn block(&self, f: &mut fmt::Formatter<'_>, stmts: &[Stmt], depth: usize) -> fmt::Result {
        for stmt in stmts {
            match stmt {
                Stmt::Assign(s) => {
                    let rhs = self.chain(&s.terms, 0);
                    let pad = INDENT.repeat(depth);
                    match s.target {
                        Target::None => writeln!(f, "{pad}{rhs}")?,
                        t => writeln!(f, "{pad}{} = {rhs}", self.target(t))?,
                    }
                }
                Stmt::If(b) => self.if_block(f, b, depth)?,
            }
        }
        Ok(())
    }

    fn if_block(&self, f: &mut fmt::Formatter<'_>, b: &ConditionBlock, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        writeln!(f, "{pad}IF ({})", self.cond_list(&b.condition))?;
        self.block(f, &b.if_body, depth + 1)?;
        for (cond, body) in &b.else_ifs {
            writeln!(f, "{pad}ELSEIF ({})", self.cond_list(cond))?;
            self.block(f, body, depth + 1)?;
        }
        if let Some(body) = &b.else_body {
            writeln!(f, "{pad}ELSE")?;
            self.block(f, body, depth + 1)?;
        }
        writeln!(f, "{pad}ENDIF")
    }

    fn target(&self, t: Target) -> String {
        match t {
            Target::External(v) => v.name().to_owned(),
            Target::Local(idx) => self.local(idx),
            Target::None => String::new(),
        }
    }

    fn local(&self, idx: usize) -> String {
        self.script.locals.get(idx).cloned().unwrap_or_else(|| format!("#{idx}"))
    }

    fn chain(&self, terms: &[Term], level: u32) -> String {
        let mut s = String::new();
        for term in terms.iter().filter(|t| t.level == level) {
            if term.op != Op::None {
                if s.is_empty() {
                    s.push_str(term.op.symbol());
                } else {
                    s.push_str(&format!(" {} ", term.op.symbol()));
                }
            }
            if term.negate {
                s.push('!');
            }
            match &term.kind {
                TermKind::Atom(a) => s.push_str(&self.atom(a)),
                TermKind::Return => s.push_str("RETURN"),
                TermKind::Sublevel(id) => s.push_str(&format!("({})", self.chain(terms, *id))),
            }
        }
        s
    }

    fn atom(&self, atom: &Atom) -> String {
        match atom {
            Atom::Operand(op) => self.operand(op),
            Atom::Call(Call { function, args }) => {
                let args: Vec<String> = args.iter().map(|a| self.operand(a)).collect();
                format!("{}({})", function.name(), args.join(", "))
            }
        }
    }

    fn operand(&self, op: &Operand) -> String {
        match *op {
            Operand::Constant(v) => v.to_string(),
            Operand::Local(idx) => self.local(idx),
            Operand::External(v) => v.name().to_owned(),
            Operand::Named(ns, v) => match ns.member_name(v) {
                Some(m) => format!("{}{m}", ns.prefix()),
                None => v.to_string(),
            },
        }
    }

    fn cond_list(&self, items: &[CondItem]) -> String {
        let parts: Vec<String> = items
            .iter()
            .map(|item| match item {
                CondItem::Cond(c) => self.condition(c),
                CondItem::Join(Join::And) => "AND".to_owned(),
                CondItem::Join(Join::Or) => "OR".to_owned(),
                CondItem::Negate => "NOT".to_owned(),
                CondItem::Group(sub) => format!("({})", self.cond_list(sub)),
            })
            .collect();
        parts.join(" ")
    }

    fn condition(&self, c: &Condition) -> String {
        let neg = |n: bool| if n { "!" } else { "" };
        let left = format!("{}{}", neg(c.negate_left), self.atom(&c.left));
        match (c.cmp, &c.right) {
            (Some(cmp), Some(right)) => {
                format!("{left} {} {}{}", cmp.symbol(), neg(c.negate_right), self.atom(right))
            }
            _ => left,
        }
    }
}
