//! Block structuring.
//!
//! Turns the flat logical lines of a script body into a tree of
//! [`Stmt`]s.  Statement ends, `IF` conditions and brace blocks are located
//! by counting literal `;`, `(`/`)` and `{`/`}` characters, accumulating
//! lines until the delimiter balances.  Text found after a boundary on the
//! same line is pushed back onto the [`LineCursor`] and read again as the next
//! line.

use super::ast::{ConditionBlock, CondItem, Stmt};
use super::cond::parse_condition;
use super::reader::SourceLine;
use super::term::{matching_paren, parse_statement, Scope};

// ── Cursor ────────────────────────────────────────────────────────────────────

/// Forward cursor over logical lines with a pushback stack.
pub struct LineCursor {
    lines: std::vec::IntoIter<SourceLine>,
    pushback: Vec<SourceLine>,
}

impl LineCursor {
    pub fn new(lines: Vec<SourceLine>) -> Self {
        Self { lines: lines.into_iter(), pushback: Vec::new() }
    }

    pub fn peek(&self) -> Option<&SourceLine> {
        self.pushback.last().or_else(|| self.lines.as_slice().first())
    }

    /// Make `line` the next line returned.
    pub fn push_front(&mut self, line: SourceLine) {
        self.pushback.push(line);
    }

    /// Push back `text` if it is not blank.
    fn push_rest(&mut self, text: &str, line: usize) {
        let text = text.trim();
        if !text.is_empty() {
            self.push_front(SourceLine::new(text, line));
        }
    }
}

impl Iterator for LineCursor {
    type Item = SourceLine;

    fn next(&mut self) -> Option<SourceLine> {
        self.pushback.pop().or_else(|| self.lines.next())
    }
}

fn is_if(text: &str) -> bool {
    text.starts_with("IF ")
}

fn is_else(text: &str) -> bool {
    text == "ELSE" || text.starts_with("ELSE ") || text.starts_with("ELSEIF")
}

/// Lines that end an unterminated statement.
fn is_structural(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('}') || is_if(text) || is_else(text)
}

// ── Structurer ────────────────────────────────────────────────────────────────

/// Build the statement tree for one script body.
pub fn structure(lines: Vec<SourceLine>, scope: &mut Scope<'_, '_>) -> Vec<Stmt> {
    let mut cursor = LineCursor::new(lines);
    Structurer { scope }.parse_lines(&mut cursor)
}

struct Structurer<'a, 's, 'd> {
    scope: &'a mut Scope<'s, 'd>,
}

impl Structurer<'_, '_, '_> {
    fn structure_error(&mut self, line: usize, message: impl Into<String>) {
        self.scope.diag.structure(line, message);
    }

    fn parse_lines(&mut self, cursor: &mut LineCursor) -> Vec<Stmt> {
        let mut stmts = Vec::new();

        while let Some(line) = cursor.next() {
            let text = line.text.as_str();
            if text.starts_with('{') {
                cursor.push_front(line);
                let inner = self.take_braced(cursor);
                stmts.extend(self.parse_lines(&mut LineCursor::new(inner)));
            } else if let Some(rest) = text.strip_prefix('}') {
                self.structure_error(line.line, "unexpected '}'");
                cursor.push_rest(rest, line.line);
            } else if is_if(text) {
                stmts.push(Stmt::If(self.parse_if_chain(line, cursor)));
            } else if is_else(text) {
                self.structure_error(line.line, format!("'{text}' without matching IF"));
            } else {
                stmts.extend(self.parse_statement(line, cursor));
            }
        }
        stmts
    }

    /// Accumulate lines up to the first `;`.
    fn take_statement(&mut self, first: SourceLine, cursor: &mut LineCursor) -> SourceLine {
        let SourceLine { mut text, line } = first;

        while !text.contains(';') {
            match cursor.peek() {
                Some(next) if !is_structural(&next.text) => {
                    if let Some(next) = cursor.next() {
                        text.push(' ');
                        text.push_str(&next.text);
                    }
                }
                _ => {
                    self.structure_error(line, format!("missing ';' after '{text}'"));
                    return SourceLine { text, line };
                }
            }
        }

        if let Some(end) = text.find(';') {
            cursor.push_rest(&text[end + 1..], line);
            text.truncate(end + 1);
        }
        SourceLine { text, line }
    }

    fn parse_statement(&mut self, first: SourceLine, cursor: &mut LineCursor) -> Option<Stmt> {
        let stmt = self.take_statement(first, cursor);
        self.scope.line = stmt.line;
        parse_statement(&stmt.text, self.scope).map(Stmt::Assign)
    }

    /// Accumulate lines until the first `(` is matched.  Returns the text
    /// up to and including the matching `)`.
    fn take_condition(&mut self, first: SourceLine, cursor: &mut LineCursor) -> SourceLine {
        let SourceLine { mut text, line } = first;

        loop {
            if let Some(open) = text.find('(') {
                if let Some(close) = matching_paren(&text[open..]) {
                    let end = open + close;
                    cursor.push_rest(&text[end + 1..], line);
                    text.truncate(end + 1);
                    return SourceLine { text, line };
                }
            }
            match cursor.peek() {
                Some(next) if !next.text.starts_with('{') && !next.text.starts_with('}') => {
                    if let Some(next) = cursor.next() {
                        text.push(' ');
                        text.push_str(&next.text);
                    }
                }
                _ => {
                    self.structure_error(line, format!("unmatched brackets in condition '{text}'"));
                    return SourceLine { text, line };
                }
            }
        }
    }

    fn parse_condition(&mut self, first: SourceLine, cursor: &mut LineCursor) -> Vec<CondItem> {
        let cond = self.take_condition(first, cursor);
        self.scope.line = cond.line;
        parse_condition(&cond.text, self.scope)
    }

    /// Collect the lines between a `{` and its matching `}`, dropping the
    /// outer braces.
    fn take_braced(&mut self, cursor: &mut LineCursor) -> Vec<SourceLine> {
        let mut inner = Vec::new();
        let mut depth = 0u32;
        let start = cursor.peek().map_or(0, |l| l.line);

        while let Some(line) = cursor.next() {
            let mut buf = String::new();
            for (i, c) in line.text.char_indices() {
                match c {
                    '{' => {
                        depth += 1;
                        if depth == 1 {
                            continue;
                        }
                    }
                    '}' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            push_nonblank(&mut inner, &buf, line.line);
                            cursor.push_rest(&line.text[i + 1..], line.line);
                            return inner;
                        }
                    }
                    _ => {}
                }
                buf.push(c);
            }
            push_nonblank(&mut inner, &buf, line.line);
        }

        self.structure_error(start, "unclosed '{'");
        inner
    }

    /// A branch body: a braced block, or exactly one statement (which may be
    /// an `IF` chain of its own).
    fn take_body(&mut self, owner_line: usize, cursor: &mut LineCursor) -> Vec<Stmt> {
        let Some(line) = cursor.next() else {
            self.structure_error(owner_line, "missing body");
            return Vec::new();
        };

        if line.text.starts_with('{') {
            cursor.push_front(line);
            let inner = self.take_braced(cursor);
            self.parse_lines(&mut LineCursor::new(inner))
        } else if line.text.starts_with('}') || is_else(&line.text) {
            self.structure_error(owner_line, "missing body");
            cursor.push_front(line);
            Vec::new()
        } else if is_if(&line.text) {
            vec![Stmt::If(self.parse_if_chain(line, cursor))]
        } else {
            self.parse_statement(line, cursor).into_iter().collect()
        }
    }

    fn parse_if_chain(&mut self, first: SourceLine, cursor: &mut LineCursor) -> ConditionBlock {
        let line = first.line;
        let condition = self.parse_condition(first, cursor);
        let if_body = self.take_body(line, cursor);
        let mut block = ConditionBlock { condition, if_body, else_ifs: Vec::new(), else_body: None };

        while let Some(next) = cursor.peek() {
            let text = next.text.as_str();
            if text == "ELSE" {
                let Some(else_line) = cursor.next() else { break };
                match cursor.peek() {
                    Some(l) if is_if(&l.text) => {
                        if let Some(if_line) = cursor.next() {
                            self.push_else_if(&mut block, if_line, cursor);
                        }
                    }
                    _ => {
                        block.else_body = Some(self.take_body(else_line.line, cursor));
                        break;
                    }
                }
            } else if text.starts_with("ELSEIF") {
                if let Some(if_line) = cursor.next() {
                    self.push_else_if(&mut block, if_line, cursor);
                }
            } else if let Some(rest) = text.strip_prefix("ELSE ") {
                let rest = rest.trim_start().to_owned();
                let Some(else_line) = cursor.next() else { break };
                if is_if(&rest) {
                    self.push_else_if(&mut block, SourceLine::new(rest, else_line.line), cursor);
                } else {
                    cursor.push_rest(&rest, else_line.line);
                    block.else_body = Some(self.take_body(else_line.line, cursor));
                    break;
                }
            } else {
                break;
            }
        }
        block
    }

    fn push_else_if(&mut self, block: &mut ConditionBlock, first: SourceLine, cursor: &mut LineCursor) {
        let line = first.line;
        let condition = self.parse_condition(first, cursor);
        let body = self.take_body(line, cursor);
        block.else_ifs.push((condition, body));
    }
}

fn push_nonblank(lines: &mut Vec<SourceLine>, text: &str, line: usize) {
    let text = text.trim();
    if !text.is_empty() {
        lines.push(SourceLine::new(text, line));
    }
}
