//! Character-level scanning of template text into flat items.
//!
//! Text, references and single directives come out as [`Item`]s in source
//! order. Block structure (`#if ... #end`) is assembled later by the parser.

use crate::diagnostic::Position;

use super::ast::{Expr, Reference, Segment};
use super::error::{Failure, Fallible, MAX_NESTING};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Item {
    Text(String),
    /// `#[[ ... ]]#` content, never gobbled.
    Unparsed(String),
    Reference(Reference),
    Comment,
    Set {
        target: Reference,
        value: Expr,
        pos: Position,
    },
    If(Expr, Position),
    ElseIf(Expr, Position),
    Else(Position),
    End(Position),
    Foreach {
        var: String,
        iterable: Expr,
        pos: Position,
    },
    Macro {
        name: String,
        params: Vec<String>,
        pos: Position,
    },
    MacroCall {
        name: String,
        args: Vec<Expr>,
        literal: String,
        pos: Position,
    },
    Break(Position),
    Stop(Position),
}

impl Item {
    /// Whether the item swallows its line when it stands alone on it.
    pub(super) const fn gobbles_line(&self) -> bool {
        !matches!(
            self,
            Self::Text(_) | Self::Unparsed(_) | Self::Reference(_) | Self::MacroCall { .. }
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

pub(super) struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    /// Current nesting of sub-expressions, counted against [`MAX_NESTING`].
    pub(super) depth: usize,
}

impl Scanner {
    pub(super) fn new(source: &str) -> Self {
        Self::with_origin(source, Position::new(1, 1))
    }

    /// Scan a fragment whose first char sits at `origin` in the template.
    pub(super) fn with_origin(source: &str, origin: Position) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: origin.line,
            column: origin.column,
            depth: 0,
        }
    }

    /// Start counting nesting from `depth`, for text embedded in an expression.
    pub(super) const fn nested_in(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Go one level deeper, failing once [`MAX_NESTING`] is reached.
    pub(super) fn enter(&mut self) -> Fallible<()> {
        if self.depth >= MAX_NESTING {
            return Err(Failure::too_deep(self.position()));
        }
        self.depth += 1;
        Ok(())
    }

    pub(super) fn scan_items(&mut self) -> Fallible<Vec<Item>> {
        let mut items = Vec::new();
        let mut text = String::new();

        while let Some(ch) = self.peek() {
            match ch {
                '\\' if matches!(self.peek_at(1), Some('$' | '#')) => {
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                '$' => {
                    if let Some(reference) = self.try_reference()? {
                        flush_text(&mut items, &mut text);
                        items.push(Item::Reference(reference));
                    } else {
                        self.bump();
                        text.push('$');
                    }
                }
                '#' => {
                    if let Some(item) = self.try_directive()? {
                        flush_text(&mut items, &mut text);
                        items.push(item);
                    } else {
                        self.bump();
                        text.push('#');
                    }
                }
                _ => {
                    self.bump();
                    text.push(ch);
                }
            }
        }
        flush_text(&mut items, &mut text);
        Ok(items)
    }

    // --- Cursor primitives ---

    pub(super) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(super) fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    pub(super) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub(super) const fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub(super) fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, expected)| self.peek_at(i) == Some(expected))
    }

    pub(super) fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            for _ in s.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    pub(super) fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    pub(super) fn expect(&mut self, ch: char, context: &str) -> Fallible<()> {
        if self.peek() == Some(ch) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("Expected '{ch}' {context}")))
        }
    }

    /// Failure at the cursor naming what was found there.
    pub(super) fn unexpected(&self, expected: &str) -> Failure {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
        Failure::new(format!("{expected}, found {found}"), self.position())
    }

    const fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    const fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
        self.column = mark.column;
    }

    fn slice_from(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    pub(super) fn read_identifier(&mut self) -> Option<String> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let mut ident = String::new();
        while let Some(ch) = self.peek().filter(|c| is_ident_char(*c)) {
            ident.push(ch);
            self.bump();
        }
        Some(ident)
    }

    // --- References ---

    /// Scan a reference at `$`, or leave the cursor alone when the `$` is plain text.
    pub(super) fn try_reference(&mut self) -> Fallible<Option<Reference>> {
        let mut offset = 1;
        let quiet = self.peek_at(offset) == Some('!');
        if quiet {
            offset += 1;
        }
        let braced = self.peek_at(offset) == Some('{');
        if braced {
            offset += 1;
        }
        if !self.peek_at(offset).is_some_and(is_ident_start) {
            return Ok(None);
        }

        let start = self.pos;
        let pos = self.position();
        for _ in 0..offset {
            self.bump();
        }
        let name = self.read_identifier().unwrap_or_default();
        let segments = self.reference_segments()?;
        if braced && !self.eat("}") {
            return Err(Failure::new(
                format!("Unterminated reference '${{{name}', expected '}}'"),
                pos,
            ));
        }

        Ok(Some(Reference {
            name,
            segments,
            quiet,
            literal: self.slice_from(start),
            pos,
        }))
    }

    fn reference_segments(&mut self) -> Fallible<Vec<Segment>> {
        let mut segments = Vec::new();
        loop {
            if segments.len() >= MAX_NESTING {
                return Err(Failure::too_deep(self.position()));
            }
            match self.peek() {
                Some('.') if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.bump();
                    let name = self.read_identifier().unwrap_or_default();
                    if self.peek() == Some('(') {
                        self.bump();
                        let args = self.call_arguments()?;
                        segments.push(Segment::Method { name, args });
                    } else {
                        segments.push(Segment::Property(name));
                    }
                }
                Some('[') => {
                    // `$price[USD]` in plain text is not an index; back off.
                    let mark = self.mark();
                    self.bump();
                    match self.index_expression() {
                        Ok(expr) => segments.push(Segment::Index(expr)),
                        Err(failure) if failure.is_too_deep() => return Err(failure),
                        Err(_) => {
                            self.reset(mark);
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(segments)
    }

    fn index_expression(&mut self) -> Fallible<Expr> {
        self.skip_whitespace();
        let expr = self.expression()?;
        self.skip_whitespace();
        self.expect(']', "to close index")?;
        Ok(expr)
    }

    /// Arguments after `(` up to and including `)`, comma separated.
    fn call_arguments(&mut self) -> Fallible<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            self.skip_whitespace();
            args.push(self.expression()?);
            self.skip_whitespace();
            if self.eat(",") {
                continue;
            }
            if self.eat(")") {
                return Ok(args);
            }
            return Err(self.unexpected("Expected ',' or ')' in argument list"));
        }
    }

    // --- Directives ---

    fn try_directive(&mut self) -> Fallible<Option<Item>> {
        let start = self.pos;
        let pos = self.position();

        if self.starts_with("##") {
            while self.peek().is_some_and(|c| c != '\n') {
                self.bump();
            }
            return Ok(Some(Item::Comment));
        }
        if self.eat("#*") {
            return self.finish_block(pos, "*#", "Unterminated block comment, expected '*#'")
                .map(|_| Some(Item::Comment));
        }
        if self.eat("#[[") {
            return self
                .finish_block(pos, "]]#", "Unterminated unparsed block, expected ']]#'")
                .map(|content| Some(Item::Unparsed(content)));
        }

        let mark = self.mark();
        self.bump();
        let braced = self.eat("{");
        let Some(name) = self.read_identifier() else {
            self.reset(mark);
            return Ok(None);
        };
        if braced && !self.eat("}") {
            self.reset(mark);
            return Ok(None);
        }

        let item = match name.as_str() {
            "set" => {
                self.open_arguments("#set")?;
                let target = self.assignment_target()?;
                self.skip_whitespace();
                self.expect('=', "in #set")?;
                self.skip_whitespace();
                let value = self.expression()?;
                self.close_arguments("#set")?;
                Item::Set { target, value, pos }
            }
            "if" | "elseif" => {
                self.open_arguments(&format!("#{name}"))?;
                let condition = self.expression()?;
                self.close_arguments(&format!("#{name}"))?;
                if name == "if" {
                    Item::If(condition, pos)
                } else {
                    Item::ElseIf(condition, pos)
                }
            }
            "foreach" => {
                self.open_arguments("#foreach")?;
                if self.peek() != Some('$') {
                    return Err(self.unexpected("Expected loop variable in #foreach"));
                }
                self.bump();
                let Some(var) = self.read_identifier() else {
                    return Err(self.unexpected("Expected loop variable name in #foreach"));
                };
                self.skip_whitespace();
                if !self.eat_keyword("in") {
                    return Err(self.unexpected("Expected 'in' in #foreach"));
                }
                self.skip_whitespace();
                let iterable = self.expression()?;
                self.close_arguments("#foreach")?;
                Item::Foreach { var, iterable, pos }
            }
            "macro" => {
                self.open_arguments("#macro")?;
                let Some(macro_name) = self.read_identifier() else {
                    return Err(self.unexpected("Expected macro name in #macro"));
                };
                let mut params = Vec::new();
                loop {
                    while self.peek().is_some_and(|c| c.is_whitespace() || c == ',') {
                        self.bump();
                    }
                    if self.eat(")") {
                        break;
                    }
                    if self.peek() != Some('$') {
                        return Err(self.unexpected("Expected parameter or ')' in #macro"));
                    }
                    self.bump();
                    let Some(param) = self.read_identifier() else {
                        return Err(self.unexpected("Expected parameter name in #macro"));
                    };
                    params.push(param);
                }
                Item::Macro {
                    name: macro_name,
                    params,
                    pos,
                }
            }
            "else" => Item::Else(pos),
            "end" => Item::End(pos),
            "break" => Item::Break(pos),
            "stop" => Item::Stop(pos),
            _ if self.peek() == Some('(') => {
                self.bump();
                let args = self.macro_arguments(pos)?;
                Item::MacroCall {
                    name,
                    args,
                    literal: self.slice_from(start),
                    pos,
                }
            }
            _ => {
                self.reset(mark);
                return Ok(None);
            }
        };
        Ok(Some(item))
    }

    /// Consume up to and including `terminator`, returning what came before it.
    fn finish_block(&mut self, pos: Position, terminator: &str, message: &str) -> Fallible<String> {
        let mut content = String::new();
        loop {
            if self.eat(terminator) {
                return Ok(content);
            }
            match self.bump() {
                Some(ch) => content.push(ch),
                None => return Err(Failure::new(message, pos)),
            }
        }
    }

    fn open_arguments(&mut self, directive: &str) -> Fallible<()> {
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.bump();
        }
        self.expect('(', &format!("after {directive}"))?;
        self.skip_whitespace();
        Ok(())
    }

    fn close_arguments(&mut self, directive: &str) -> Fallible<()> {
        self.skip_whitespace();
        self.expect(')', &format!("to close {directive}"))
    }

    fn assignment_target(&mut self) -> Fallible<Reference> {
        if self.peek() != Some('$') {
            return Err(self.unexpected("Expected reference in #set"));
        }
        let pos = self.position();
        let Some(target) = self.try_reference()? else {
            return Err(Failure::new("Expected reference name in #set", pos));
        };
        if target
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Method { .. }))
        {
            return Err(Failure::new(
                format!("Cannot assign to method call '{}'", target.literal),
                target.pos,
            ));
        }
        Ok(target)
    }

    /// Macro call arguments: expressions separated by whitespace and/or commas.
    fn macro_arguments(&mut self, pos: Position) -> Fallible<Vec<Expr>> {
        let mut args = Vec::new();
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace() || c == ',') {
                self.bump();
            }
            match self.peek() {
                Some(')') => {
                    self.bump();
                    return Ok(args);
                }
                None => return Err(Failure::new("Unterminated macro call, expected ')'", pos)),
                Some(_) => args.push(self.expression()?),
            }
        }
    }

    /// Consume a word operator such as `in` or `and` when it stands alone.
    pub(super) fn eat_keyword(&mut self, word: &str) -> bool {
        let len = word.chars().count();
        if self.starts_with(word) && !self.peek_at(len).is_some_and(is_ident_char) {
            self.eat(word)
        } else {
            false
        }
    }
}

fn flush_text(items: &mut Vec<Item>, text: &mut String) {
    if !text.is_empty() {
        items.push(Item::Text(std::mem::take(text)));
    }
}

pub(super) const fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

pub(super) const fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}
