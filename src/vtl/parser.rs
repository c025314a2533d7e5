//! Turns scanned items into a [`Template`].
//!
//! Two passes run over the flat item list. The first removes the whitespace
//! around directives that stand alone on their line. The second nests blocks
//! and collects macro definitions.

use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostic::Position;

use super::ast::{Expr, MacroDef, Node, Template};
use super::error::{Failure, Fallible, MAX_NESTING, TemplateError};
use super::scanner::{Item, Scanner};

/// Parse a whole template.
pub(crate) fn parse(source: &str) -> Result<Template, TemplateError> {
    let build = || -> Fallible<Template> {
        let mut items = Scanner::new(source).scan_items()?;
        gobble_lines(&mut items);
        let mut builder = TreeBuilder::new(items, 0);
        let nodes = builder.root()?;
        Ok(Template {
            source: Rc::from(source),
            nodes,
            macros: builder.macros,
        })
    };
    build().map_err(|failure| TemplateError::parse(failure, source))
}

/// Parse the inside of an interpolated string starting at `origin`, found
/// `depth` levels deep in an expression.
///
/// No gobbling happens here, and macros defined inside a string are dropped.
pub(super) fn parse_fragment(source: &str, origin: Position, depth: usize) -> Fallible<Vec<Node>> {
    let items = Scanner::with_origin(source, origin)
        .nested_in(depth)
        .scan_items()?;
    TreeBuilder::new(items, depth).root()
}

// --- Gobbling ---

const fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

/// Strip indentation and the trailing newline of lines whose only content is
/// a directive or comment.
fn gobble_lines(items: &mut [Item]) {
    let count = items.len();
    let gobbled: Vec<bool> = (0..count)
        .map(|i| {
            items[i].gobbles_line() && starts_line(items, i) && ends_line(items, i)
        })
        .collect();

    for i in 0..count {
        let trim_head = i > 0 && gobbled[i - 1];
        let trim_tail = i + 1 < count && gobbled[i + 1];
        if !(trim_head || trim_tail) {
            continue;
        }
        let Item::Text(text) = &mut items[i] else {
            continue;
        };
        let head = if trim_head {
            text.find('\n').map_or(text.len(), |idx| idx + 1)
        } else {
            0
        };
        let tail = if trim_tail {
            text.rfind('\n').map_or(0, |idx| idx + 1)
        } else {
            text.len()
        };
        *text = text[head..tail.max(head)].to_string();
    }
}

fn starts_line(items: &[Item], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    match &items[i - 1] {
        Item::Text(text) => match text.rfind('\n') {
            Some(idx) => text[idx + 1..].chars().all(is_blank),
            None => i == 1 && text.chars().all(is_blank),
        },
        _ => false,
    }
}

fn ends_line(items: &[Item], i: usize) -> bool {
    match items.get(i + 1) {
        None => true,
        Some(Item::Text(text)) => match text.find('\n') {
            Some(idx) => text[..idx].chars().all(is_blank),
            None => i + 2 == items.len() && text.chars().all(is_blank),
        },
        Some(_) => false,
    }
}

// --- Tree building ---

/// How a block ended.
enum Closer {
    Eof,
    End(Position),
    Else(Position),
    ElseIf(Expr, Position),
}

struct TreeBuilder {
    items: std::vec::IntoIter<Item>,
    macros: HashMap<String, Rc<MacroDef>>,
    loop_depth: usize,
    depth: usize,
}

impl TreeBuilder {
    fn new(items: Vec<Item>, depth: usize) -> Self {
        Self {
            items: items.into_iter(),
            macros: HashMap::new(),
            loop_depth: 0,
            depth,
        }
    }

    fn enter(&mut self, pos: Position) -> Fallible<()> {
        if self.depth >= MAX_NESTING {
            return Err(Failure::too_deep(pos));
        }
        self.depth += 1;
        Ok(())
    }

    fn root(&mut self) -> Fallible<Vec<Node>> {
        let (nodes, closer) = self.block()?;
        match closer {
            Closer::Eof => Ok(nodes),
            Closer::End(pos) => Err(Failure::new("#end without an open block", pos)),
            Closer::Else(pos) => Err(Failure::new("#else without matching #if", pos)),
            Closer::ElseIf(_, pos) => Err(Failure::new("#elseif without matching #if", pos)),
        }
    }

    fn block(&mut self) -> Fallible<(Vec<Node>, Closer)> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            match item {
                Item::Text(text) | Item::Unparsed(text) => push_text(&mut nodes, text),
                Item::Reference(reference) => nodes.push(Node::Reference(reference)),
                Item::Comment => {}
                Item::Set { target, value, pos } => nodes.push(Node::Set { target, value, pos }),
                Item::If(condition, pos) => {
                    self.enter(pos)?;
                    let node = self.if_block(condition, pos);
                    self.depth -= 1;
                    nodes.push(node?);
                }
                Item::ElseIf(condition, pos) => return Ok((nodes, Closer::ElseIf(condition, pos))),
                Item::Else(pos) => return Ok((nodes, Closer::Else(pos))),
                Item::End(pos) => return Ok((nodes, Closer::End(pos))),
                Item::Foreach { var, iterable, pos } => {
                    self.enter(pos)?;
                    self.loop_depth += 1;
                    let body = self.closed_block("#foreach", pos);
                    self.loop_depth -= 1;
                    self.depth -= 1;
                    nodes.push(Node::Foreach {
                        var,
                        iterable,
                        body: body?,
                    });
                }
                Item::Macro { name, params, pos } => {
                    self.enter(pos)?;
                    let outer_depth = std::mem::take(&mut self.loop_depth);
                    let body = self.closed_block("#macro", pos);
                    self.loop_depth = outer_depth;
                    self.depth -= 1;
                    let def = MacroDef {
                        name: name.clone(),
                        params,
                        body: body?,
                    };
                    self.macros.insert(name, Rc::new(def));
                }
                Item::MacroCall {
                    name,
                    args,
                    literal,
                    pos,
                } => nodes.push(Node::MacroCall {
                    name,
                    args,
                    literal,
                    pos,
                }),
                Item::Break(pos) => {
                    if self.loop_depth == 0 {
                        return Err(Failure::new("#break outside of #foreach", pos));
                    }
                    nodes.push(Node::Break);
                }
                Item::Stop(_) => nodes.push(Node::Stop),
            }
        }
        Ok((nodes, Closer::Eof))
    }

    /// A block that must be closed by `#end`.
    fn closed_block(&mut self, directive: &str, opened: Position) -> Fallible<Vec<Node>> {
        let (body, closer) = self.block()?;
        match closer {
            Closer::End(_) => Ok(body),
            Closer::Eof => Err(Failure::new(format!("Missing #end for {directive}"), opened)),
            Closer::Else(pos) => Err(Failure::new("#else without matching #if", pos)),
            Closer::ElseIf(_, pos) => Err(Failure::new("#elseif without matching #if", pos)),
        }
    }

    fn if_block(&mut self, condition: Expr, opened: Position) -> Fallible<Node> {
        let mut branches = Vec::new();
        let mut condition = condition;
        loop {
            let (body, closer) = self.block()?;
            branches.push((condition, body));
            match closer {
                Closer::End(_) => {
                    return Ok(Node::If {
                        branches,
                        otherwise: None,
                    });
                }
                Closer::ElseIf(next, _) => condition = next,
                Closer::Else(_) => {
                    let otherwise = self.closed_block("#if", opened)?;
                    return Ok(Node::If {
                        branches,
                        otherwise: Some(otherwise),
                    });
                }
                Closer::Eof => return Err(Failure::new("Missing #end for #if", opened)),
            }
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(&text);
    } else {
        nodes.push(Node::Text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(template: &Template) -> Vec<String> {
        template
            .nodes
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_text_template() {
        let template = parse("just text").unwrap();
        assert_eq!(template.nodes, vec![Node::Text("just text".into())]);
        assert_eq!(template.source(), "just text");
    }

    #[test]
    fn test_directive_alone_on_line_is_gobbled() {
        let template = parse("a\n  #set($x = 1)\nb").unwrap();
        assert_eq!(texts(&template), vec!["a\n".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_inline_directive_keeps_whitespace() {
        let template = parse("a #set($x = 1) b\n").unwrap();
        assert_eq!(texts(&template), vec!["a ".to_string(), " b\n".to_string()]);
    }

    #[test]
    fn test_line_comment_alone_vanishes() {
        let template = parse("## note\nbody").unwrap();
        assert_eq!(template.nodes, vec![Node::Text("body".into())]);
    }

    #[test]
    fn test_trailing_line_comment_keeps_newline() {
        let template = parse("a ## note\nb").unwrap();
        assert_eq!(template.nodes, vec![Node::Text("a \nb".into())]);
    }

    #[test]
    fn test_if_elseif_else_structure() {
        let template = parse("#if($a)A#elseif($b)B#else C#end").unwrap();
        let [Node::If { branches, otherwise }] = template.nodes.as_slice() else {
            panic!("expected one if node, got {:?}", template.nodes);
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(otherwise.as_deref(), Some(&[Node::Text(" C".into())][..]));
    }

    #[test]
    fn test_missing_end_points_at_opener() {
        let err = parse("line\n#if($a)\nbody").unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.message(), "Missing #end for #if");
        assert_eq!(err.position(), Position::new(2, 1));
    }

    #[test]
    fn test_unmatched_end_and_else() {
        assert_eq!(parse("x#end").unwrap_err().message(), "#end without an open block");
        assert_eq!(
            parse("#foreach($i in [1])#else#end").unwrap_err().message(),
            "#else without matching #if"
        );
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        let err = parse("#break").unwrap_err();
        assert_eq!(err.message(), "#break outside of #foreach");
        assert!(parse("#foreach($i in [1])#if($i)#break#end#end").is_ok());
    }

    #[test]
    fn test_macros_are_collected_and_later_wins() {
        let template = parse("#macro(a)one#end#macro(b $x)$x#end#macro(a)two#end").unwrap();
        assert_eq!(template.macro_names(), vec!["a", "b"]);
        assert_eq!(template.macros["a"].body, vec![Node::Text("two".into())]);
        assert!(template.is_empty());
    }

    #[test]
    fn test_scan_failure_becomes_parse_error_with_trace() {
        let err = parse("#set($x = )").unwrap_err();
        let crate::vtl::TemplateError::Parse { trace, .. } = &err else {
            panic!("expected parse error");
        };
        assert!(trace.starts_with("ParseError: Expected an expression, found ')'"));
        assert!(trace.contains("1 | #set($x = )"));
    }

    #[test]
    fn test_deep_blocks_are_rejected() {
        for opener in ["#if(true)", "#foreach($i in [1])", "#macro(m)"] {
            let source = format!("{}x{}", opener.repeat(10_000), "#end".repeat(10_000));
            let err = parse(&source).unwrap_err();
            assert!(err.is_parse());
            assert_eq!(err.message(), "Template nested too deeply");
            assert_eq!(err.position().column, MAX_NESTING * opener.len() + 1);
        }
    }

    #[test]
    fn test_blocks_up_to_the_limit_parse() {
        let source = format!("{}x{}", "#if(true)".repeat(MAX_NESTING), "#end".repeat(MAX_NESTING));
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn test_interpolated_blocks_count_toward_the_limit() {
        let inner = format!("{}x{}", "#if(true)".repeat(10_000), "#end".repeat(10_000));
        let err = parse(&format!("#set($s = \"{inner}\")")).unwrap_err();
        assert_eq!(err.message(), "Template nested too deeply");
    }

    #[test]
    fn test_unparsed_block_survives_gobbling() {
        let template = parse("#[[#if]]#\n").unwrap();
        assert_eq!(template.nodes, vec![Node::Text("#if\n".into())]);
    }
}
