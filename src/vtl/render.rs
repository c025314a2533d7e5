//! Evaluates a parsed [`Template`] against a JSON context.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value, json};

use crate::diagnostic::Position;

use super::EngineOptions;
use super::ast::{BinaryOp, Expr, Node, Reference, Segment, Template, UnaryOp};
use super::error::{Failure, Fallible, MAX_NESTING, TemplateError};
use super::methods::{self, MethodError};
use super::value::{self, Num, type_name};

/// Local variables of one `#foreach` iteration or macro call.
type Frame = HashMap<String, Value>;

/// Deepest nesting of block bodies and expressions during a render. Parsing
/// already bounds one template body, so only macro calls get this far.
const MAX_RENDER_DEPTH: usize = 2 * MAX_NESTING;

/// Deepest list or map a template may store, matching the decoder's limit.
const MAX_VALUE_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Break,
    Stop,
}

/// One step along a reference path.
enum Key {
    Name(String),
    Index(Value),
}

impl Key {
    fn text(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Index(Value::String(s)) => s.clone(),
            Self::Index(other) => value::display(other),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

pub(crate) fn render(
    template: &Template,
    context: &Value,
    options: &EngineOptions,
) -> Result<String, TemplateError> {
    let globals = match context {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let mut renderer = Renderer {
        template,
        options,
        globals,
        frames: Vec::new(),
        macro_depth: 0,
        depth: 0,
        call_pos: Position::default(),
        out: String::new(),
    };
    renderer
        .nodes(&template.nodes)
        .map_err(|failure| TemplateError::render(failure, template.source()))?;
    Ok(renderer.out)
}

struct Renderer<'a> {
    template: &'a Template,
    options: &'a EngineOptions,
    globals: Map<String, Value>,
    frames: Vec<Frame>,
    macro_depth: usize,
    depth: usize,
    /// Innermost macro call, where a runaway nesting gets reported.
    call_pos: Position,
    out: String,
}

impl Renderer<'_> {
    fn descend(&mut self) -> Fallible<()> {
        if self.depth >= MAX_RENDER_DEPTH {
            return Err(Failure::too_deep(self.call_pos));
        }
        self.depth += 1;
        Ok(())
    }

    fn nodes(&mut self, nodes: &[Node]) -> Fallible<Flow> {
        self.descend()?;
        let flow = self.render_nodes(nodes);
        self.depth -= 1;
        flow
    }

    fn render_nodes(&mut self, nodes: &[Node]) -> Fallible<Flow> {
        for node in nodes {
            let flow = match node {
                Node::Text(text) => {
                    self.out.push_str(text);
                    Flow::Continue
                }
                Node::Reference(reference) => {
                    self.output_reference(reference)?;
                    Flow::Continue
                }
                Node::Set {
                    target,
                    value: expr,
                    pos,
                } => {
                    self.assign(target, expr, *pos)?;
                    Flow::Continue
                }
                Node::If {
                    branches,
                    otherwise,
                } => {
                    let mut chosen = otherwise.as_deref();
                    for (condition, body) in branches {
                        if value::truthy(&self.eval(condition)?) {
                            chosen = Some(body.as_slice());
                            break;
                        }
                    }
                    match chosen {
                        Some(body) => self.nodes(body)?,
                        None => Flow::Continue,
                    }
                }
                Node::Foreach {
                    var,
                    iterable,
                    body,
                } => self.foreach(var, iterable, body)?,
                Node::MacroCall {
                    name,
                    args,
                    literal,
                    pos,
                } => self.call_macro(name, args, literal, *pos)?,
                Node::Break => Flow::Break,
                Node::Stop => Flow::Stop,
            };
            if flow != Flow::Continue {
                return Ok(flow);
            }
        }
        Ok(Flow::Continue)
    }

    fn output_reference(&mut self, reference: &Reference) -> Fallible<()> {
        match self.reference(reference)? {
            Some(value) if !value.is_null() => self.out.push_str(&value::display(&value)),
            _ if reference.quiet => {}
            Some(_) => self.out.push_str(&reference.literal),
            None if self.options.strict => {
                return Err(Failure::new(
                    format!("Undefined reference '{}'", reference.literal),
                    reference.pos,
                ));
            }
            None => self.out.push_str(&reference.literal),
        }
        Ok(())
    }

    // --- Scope ---

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Follow `keys` from the variable `name`, borrowing as long as possible.
    fn resolve(&self, name: &str, keys: &[Key]) -> Option<Cow<'_, Value>> {
        let mut current = Cow::Borrowed(self.lookup(name)?);
        for key in keys {
            current = match current {
                Cow::Borrowed(value) => step(value, key)?,
                Cow::Owned(value) => Cow::Owned(step(&value, key)?.into_owned()),
            };
        }
        Some(current)
    }

    fn resolve_mut(&mut self, name: &str, keys: &[Key]) -> Option<&mut Value> {
        let root = match self.frames.iter().rposition(|frame| frame.contains_key(name)) {
            Some(idx) => self.frames[idx].get_mut(name)?,
            None => self.globals.get_mut(name)?,
        };
        keys.iter().try_fold(root, step_mut)
    }

    /// Store a plain variable in the innermost frame that has it, else globally.
    fn store(&mut self, name: &str, value: Value) {
        match self.frames.iter().rposition(|frame| frame.contains_key(name)) {
            Some(idx) => {
                self.frames[idx].insert(name.to_string(), value);
            }
            None => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    /// The variable `name`, created as an empty map when missing or null.
    fn root_for_assignment(&mut self, name: &str) -> &mut Value {
        let root = match self.frames.iter().rposition(|frame| frame.contains_key(name)) {
            Some(idx) => self.frames[idx].entry(name.to_string()).or_insert(Value::Null),
            None => self.globals.entry(name).or_insert(Value::Null),
        };
        if root.is_null() {
            *root = Value::Object(Map::new());
        }
        root
    }

    // --- Directives ---

    fn assign(&mut self, target: &Reference, expr: &Expr, pos: Position) -> Fallible<()> {
        let value = self.eval(expr)?;
        check_storable(&value, pos)?;
        let keys = self.path_keys(&target.segments)?;
        let Some((last, intermediate)) = keys.split_last() else {
            self.store(&target.name, value);
            return Ok(());
        };
        let mut place = self.root_for_assignment(&target.name);
        for key in intermediate {
            place = descend_or_create(place, key).map_err(|message| Failure::new(message, pos))?;
        }
        set_key(place, last, value).map_err(|message| Failure::new(message, pos))
    }

    fn foreach(&mut self, var: &str, iterable: &Expr, body: &[Node]) -> Fallible<Flow> {
        let items: Vec<Value> = match self.eval(iterable)? {
            Value::Array(items) => items,
            Value::Object(map) => map.into_iter().map(|(_, item)| item).collect(),
            _ => return Ok(Flow::Continue),
        };
        let len = items.len();
        self.frames.push(Frame::new());
        let mut outcome = Ok(Flow::Continue);
        for (index, item) in items.into_iter().enumerate() {
            if let Some(frame) = self.frames.last_mut() {
                frame.insert(var.to_string(), item);
                frame.insert("foreach".to_string(), loop_state(index, len));
                frame.insert("velocityCount".to_string(), Value::from(index + 1));
            }
            match self.nodes(body) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Break) => break,
                other => {
                    outcome = other;
                    break;
                }
            }
        }
        self.frames.pop();
        outcome
    }

    fn call_macro(
        &mut self,
        name: &str,
        args: &[Expr],
        literal: &str,
        pos: Position,
    ) -> Fallible<Flow> {
        let template = self.template;
        let Some(def) = template.macros.get(name) else {
            if self.options.strict {
                return Err(Failure::new(format!("Unknown macro '#{name}'"), pos));
            }
            self.out.push_str(literal);
            return Ok(Flow::Continue);
        };
        if args.len() > def.params.len() {
            return Err(Failure::new(
                format!(
                    "Macro '#{}' takes {} argument(s), got {}",
                    def.name,
                    def.params.len(),
                    args.len()
                ),
                pos,
            ));
        }
        if self.macro_depth >= self.options.max_depth {
            return Err(Failure::new(
                format!(
                    "Macro '#{}' nested deeper than {} levels",
                    def.name, self.options.max_depth
                ),
                pos,
            ));
        }

        let mut values = self.eval_all(args)?.into_iter();
        let frame: Frame = def
            .params
            .iter()
            .map(|param| (param.clone(), values.next().unwrap_or(Value::Null)))
            .collect();
        self.frames.push(frame);
        self.macro_depth += 1;
        let outer_call = std::mem::replace(&mut self.call_pos, pos);
        let flow = self.nodes(&def.body);
        self.call_pos = outer_call;
        self.macro_depth -= 1;
        self.frames.pop();
        match flow? {
            Flow::Stop => Ok(Flow::Stop),
            Flow::Continue | Flow::Break => Ok(Flow::Continue),
        }
    }

    // --- References ---

    fn path_keys(&mut self, segments: &[Segment]) -> Fallible<Vec<Key>> {
        segments
            .iter()
            .map(|segment| match segment {
                Segment::Property(name) => Ok(Key::Name(name.clone())),
                Segment::Index(expr) => self.eval(expr).map(Key::Index),
                Segment::Method { name, .. } => Err(Failure::new(
                    format!("Unexpected method call '{name}'"),
                    Position::default(),
                )),
            })
            .collect()
    }

    /// Value of a reference, or `None` when it is undefined.
    fn reference(&mut self, reference: &Reference) -> Fallible<Option<Value>> {
        let segments = &reference.segments;
        let split = segments
            .iter()
            .position(|segment| matches!(segment, Segment::Method { .. }))
            .unwrap_or(segments.len());
        let keys = self.path_keys(&segments[..split])?;
        let Some((Segment::Method { name, args }, rest)) = segments[split..].split_first() else {
            return Ok(self.resolve(&reference.name, &keys).map(Cow::into_owned));
        };

        // The first call may change the variable it was made on.
        let args = self.eval_all(args)?;
        let Some(receiver) = self
            .resolve(&reference.name, &keys)
            .filter(|receiver| !receiver.is_null())
        else {
            return Ok(None);
        };
        let receiver_type = type_name(&receiver);
        let result = if methods::is_mutating(&receiver, name) {
            drop(receiver);
            check_all_storable(&args, reference.pos)?;
            match self.resolve_mut(&reference.name, &keys) {
                Some(place) => methods::call_mut(place, name, &args),
                None => return Ok(None),
            }
        } else {
            methods::call(&receiver, name, &args)
        };
        match self.method_outcome(result, name, receiver_type, reference.pos)? {
            Some(value) => self.rest_of_reference(value, rest, reference.pos),
            None => Ok(None),
        }
    }

    /// Apply the segments after the first method call to its result.
    fn rest_of_reference(
        &mut self,
        start: Value,
        rest: &[Segment],
        pos: Position,
    ) -> Fallible<Option<Value>> {
        let mut current = start;
        for segment in rest {
            if current.is_null() {
                return Ok(None);
            }
            let next = match segment {
                Segment::Property(name) => {
                    step(&current, &Key::Name(name.clone())).map(Cow::into_owned)
                }
                Segment::Index(expr) => {
                    let key = Key::Index(self.eval(expr)?);
                    step(&current, &key).map(Cow::into_owned)
                }
                Segment::Method { name, args } => {
                    let args = self.eval_all(args)?;
                    let receiver_type = type_name(&current);
                    let result = if methods::is_mutating(&current, name) {
                        check_all_storable(&args, pos)?;
                        methods::call_mut(&mut current, name, &args)
                    } else {
                        methods::call(&current, name, &args)
                    };
                    self.method_outcome(result, name, receiver_type, pos)?
                }
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn method_outcome(
        &self,
        result: Result<Value, MethodError>,
        name: &str,
        receiver_type: &str,
        pos: Position,
    ) -> Fallible<Option<Value>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(MethodError::Unknown) if self.options.strict => Err(Failure::new(
                format!("Unknown method '{name}' on {receiver_type}"),
                pos,
            )),
            Err(MethodError::Unknown) => Ok(None),
            Err(MethodError::Invalid(message)) => {
                Err(Failure::new(format!("Method '{name}' failed: {message}"), pos))
            }
        }
    }

    // --- Expressions ---

    fn eval_all(&mut self, exprs: &[Expr]) -> Fallible<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn eval(&mut self, expr: &Expr) -> Fallible<Value> {
        self.descend()?;
        let value = self.eval_expr(expr);
        self.depth -= 1;
        value
    }

    fn eval_expr(&mut self, expr: &Expr) -> Fallible<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Interpolated(nodes) => {
                let saved = std::mem::take(&mut self.out);
                let flow = self.nodes(nodes);
                let text = std::mem::replace(&mut self.out, saved);
                flow?;
                Ok(Value::String(text))
            }
            Expr::Reference(reference) => Ok(self.reference(reference)?.unwrap_or(Value::Null)),
            Expr::List(items) => self.eval_all(items).map(Value::Array),
            Expr::Range { from, to, pos } => self.range(from, to, *pos),
            Expr::Map(entries) => {
                let mut map = Map::new();
                for (key, item) in entries {
                    let key = match self.eval(key)? {
                        Value::Null => {
                            return Err(Failure::new("Map keys cannot be null", Position::default()));
                        }
                        Value::String(s) => s,
                        other => value::display(&other),
                    };
                    let item = self.eval(item)?;
                    map.insert(key, item);
                }
                Ok(Value::Object(map))
            }
            Expr::Unary { op, expr, pos } => {
                let operand = self.eval(expr)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value::truthy(&operand))),
                    UnaryOp::Neg => value::negate(&operand).map_err(|m| Failure::new(m, *pos)),
                }
            }
            Expr::Binary { op, lhs, rhs, pos } => self.binary(*op, lhs, rhs, *pos),
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, pos: Position) -> Fallible<Value> {
        let left = self.eval(lhs)?;
        match op {
            BinaryOp::Or if value::truthy(&left) => return Ok(Value::Bool(true)),
            BinaryOp::And if !value::truthy(&left) => return Ok(Value::Bool(false)),
            _ => {}
        }
        let right = self.eval(rhs)?;
        let result = match op {
            BinaryOp::Or | BinaryOp::And => Value::Bool(value::truthy(&right)),
            BinaryOp::Eq => Value::Bool(value::values_equal(&left, &right)),
            BinaryOp::Ne => Value::Bool(!value::values_equal(&left, &right)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = value::compare(&left, &right).ok_or_else(|| {
                    Failure::new(
                        format!(
                            "Cannot compare {} with {} using '{}'",
                            type_name(&left),
                            type_name(&right),
                            op.symbol()
                        ),
                        pos,
                    )
                })?;
                Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }
            _ => value::arithmetic(op, &left, &right).map_err(|m| Failure::new(m, pos))?,
        };
        Ok(result)
    }

    fn range(&mut self, from: &Expr, to: &Expr, pos: Position) -> Fallible<Value> {
        let (start, end) = (self.eval(from)?, self.eval(to)?);
        let (Some(Num::Int(a)), Some(Num::Int(b))) = (Num::of(&start), Num::of(&end)) else {
            return Err(Failure::new(
                format!(
                    "Range bounds must be integers, got {} and {}",
                    type_name(&start),
                    type_name(&end)
                ),
                pos,
            ));
        };
        let len = a.abs_diff(b).saturating_add(1);
        if usize::try_from(len).map_or(true, |n| n > self.options.max_range) {
            return Err(Failure::new(
                format!(
                    "Range [{a}..{b}] has {len} items, more than the limit of {}",
                    self.options.max_range
                ),
                pos,
            ));
        }
        let items: Vec<Value> = if a <= b {
            (a..=b).map(Value::from).collect()
        } else {
            (b..=a).rev().map(Value::from).collect()
        };
        Ok(Value::Array(items))
    }
}

/// Refuse to keep a value nested deeper than [`MAX_VALUE_DEPTH`], so that
/// printing, comparing and dropping it stay within the stack.
fn check_storable(value: &Value, pos: Position) -> Fallible<()> {
    if value::nesting_depth(value) > MAX_VALUE_DEPTH {
        return Err(Failure::new(
            format!("Value nested deeper than {MAX_VALUE_DEPTH} levels"),
            pos,
        ));
    }
    Ok(())
}

fn check_all_storable(values: &[Value], pos: Position) -> Fallible<()> {
    values.iter().try_for_each(|value| check_storable(value, pos))
}

fn loop_state(index: usize, len: usize) -> Value {
    json!({
        "index": index,
        "count": index + 1,
        "hasNext": index + 1 < len,
        "first": index == 0,
        "last": index + 1 == len,
    })
}

fn array_index(key: &Value) -> Option<usize> {
    match Num::of(key)? {
        Num::Int(i) => usize::try_from(i).ok(),
        Num::Float(_) => None,
    }
}

fn step<'v>(value: &'v Value, key: &Key) -> Option<Cow<'v, Value>> {
    match (value, key) {
        (Value::Object(map), _) => map.get(&key.text()).map(Cow::Borrowed),
        (Value::Array(items), Key::Index(index)) => {
            items.get(array_index(index)?).map(Cow::Borrowed)
        }
        (_, Key::Name(name)) => getter(value, name).map(Cow::Owned),
        _ => None,
    }
}

fn step_mut<'v>(value: &'v mut Value, key: &Key) -> Option<&'v mut Value> {
    match (value, key) {
        (Value::Object(map), _) => map.get_mut(&key.text()),
        (Value::Array(items), Key::Index(index)) => items.get_mut(array_index(index)?),
        _ => None,
    }
}

/// `$text.empty` reads `isEmpty()`, like a bean property.
fn getter(value: &Value, property: &str) -> Option<Value> {
    let mut chars = property.chars();
    let first = chars.next()?;
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    ["is", "get"]
        .iter()
        .find_map(|prefix| methods::call(value, &format!("{prefix}{capitalized}"), &[]).ok())
}

fn descend_or_create<'v>(place: &'v mut Value, key: &Key) -> Result<&'v mut Value, String> {
    match place {
        Value::Object(map) => {
            let child = map.entry(key.text()).or_insert(Value::Null);
            if child.is_null() {
                *child = Value::Object(Map::new());
            }
            Ok(child)
        }
        Value::Array(items) => {
            let len = items.len();
            match key {
                Key::Index(index) => array_index(index)
                    .and_then(|idx| items.get_mut(idx))
                    .ok_or_else(|| format!("Index {key} out of bounds for length {len}")),
                Key::Name(name) => Err(format!("Cannot set property '{name}' on list")),
            }
        }
        other => Err(format!("Cannot set property '{key}' on {}", type_name(other))),
    }
}

fn set_key(place: &mut Value, key: &Key, value: Value) -> Result<(), String> {
    match place {
        Value::Object(map) => {
            map.insert(key.text(), value);
            Ok(())
        }
        Value::Array(items) => {
            let len = items.len();
            let slot = match key {
                Key::Index(index) => array_index(index).and_then(|idx| items.get_mut(idx)),
                Key::Name(_) => None,
            };
            match slot {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(format!("Cannot set '{key}' on list of length {len}")),
            }
        }
        other => Err(format!("Cannot set property '{key}' on {}", type_name(other))),
    }
}
