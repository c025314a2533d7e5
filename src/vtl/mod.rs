//! A Velocity Template Language engine.
//!
//! Covers the everyday subset of Apache Velocity 2.x: references with
//! properties, indexes and method calls, `#set`, `#if`/`#elseif`/`#else`,
//! `#foreach`, `#macro`, `#break`, `#stop`, comments and unparsed blocks.
//! Templates render against a `serde_json::Value` context.
//!
//! ```
//! use livevtl::vtl::{EngineOptions, Velocity};
//!
//! let engine = Velocity::new(EngineOptions::default());
//! let template = engine.parse("Hello, $name!").unwrap();
//! let context = serde_json::json!({ "name": "World" });
//! assert_eq!(engine.render(&template, &context).unwrap(), "Hello, World!");
//! ```

mod ast;
mod error;
mod expr;
mod methods;
mod parser;
mod render;
mod scanner;
mod value;

pub use ast::Template;
pub use error::TemplateError;

use serde_json::Value;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Fail on undefined references, unknown methods and unknown macros
    /// instead of rendering them literally.
    pub strict: bool,
    /// Most items an integer range such as `[1..10]` may produce.
    pub max_range: usize,
    /// Deepest allowed nesting of macro calls.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_range: 100_000,
            max_depth: 20,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Parses and renders VTL templates.
#[derive(Debug, Clone, Default)]
pub struct Velocity {
    options: EngineOptions,
}

impl Velocity {
    pub const fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Parse `source` into a reusable [`Template`].
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] when `source` is not valid VTL.
    pub fn parse(&self, source: &str) -> Result<Template, TemplateError> {
        parser::parse(source)
    }

    /// Render `template` with `context` bound as the variable scope.
    ///
    /// Only an object context contributes variables. Other JSON values are
    /// accepted and leave the scope empty.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] when evaluation fails, for example on
    /// division by zero or, in strict mode, an undefined reference.
    pub fn render(&self, template: &Template, context: &Value) -> Result<String, TemplateError> {
        render::render(template, context, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render_with(options: EngineOptions, source: &str, context: &Value) -> Result<String, TemplateError> {
        let engine = Velocity::new(options);
        let template = engine.parse(source)?;
        engine.render(&template, context)
    }

    fn render(source: &str, context: &Value) -> String {
        render_with(EngineOptions::default(), source, context).unwrap()
    }

    fn render_err(source: &str, context: &Value) -> TemplateError {
        render_with(EngineOptions::default(), source, context).unwrap_err()
    }

    fn strict_err(source: &str, context: &Value) -> TemplateError {
        render_with(EngineOptions::default().with_strict(true), source, context).unwrap_err()
    }

    #[test]
    fn test_hello_world() {
        assert_eq!(render("Hello, $name!", &json!({"name": "World"})), "Hello, World!");
    }

    #[test]
    fn test_plain_text_ignores_context() {
        assert_eq!(render("value", &json!(42)), "value");
        assert_eq!(render("", &json!({})), "");
    }

    #[test]
    fn test_undefined_reference_renders_literally() {
        let ctx = json!({"user": {"name": "Ann"}});
        assert_eq!(render("$missing ${missing} $user.age", &ctx), "$missing ${missing} $user.age");
        assert_eq!(render("[$!missing][$!{user.age}]", &ctx), "[][]");
    }

    #[test]
    fn test_null_value_renders_literally_unless_quiet() {
        let ctx = json!({"nothing": null});
        assert_eq!(render("$nothing|$!nothing", &ctx), "$nothing|");
    }

    #[test]
    fn test_properties_indexes_and_methods() {
        let ctx = json!({
            "user": {"name": "ann", "tags": ["a", "b", "c"]},
            "key": "name"
        });
        assert_eq!(render("$user.name.toUpperCase()", &ctx), "ANN");
        assert_eq!(render("$user.tags[1] $user.tags.size()", &ctx), "b 3");
        assert_eq!(render("$user[$key]", &ctx), "ann");
        assert_eq!(render("$user.tags.get(0).length()", &ctx), "1");
        assert_eq!(render("$user.tags.empty", &ctx), "false");
    }

    #[test]
    fn test_collections_render_java_style() {
        let ctx = json!({"list": [1, 2.5, "x"], "map": {"a": true}});
        assert_eq!(render("$list $map", &ctx), "[1, 2.5, x] {a=true}");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(render(r"\$name \#if", &json!({"name": "x"})), "$name #if");
    }

    #[test]
    fn test_set_and_arithmetic() {
        let out = render(
            "#set($a = 7)#set($b = $a / 2)#set($c = $a * 1.5)$b $c ${a}0 #set($s = 'n' + $a)$s",
            &json!({}),
        );
        assert_eq!(out, "3 10.5 70 n7");
    }

    #[test]
    fn test_set_creates_nested_maps() {
        let out = render("#set($cfg.db.port = 5432)$cfg.db.port $cfg", &json!({}));
        assert_eq!(out, "5432 {db={port=5432}}");
    }

    #[test]
    fn test_set_on_non_map_is_error() {
        let err = render_err("#set($n.x = 1)", &json!({"n": 3}));
        assert_eq!(err.message(), "Cannot set property 'x' on number");
        assert!(!err.is_parse());
    }

    #[test]
    fn test_set_undefined_value_stores_null() {
        assert_eq!(render("#set($x = $nope)$!x.", &json!({})), ".");
    }

    #[test]
    fn test_if_elseif_else() {
        let template = "#if($n > 10)big#elseif($n > 5)medium#else small#end";
        assert_eq!(render(template, &json!({"n": 11})), "big");
        assert_eq!(render(template, &json!({"n": 6})), "medium");
        assert_eq!(render(template, &json!({"n": 1})), " small");
    }

    #[test]
    fn test_truthiness_in_conditions() {
        let template = "#if($v)T#else F#end";
        assert_eq!(render(template, &json!({"v": ""})), " F");
        assert_eq!(render(template, &json!({"v": []})), " F");
        assert_eq!(render(template, &json!({"v": 0})), " F");
        assert_eq!(render(template, &json!({})), " F");
        assert_eq!(render(template, &json!({"v": "x"})), "T");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let ctx = json!({"a": true});
        assert_eq!(render("#if($a || 1 / 0)ok#end", &ctx), "ok");
        assert_eq!(render("#if(!$a && 1 / 0)bad#else ok#end", &ctx), " ok");
        assert_eq!(render("#if($a and not $b)yes#end", &ctx), "yes");
    }

    #[test]
    fn test_foreach_with_loop_variables() {
        let template = "#foreach($x in $items)$foreach.count:$x#if($foreach.hasNext), #end#end";
        assert_eq!(render(template, &json!({"items": ["a", "b", "c"]})), "1:a, 2:b, 3:c");
    }

    #[test]
    fn test_foreach_line_layout() {
        let template = "Items:\n#foreach($x in $items)\n  - $x\n#end\nDone";
        assert_eq!(
            render(template, &json!({"items": [1, 2]})),
            "Items:\n  - 1\n  - 2\nDone"
        );
    }

    #[test]
    fn test_foreach_over_map_values_and_ranges() {
        assert_eq!(render("#foreach($v in $m)$v#end", &json!({"m": {"a": 1, "b": 2}})), "12");
        assert_eq!(render("#foreach($i in [3..1])$i#end", &json!({})), "321");
        assert_eq!(render("#foreach($i in $none)x#end", &json!({})), "");
    }

    #[test]
    fn test_foreach_break_and_velocity_count() {
        let out = render(
            "#foreach($i in [1..10])#if($i > 3)#break#end$velocityCount#end",
            &json!({}),
        );
        assert_eq!(out, "123");
    }

    #[test]
    fn test_loop_variable_does_not_leak() {
        assert_eq!(render("#foreach($x in [1])#end$x", &json!({"x": "outer"})), "outer");
    }

    #[test]
    fn test_stop_keeps_prior_output() {
        assert_eq!(render("a#stop b", &json!({})), "a");
        assert_eq!(render("#foreach($i in [1..5])$i#if($i == 2)#stop#end#end!", &json!({})), "12");
    }

    #[test]
    fn test_mutating_methods_update_variables() {
        let out = render(
            "#set($l = [])#set($ok = $l.add('x'))#set($ok = $l.add('y'))$l $l.size()",
            &json!({}),
        );
        assert_eq!(out, "[x, y] 2");
        let out = render("#set($ignored = $m.put('k', 1))$m.k", &json!({"m": {}}));
        assert_eq!(out, "1");
    }

    #[test]
    fn test_interpolated_strings() {
        let ctx = json!({"name": "Ann"});
        assert_eq!(render("#set($g = \"Hi $name\")$g", &ctx), "Hi Ann");
        assert_eq!(render("#set($g = 'Hi $name')$g", &ctx), "Hi $name");
    }

    #[test]
    fn test_map_and_list_literals() {
        let out = render("#set($m = {'a': [1, 2], 'b': true})$m.a.get(1) $m.b", &json!({}));
        assert_eq!(out, "2 true");
    }

    #[test]
    fn test_macros() {
        let template = "#macro(greet $who)Hello, $who!#end#greet('Ann') #greet($name)";
        assert_eq!(render(template, &json!({"name": "Bob"})), "Hello, Ann! Hello, Bob!");
    }

    #[test]
    fn test_macro_missing_argument_renders_literal() {
        assert_eq!(render("#macro(show $a)[$a]#end#show()", &json!({"a": "outer"})), "[$a]");
    }

    #[test]
    fn test_unknown_macro_is_literal_unless_strict() {
        assert_eq!(render("#nosuch('a')", &json!({})), "#nosuch('a')");
        assert_eq!(strict_err("#nosuch('a')", &json!({})).message(), "Unknown macro '#nosuch'");
    }

    #[test]
    fn test_macro_recursion_limit() {
        let err = render_err("#macro(loop)#loop()#end#loop()", &json!({}));
        assert_eq!(err.message(), "Macro '#loop' nested deeper than 20 levels");
    }

    #[test]
    fn test_comments_and_unparsed_blocks() {
        let out = render("a## gone\nb#* also gone *#c#[[ $raw ]]#", &json!({}));
        assert_eq!(out, "a\nbc $raw ");
    }

    #[test]
    fn test_render_errors_carry_positions() {
        let err = render_err("ok\n  $x / 0 #set($y = 10 / $zero)", &json!({"zero": 0}));
        assert_eq!(err.message(), "Division by zero");
        assert_eq!(err.position(), crate::diagnostic::Position::new(2, 23));
    }

    #[test]
    fn test_comparison_type_mismatch() {
        let err = render_err("#if($a < 'b')#end", &json!({"a": 1}));
        assert_eq!(err.message(), "Cannot compare number with string using '<'");
    }

    #[test]
    fn test_range_limits() {
        let options = EngineOptions {
            max_range: 5,
            ..EngineOptions::default()
        };
        let err = render_with(options, "#foreach($i in [1..6])#end", &json!({})).unwrap_err();
        assert_eq!(err.message(), "Range [1..6] has 6 items, more than the limit of 5");
        let err = render_err("#foreach($i in [1..'x'])#end", &json!({}));
        assert!(err.message().starts_with("Range bounds must be integers"));
    }

    #[test]
    fn test_strict_mode_rejects_undefined_and_unknown_methods() {
        let err = strict_err("Hi $who", &json!({}));
        assert_eq!(err.message(), "Undefined reference '$who'");
        let err = strict_err("$s.shout()", &json!({"s": "x"}));
        assert_eq!(err.message(), "Unknown method 'shout' on string");
        assert_eq!(
            render_with(EngineOptions::default().with_strict(true), "[$!who]", &json!({})).unwrap(),
            "[]"
        );
    }

    #[test]
    fn test_unknown_method_renders_literal_when_lenient() {
        assert_eq!(render("$s.shout()", &json!({"s": "x"})), "$s.shout()");
    }

    #[test]
    fn test_invalid_method_arguments_are_errors() {
        let err = render_err("$l.get(5)", &json!({"l": [1]}));
        assert_eq!(err.message(), "Method 'get' failed: Index 5 out of bounds for length 1");
    }

    #[test]
    fn test_non_object_contexts_start_empty() {
        assert_eq!(render("$x", &json!([1, 2])), "$x");
        assert_eq!(render("$x", &json!(null)), "$x");
    }

    #[test]
    fn test_render_error_trace_has_snippet() {
        let err = render_err("#set($x = 1 / 0)", &json!({}));
        let trace = crate::diagnostic::extract(&err);
        assert!(trace.starts_with("RenderError: Division by zero\n --> line 1, column 13"));
        assert!(trace.contains("1 | #set($x = 1 / 0)"));
    }

    #[test]
    fn test_template_is_reusable() {
        let engine = Velocity::default();
        let template = engine.parse("$n").unwrap();
        assert_eq!(engine.render(&template, &json!({"n": 1})).unwrap(), "1");
        assert_eq!(engine.render(&template, &json!({"n": 2})).unwrap(), "2");
        assert_eq!(template.len(), 1);
    }

    #[test]
    fn test_nesting_near_the_limit_renders() {
        let depth = 60;
        let source = format!(
            "{}#set($x = {}[1]{}){}$x",
            "#if(true)".repeat(depth),
            "(".repeat(depth),
            ")".repeat(depth),
            "#end".repeat(depth)
        );
        assert_eq!(render(&source, &json!({})), "[1]");
    }

    #[test]
    fn test_runaway_macro_recursion_stops_at_render_depth() {
        let options = EngineOptions {
            max_depth: 10_000,
            ..EngineOptions::default()
        };
        let source = "#macro(down $n)#if($n > 0)#down($n - 1)#end#end\n#down(10000)";
        let err = render_with(options, source, &json!({})).unwrap_err();
        assert!(!err.is_parse());
        assert_eq!(err.message(), "Template nested too deeply");
        assert_eq!(err.position(), crate::diagnostic::Position::new(1, 27));
    }

    #[test]
    fn test_values_cannot_nest_without_bound() {
        let err = render_err(
            "#set($a = [])#foreach($i in [1..1000])#set($a = [$a])#end",
            &json!({}),
        );
        assert_eq!(err.message(), "Value nested deeper than 128 levels");

        let err = render_err(
            "#set($a = {})#foreach($i in [1..1000])#set($old = $a.put('k', $a))#end",
            &json!({}),
        );
        assert_eq!(err.message(), "Value nested deeper than 128 levels");
    }

    #[test]
    fn test_deeply_nested_data_can_be_stored() {
        let mut data = json!(1);
        for _ in 0..100 {
            data = json!([data]);
        }
        let context = json!({ "deep": data });
        assert_eq!(render("#set($copy = $deep)$copy.size()", &context), "1");
    }
}
