//! The seam between the render pipeline and a template engine.
//!
//! The pipeline only needs two operations: turn template text into something
//! renderable, and render that against a decoded context. Anything that can
//! do both, and whose failures are [`Diagnostic`]s, can drive the playground.

use serde_json::Value;

use crate::diagnostic::Diagnostic;
use crate::vtl::{Template, TemplateError, Velocity};

/// A template engine as seen by the render pipeline.
pub trait TemplateEngine {
    /// Parsed form of a template.
    type Ast;
    /// Failure from either stage.
    type Error: Diagnostic;

    /// Compile `source` into an AST.
    ///
    /// # Errors
    ///
    /// Returns the engine's error when `source` is not a valid template.
    fn parse_template(&self, source: &str) -> Result<Self::Ast, Self::Error>;

    /// Render a compiled template against `context`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error when evaluation fails.
    fn render_template(&self, ast: &Self::Ast, context: &Value) -> Result<String, Self::Error>;
}

impl TemplateEngine for Velocity {
    type Ast = Template;
    type Error = TemplateError;

    fn parse_template(&self, source: &str) -> Result<Template, TemplateError> {
        self.parse(source)
    }

    fn render_template(&self, ast: &Template, context: &Value) -> Result<String, TemplateError> {
        self.render(ast, context)
    }
}
