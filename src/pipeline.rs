//! The render pipeline: data text and template text in, one result out.
//!
//! The data is decoded as JSON first. If that fails the template is never
//! looked at. Otherwise the template is compiled and rendered with the decoded
//! value as its context. Every failure is captured in the [`RenderResult`];
//! nothing escapes to the caller.

use std::time::Instant;

use serde::Serialize;

use crate::diagnostic;
use crate::engine::TemplateEngine;
use crate::vtl::Velocity;

/// Which of the three outcomes a [`RenderResult`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputTitle {
    #[serde(rename = "JSON Parse Error")]
    JsonParseError,
    #[serde(rename = "Template Compile Error")]
    TemplateCompileError,
    #[serde(rename = "Result")]
    Result,
}

impl OutputTitle {
    pub const fn label(self) -> &'static str {
        match self {
            Self::JsonParseError => "JSON Parse Error",
            Self::TemplateCompileError => "Template Compile Error",
            Self::Result => "Result",
        }
    }

    pub const fn is_error(self) -> bool {
        !matches!(self, Self::Result)
    }
}

impl std::fmt::Display for OutputTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What the output pane shows.
///
/// Built only through [`RenderResult::success`], [`RenderResult::decode_failure`]
/// and [`RenderResult::template_failure`], so the title always agrees with the
/// error flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    text: String,
    title: OutputTitle,
    is_error: bool,
}

impl RenderResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text.into(), OutputTitle::Result)
    }

    pub fn decode_failure(diagnostic: impl Into<String>) -> Self {
        Self::new(diagnostic.into(), OutputTitle::JsonParseError)
    }

    pub fn template_failure(diagnostic: impl Into<String>) -> Self {
        Self::new(diagnostic.into(), OutputTitle::TemplateCompileError)
    }

    const fn new(text: String, title: OutputTitle) -> Self {
        Self {
            text,
            title,
            is_error: title.is_error(),
        }
    }

    /// Rendered output, or the diagnostic when this is an error.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn title(&self) -> OutputTitle {
        self.title
    }

    pub const fn is_error(&self) -> bool {
        self.is_error
    }
}

impl Default for RenderResult {
    fn default() -> Self {
        Self::success(String::new())
    }
}

/// Render `template_text` against `data_text` with the default VTL engine.
pub fn render(data_text: &str, template_text: &str) -> RenderResult {
    render_with(&Velocity::default(), data_text, template_text)
}

/// Render with any [`TemplateEngine`].
pub fn render_with<E: TemplateEngine>(
    engine: &E,
    data_text: &str,
    template_text: &str,
) -> RenderResult {
    let started = Instant::now();
    let result = run(engine, data_text, template_text);
    tracing::trace!(
        elapsed = ?started.elapsed(),
        title = result.title.label(),
        "render pipeline finished"
    );
    result
}

fn run<E: TemplateEngine>(engine: &E, data_text: &str, template_text: &str) -> RenderResult {
    let context = match diagnostic::decode_json(data_text) {
        Ok(context) => context,
        Err(err) => {
            tracing::debug!(position = %err.position(), "data is not valid JSON");
            return RenderResult::decode_failure(diagnostic::extract(&err));
        }
    };

    let output = engine
        .parse_template(template_text)
        .and_then(|ast| engine.render_template(&ast, &context));
    match output {
        Ok(text) => RenderResult::success(text),
        Err(err) => {
            tracing::debug!(error = %err, "template failed");
            RenderResult::template_failure(diagnostic::extract(&err))
        }
    }
}
