use thiserror::Error;

use crate::diagnostic::{Diagnostic, Position, format_trace};

/// A template failed to parse or to render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template source is not valid VTL.
    #[error("Parse error at {pos}: {message}")]
    Parse {
        message: String,
        pos: Position,
        trace: String,
    },

    /// The template parsed but could not be evaluated against the context.
    #[error("Render error at {pos}: {message}")]
    Render {
        message: String,
        pos: Position,
        trace: String,
    },
}

impl TemplateError {
    pub(crate) fn parse(failure: Failure, source: &str) -> Self {
        let trace = format_trace("ParseError", &failure.message, source, failure.pos);
        Self::Parse {
            message: failure.message,
            pos: failure.pos,
            trace,
        }
    }

    pub(crate) fn render(failure: Failure, source: &str) -> Self {
        let trace = format_trace("RenderError", &failure.message, source, failure.pos);
        Self::Render {
            message: failure.message,
            pos: failure.pos,
            trace,
        }
    }

    /// The message without position information.
    pub fn message(&self) -> &str {
        match self {
            Self::Parse { message, .. } | Self::Render { message, .. } => message,
        }
    }

    /// Where in the template the failure happened.
    pub const fn position(&self) -> Position {
        match self {
            Self::Parse { pos, .. } | Self::Render { pos, .. } => *pos,
        }
    }

    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

impl Diagnostic for TemplateError {
    fn trace(&self) -> Option<String> {
        match self {
            Self::Parse { trace, .. } | Self::Render { trace, .. } => Some(trace.clone()),
        }
    }
}

/// A failure before it is tied to the template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub message: String,
    pub pos: Position,
}

impl Failure {
    pub fn new(message: impl Into<String>, pos: Position) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }

    pub fn too_deep(pos: Position) -> Self {
        Self::new(TOO_DEEP, pos)
    }

    /// Nesting failures are never recovered from by backtracking.
    pub fn is_too_deep(&self) -> bool {
        self.message == TOO_DEEP
    }
}

/// Deepest nesting of blocks, sub-expressions and reference segments the
/// parser accepts.
pub(crate) const MAX_NESTING: usize = 64;

const TOO_DEEP: &str = "Template nested too deeply";

pub(crate) type Fallible<T> = Result<T, Failure>;
