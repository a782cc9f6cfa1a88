//! Route template model.
//!
//! # Data Flow
//! ```text
//! "products/{id:int}/{*rest}"
//!     → parser.rs (split, classify, validate)
//!     → RouteTemplate (immutable segment list)
//!     → consumed by the trie builder, matcher and binder
//! ```
//!
//! # Design Decisions
//! - One segment is either all literal or exactly one parameter (no complex segments)
//! - Inline constraints are kept as raw text; resolution happens at router build time
//! - Templates are immutable after parsing

mod parser;

pub use parser::TemplateError;

use std::fmt;

/// How a parameter consumes path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Exactly one segment.
    Standard,
    /// Zero or one trailing segment.
    Optional,
    /// Every remaining segment, joined with `/`.
    CatchAll,
}

/// A `{name...}` segment of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default: Option<String>,
    /// Inline constraint expressions, e.g. `int` or `range(1,10)`.
    pub inline_constraints: Vec<String>,
}

impl TemplateParameter {
    pub fn is_optional(&self) -> bool {
        self.kind == ParameterKind::Optional
    }

    pub fn is_catch_all(&self) -> bool {
        self.kind == ParameterKind::CatchAll
    }

    /// A parameter that must receive a value for the template to bind.
    pub fn is_required(&self) -> bool {
        self.kind == ParameterKind::Standard
    }
}

/// One slash-delimited component of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Parameter(TemplateParameter),
}

impl TemplateSegment {
    pub fn as_parameter(&self) -> Option<&TemplateParameter> {
        match self {
            TemplateSegment::Parameter(p) => Some(p),
            TemplateSegment::Literal(_) => None,
        }
    }
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    text: String,
    segments: Vec<TemplateSegment>,
}

impl RouteTemplate {
    /// Parse a template string such as `"products/{id:int}"`.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let segments = parser::parse_segments(text)?;
        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    /// The template text as registered.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    pub fn parameters(&self) -> impl Iterator<Item = &TemplateParameter> {
        self.segments.iter().filter_map(TemplateSegment::as_parameter)
    }

    /// Case-insensitive parameter lookup.
    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameters().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn catch_all(&self) -> Option<&TemplateParameter> {
        self.parameters().find(|p| p.is_catch_all())
    }

    /// Inline `{name=value}` defaults.
    pub fn inline_defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters()
            .filter_map(|p| p.default.as_deref().map(|d| (p.name.as_str(), d)))
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
