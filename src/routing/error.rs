//! Routing error taxonomy.
//!
//! Structural and constraint rejections are not errors; they only move on to
//! the next candidate. Only construction problems and faults raised by handlers
//! or constraint predicates are represented here.

use thiserror::Error;

use crate::template::TemplateError;

/// Errors raised while building a router.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid template '{template}': {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("unknown constraint '{constraint}' on parameter '{parameter}' of '{template}'")]
    UnknownConstraint {
        template: String,
        parameter: String,
        constraint: String,
    },

    #[error("invalid argument for constraint '{constraint}': {reason}")]
    InvalidConstraintArgument { constraint: String, reason: String },

    #[error("default for '{parameter}' in '{template}' conflicts with another value declared for it")]
    ConflictingDefault { template: String, parameter: String },

    #[error("route name '{name}' is used by templates '{first}' and '{second}'")]
    AmbiguousRouteName {
        name: String,
        first: String,
        second: String,
    },
}

/// A constraint predicate failed to evaluate (as opposed to rejecting a value).
#[derive(Debug, Clone, Error)]
#[error("constraint on '{parameter}' failed: {message}")]
pub struct ConstraintError {
    pub parameter: String,
    pub message: String,
}

impl ConstraintError {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// A fault during dispatch or link generation. Never caught by the router.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("handler failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RouteError {
    pub fn handler(message: impl Into<String>) -> Self {
        RouteError::Handler(message.into())
    }

    /// Wrap an underlying error raised by a handler, keeping it as the source.
    pub fn from_source(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        RouteError::Source(error.into())
    }
}
