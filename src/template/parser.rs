//! Template string parsing.
//!
//! # Responsibilities
//! - Split template text into segments
//! - Parse `{name:constraint=default}`, `{name?}` and `{*name}` parameters
//! - Enforce structural rules (one catch-all, trailing; optional tail)

use thiserror::Error;

use super::{ParameterKind, TemplateParameter, TemplateSegment};

/// Errors raised while parsing a route template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("empty segment at position {0}")]
    EmptySegment(usize),

    #[error("unclosed parameter in segment '{0}'")]
    UnclosedParameter(String),

    #[error("segment '{0}' mixes literal text and a parameter")]
    ComplexSegment(String),

    #[error("literal segment '{0}' contains a brace")]
    InvalidLiteral(String),

    #[error("invalid parameter name '{0}'")]
    InvalidParameterName(String),

    #[error("parameter '{0}' appears more than once")]
    DuplicateParameter(String),

    #[error("catch-all parameter '{0}' must be the last segment")]
    CatchAllNotLast(String),

    #[error("catch-all parameter '{0}' cannot be optional or have a default")]
    InvalidCatchAll(String),

    #[error("parameter '{0}' cannot be both optional and have a default")]
    OptionalWithDefault(String),

    #[error("segment after optional parameter must also be optional: '{0}'")]
    RequiredAfterOptional(String),

    #[error("unbalanced parentheses in constraint of parameter '{0}'")]
    UnbalancedConstraint(String),
}

const RESERVED: &[char] = &['{', '}', '/', '?', '*', '=', ':'];

pub(super) fn parse_segments(text: &str) -> Result<Vec<TemplateSegment>, TemplateError> {
    let trimmed = text
        .strip_prefix("~/")
        .or_else(|| text.strip_prefix('/'))
        .unwrap_or(text);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<&str> = trimmed.split('/').collect();
    let mut segments = Vec::with_capacity(raw.len());
    for (index, part) in raw.iter().enumerate() {
        if part.is_empty() {
            return Err(TemplateError::EmptySegment(index));
        }
        segments.push(parse_segment(part)?);
    }

    validate(&segments)?;
    Ok(segments)
}

fn parse_segment(part: &str) -> Result<TemplateSegment, TemplateError> {
    if !part.contains(['{', '}']) {
        return Ok(TemplateSegment::Literal(part.to_string()));
    }
    if !part.starts_with('{') {
        return Err(if part.contains('{') {
            TemplateError::ComplexSegment(part.to_string())
        } else {
            TemplateError::InvalidLiteral(part.to_string())
        });
    }
    let Some(body) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
        return Err(if part.ends_with('}') || !part.contains('}') {
            TemplateError::UnclosedParameter(part.to_string())
        } else {
            TemplateError::ComplexSegment(part.to_string())
        });
    };
    parse_parameter(body).map(TemplateSegment::Parameter)
}

fn parse_parameter(body: &str) -> Result<TemplateParameter, TemplateError> {
    let (catch_all, body) = match body.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let name_end = body.find([':', '=', '?']).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() || name.contains(RESERVED) {
        return Err(TemplateError::InvalidParameterName(name.to_string()));
    }

    let mut rest = &body[name_end..];
    let mut inline_constraints = Vec::new();
    let mut default = None;
    let mut optional = false;

    while let Some(marker) = rest.chars().next() {
        match marker {
            ':' => {
                let expr = &rest[1..];
                let end = constraint_end(expr)
                    .ok_or_else(|| TemplateError::UnbalancedConstraint(name.to_string()))?;
                inline_constraints.push(expr[..=end].to_string());
                rest = &expr[end + 1..];
            }
            '=' => {
                let value = &rest[1..];
                if value.ends_with('?') {
                    return Err(TemplateError::OptionalWithDefault(name.to_string()));
                }
                default = Some(value.to_string());
                rest = "";
            }
            '?' if rest.len() == 1 => {
                optional = true;
                rest = "";
            }
            _ => return Err(TemplateError::InvalidParameterName(body.to_string())),
        }
    }

    let kind = match (catch_all, optional) {
        (true, false) if default.is_none() => ParameterKind::CatchAll,
        (true, _) => return Err(TemplateError::InvalidCatchAll(name.to_string())),
        (false, true) => ParameterKind::Optional,
        (false, false) => ParameterKind::Standard,
    };

    Ok(TemplateParameter {
        name: name.to_string(),
        kind,
        default,
        inline_constraints,
    })
}

/// Index (within `text`) of the last byte of a constraint expression.
/// Stops at a top-level `:`, `=` or trailing `?`.
fn constraint_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ':' | '=' if depth == 0 => return i.checked_sub(1),
            '?' if depth == 0 && i + 1 == text.len() => return i.checked_sub(1),
            _ => {}
        }
    }
    if depth != 0 || text.is_empty() {
        return None;
    }
    Some(text.len() - 1)
}

fn validate(segments: &[TemplateSegment]) -> Result<(), TemplateError> {
    let mut seen: Vec<&str> = Vec::new();
    let mut optional_seen = false;
    let last = segments.len().saturating_sub(1);

    for (index, segment) in segments.iter().enumerate() {
        let param = match segment {
            TemplateSegment::Literal(text) => {
                if optional_seen {
                    return Err(TemplateError::RequiredAfterOptional(text.clone()));
                }
                continue;
            }
            TemplateSegment::Parameter(p) => p,
        };

        if seen.iter().any(|s| s.eq_ignore_ascii_case(&param.name)) {
            return Err(TemplateError::DuplicateParameter(param.name.clone()));
        }
        seen.push(&param.name);

        match param.kind {
            ParameterKind::CatchAll if index != last => {
                return Err(TemplateError::CatchAllNotLast(param.name.clone()));
            }
            ParameterKind::Optional => optional_seen = true,
            ParameterKind::Standard if optional_seen => {
                return Err(TemplateError::RequiredAfterOptional(param.name.clone()));
            }
            _ => {}
        }
    }
    Ok(())
}
