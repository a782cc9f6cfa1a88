//! Structural template matching.
//!
//! # Responsibilities
//! - Check that a tokenized path has the shape of a template
//! - Capture parameter values, filling gaps from defaults
//!
//! # Design Decisions
//! - Literal segments compare ASCII case-insensitively
//! - No constraint evaluation here; that happens after the rollback snapshot
//! - An empty path segment never satisfies a parameter
//! - A catch-all with nothing left to capture yields `""`

use crate::routing::path::RequestPath;
use crate::routing::values::RouteValues;
use crate::template::{RouteTemplate, TemplateSegment};

/// Match `path` against `template`, returning the captured values on success.
///
/// Defaults for keys that are not template parameters (for example a
/// `controller` value) are included in the result.
pub fn try_match(template: &RouteTemplate, defaults: &RouteValues, path: &RequestPath) -> Option<RouteValues> {
    let segments = template.segments();
    if path.len() > segments.len() && template.catch_all().is_none() {
        return None;
    }

    let mut values = RouteValues::new();
    for (key, value) in defaults.iter() {
        if template.parameter(key).is_none() {
            values.insert(key, value);
        }
    }

    for (index, segment) in segments.iter().enumerate() {
        match segment {
            TemplateSegment::Literal(text) => match path.get(index) {
                Some(actual) if actual.eq_ignore_ascii_case(text) => {}
                _ => return None,
            },
            TemplateSegment::Parameter(param) if param.is_catch_all() => {
                let rest = path.remainder(index);
                match defaults.get(&param.name) {
                    Some(default) if rest.is_empty() => values.insert(&param.name, default),
                    _ => values.insert(&param.name, rest),
                };
            }
            TemplateSegment::Parameter(param) => match path.get(index) {
                Some("") => return None,
                Some(actual) => {
                    values.insert(&param.name, actual);
                }
                None => {
                    if let Some(default) = defaults.get(&param.name) {
                        values.insert(&param.name, default);
                    } else if !param.is_optional() {
                        return None;
                    }
                }
            },
        }
    }
    Some(values)
}
