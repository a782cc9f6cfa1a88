//! Route registration records.
//!
//! # Responsibilities
//! - Describe a route as registered (`RouteDefinition`)
//! - Hold the resolved inbound and outbound entries built from it
//! - Classify template segments for the matching trie and compute precedence

use std::sync::Arc;

use crate::routing::constraint::{ParameterConstraints, RouteConstraint};
use crate::routing::handler::RouteHandler;
use crate::routing::values::RouteValues;
use crate::template::{RouteTemplate, TemplateSegment};

/// Segment kinds in precedence order: earlier variants are more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentKind {
    Literal,
    ConstrainedParameter,
    Parameter,
    ConstrainedCatchAll,
    CatchAll,
}

/// A route as supplied by the caller, before resolution.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub template: String,
    pub name: Option<String>,
    /// Defaults beyond the template's inline `{name=value}` defaults.
    pub defaults: RouteValues,
    /// Values that select this route for unnamed link generation.
    pub required_values: RouteValues,
    /// Inline-syntax constraint expressions, e.g. `("id", "int")`.
    pub constraint_exprs: Vec<(String, String)>,
    pub constraints: Vec<(String, Arc<dyn RouteConstraint>)>,
    pub data_tokens: RouteValues,
    pub handler: Arc<dyn RouteHandler>,
    pub inbound: bool,
    pub outbound: bool,
}

impl RouteDefinition {
    pub fn new(template: impl Into<String>, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            template: template.into(),
            name: None,
            defaults: RouteValues::new(),
            required_values: RouteValues::new(),
            constraint_exprs: Vec::new(),
            constraints: Vec::new(),
            data_tokens: RouteValues::new(),
            handler,
            inbound: true,
            outbound: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    pub fn required_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_values.insert(key, value);
        self
    }

    pub fn constraint_expr(mut self, parameter: impl Into<String>, expr: impl Into<String>) -> Self {
        self.constraint_exprs.push((parameter.into(), expr.into()));
        self
    }

    pub fn constraint(mut self, parameter: impl Into<String>, constraint: Arc<dyn RouteConstraint>) -> Self {
        self.constraints.push((parameter.into(), constraint));
        self
    }

    pub fn data_token(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_tokens.insert(key, value);
        self
    }

    /// Register for request matching only.
    pub fn inbound_only(mut self) -> Self {
        self.outbound = false;
        self
    }

    /// Register for link generation only.
    pub fn outbound_only(mut self) -> Self {
        self.inbound = false;
        self
    }
}

/// A resolved route used for request matching.
#[derive(Debug)]
pub struct InboundRouteEntry {
    pub(crate) template: RouteTemplate,
    pub(crate) defaults: RouteValues,
    pub(crate) constraints: Vec<ParameterConstraints>,
    pub(crate) data_tokens: RouteValues,
    pub(crate) handler: Arc<dyn RouteHandler>,
    pub(crate) name: Option<String>,
    pub(crate) order: usize,
    pub(crate) precedence: Vec<SegmentKind>,
}

impl InboundRouteEntry {
    pub(crate) fn new(
        template: RouteTemplate,
        defaults: RouteValues,
        constraints: Vec<ParameterConstraints>,
        data_tokens: RouteValues,
        handler: Arc<dyn RouteHandler>,
        name: Option<String>,
        order: usize,
    ) -> Self {
        let precedence = (0..template.segments().len())
            .map(|i| segment_kind(&template, &constraints, i))
            .collect();
        Self {
            template,
            defaults,
            constraints,
            data_tokens,
            handler,
            name,
            order,
            precedence,
        }
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Registration sequence number.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    pub fn segment_kind(&self, index: usize) -> SegmentKind {
        self.precedence[index]
    }
}

/// A resolved route used for link generation.
#[derive(Debug)]
pub struct OutboundRouteEntry {
    pub(crate) template: RouteTemplate,
    pub(crate) defaults: RouteValues,
    pub(crate) required_link_values: RouteValues,
    pub(crate) constraints: Vec<ParameterConstraints>,
    pub(crate) data_tokens: RouteValues,
    pub(crate) handler: Arc<dyn RouteHandler>,
    pub(crate) name: Option<String>,
    pub(crate) order: usize,
}

impl OutboundRouteEntry {
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn required_link_values(&self) -> &RouteValues {
        &self.required_link_values
    }

    /// A key used only to select this route, not to fill its template.
    pub(crate) fn is_selection_only(&self, key: &str) -> bool {
        self.required_link_values.contains_key(key) && self.template.parameter(key).is_none()
    }
}

fn segment_kind(template: &RouteTemplate, constraints: &[ParameterConstraints], index: usize) -> SegmentKind {
    let param = match &template.segments()[index] {
        TemplateSegment::Literal(_) => return SegmentKind::Literal,
        TemplateSegment::Parameter(p) => p,
    };
    let constrained = constraints
        .iter()
        .any(|c| c.parameter.eq_ignore_ascii_case(&param.name) && !c.constraints.is_empty());
    match (param.is_catch_all(), constrained) {
        (false, true) => SegmentKind::ConstrainedParameter,
        (false, false) => SegmentKind::Parameter,
        (true, true) => SegmentKind::ConstrainedCatchAll,
        (true, false) => SegmentKind::CatchAll,
    }
}
