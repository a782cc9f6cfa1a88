//! Route table construction.
//!
//! # Responsibilities
//! - Parse templates and resolve inline and declared constraints
//! - Merge inline and declared defaults
//! - Build the matching trie, decision tree and name index for one version
//!
//! # Design Decisions
//! - Every construction problem is reported here, never at request time
//! - Registration order is kept as the final tie-break
//! - A declared default may repeat an inline default but not contradict it
//! - Required values that are not parameters become defaults, so they filter
//!   explicit values during named generation too

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::routing::constraint::{ConstraintResolver, ParameterConstraints, ResolveError};
use crate::routing::entry::{InboundRouteEntry, OutboundRouteEntry, RouteDefinition};
use crate::routing::error::BuildError;
use crate::routing::link::{LinkGenerationDecisionTree, OutboundMatch};
use crate::routing::named::NamedEntries;
use crate::routing::router::TreeRouter;
use crate::routing::tree::UrlMatchingTree;
use crate::routing::values::{route_parts_equal, RouteValues};
use crate::template::RouteTemplate;

/// Collects route definitions and builds a `TreeRouter`.
#[derive(Debug, Default)]
pub struct TreeRouteBuilder {
    resolver: ConstraintResolver,
    definitions: Vec<RouteDefinition>,
    handler_timeout: Option<Duration>,
}

impl TreeRouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom resolver for inline constraint names.
    pub fn with_resolver(mut self, resolver: ConstraintResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Treat a handler as declined if it runs longer than `timeout`.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub fn route(mut self, definition: RouteDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn add(&mut self, definition: RouteDefinition) -> &mut Self {
        self.definitions.push(definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn build(self, version: u64) -> Result<TreeRouter, BuildError> {
        let mut inbound = Vec::new();
        let mut outbound = Vec::new();

        for (order, definition) in self.definitions.iter().enumerate() {
            let template = RouteTemplate::parse(&definition.template).map_err(|source| {
                BuildError::InvalidTemplate {
                    template: definition.template.clone(),
                    source,
                }
            })?;
            let defaults = merge_defaults(&template, &definition.defaults)?;
            let defaults = merge_required_values(&template, defaults, &definition.required_values)?;
            let constraints = self.resolve_constraints(&template, definition)?;

            if definition.inbound {
                inbound.push(Arc::new(InboundRouteEntry::new(
                    template.clone(),
                    defaults.clone(),
                    constraints.clone(),
                    definition.data_tokens.clone(),
                    Arc::clone(&definition.handler),
                    definition.name.clone(),
                    order,
                )));
            }
            if definition.outbound {
                let entry = OutboundRouteEntry {
                    template,
                    defaults,
                    required_link_values: definition.required_values.clone(),
                    constraints,
                    data_tokens: definition.data_tokens.clone(),
                    handler: Arc::clone(&definition.handler),
                    name: definition.name.clone(),
                    order,
                };
                outbound.push(Arc::new(OutboundMatch::new(Arc::new(entry))));
            }
        }

        let named = NamedEntries::new(&outbound)?;
        let tree = UrlMatchingTree::new(&inbound);
        let link_tree = LinkGenerationDecisionTree::new(&outbound);

        info!(
            version,
            inbound = inbound.len(),
            outbound = outbound.len(),
            named = named.len(),
            "Route table built"
        );

        Ok(TreeRouter {
            version,
            inbound,
            outbound,
            tree,
            link_tree,
            named,
            handler_timeout: self.handler_timeout,
        })
    }

    fn resolve_constraints(
        &self,
        template: &RouteTemplate,
        definition: &RouteDefinition,
    ) -> Result<Vec<ParameterConstraints>, BuildError> {
        let mut resolved: Vec<ParameterConstraints> = Vec::new();

        let inline = template
            .parameters()
            .flat_map(|p| p.inline_constraints.iter().map(move |c| (p.name.as_str(), c.as_str())));
        let declared = definition
            .constraint_exprs
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()));

        for (parameter, expr) in inline.chain(declared) {
            let constraint = self.resolver.resolve(expr).map_err(|e| match e {
                ResolveError::Unknown => BuildError::UnknownConstraint {
                    template: definition.template.clone(),
                    parameter: parameter.to_string(),
                    constraint: expr.to_string(),
                },
                ResolveError::InvalidArgument(reason) => BuildError::InvalidConstraintArgument {
                    constraint: expr.to_string(),
                    reason,
                },
            })?;
            slot(&mut resolved, template, parameter).constraints.push(constraint);
        }

        for (parameter, constraint) in &definition.constraints {
            slot(&mut resolved, template, parameter)
                .constraints
                .push(Arc::clone(constraint));
        }
        Ok(resolved)
    }
}

fn slot<'a>(
    resolved: &'a mut Vec<ParameterConstraints>,
    template: &RouteTemplate,
    parameter: &str,
) -> &'a mut ParameterConstraints {
    let index = match resolved
        .iter()
        .position(|c| c.parameter.eq_ignore_ascii_case(parameter))
    {
        Some(index) => index,
        None => {
            resolved.push(ParameterConstraints {
                parameter: parameter.to_string(),
                optional: template.parameter(parameter).is_some_and(|p| p.is_optional()),
                constraints: Vec::new(),
            });
            resolved.len() - 1
        }
    };
    &mut resolved[index]
}

fn merge_defaults(template: &RouteTemplate, declared: &RouteValues) -> Result<RouteValues, BuildError> {
    let mut defaults: RouteValues = template.inline_defaults().collect();
    for (key, value) in declared.iter() {
        match template.parameter(key).and_then(|p| p.default.as_deref()) {
            Some(inline) if !route_parts_equal(inline, value) => {
                return Err(BuildError::ConflictingDefault {
                    template: template.text().to_string(),
                    parameter: key.to_string(),
                });
            }
            Some(_) => {}
            None => {
                defaults.insert(key, value);
            }
        }
    }
    Ok(defaults)
}

/// Fold required link values into `defaults`. A required value must agree
/// with any default already declared for its key.
fn merge_required_values(
    template: &RouteTemplate,
    mut defaults: RouteValues,
    required: &RouteValues,
) -> Result<RouteValues, BuildError> {
    for (key, value) in required.iter() {
        match defaults.get(key) {
            Some(default) if !route_parts_equal(default, value) => {
                return Err(BuildError::ConflictingDefault {
                    template: template.text().to_string(),
                    parameter: key.to_string(),
                });
            }
            Some(_) => {}
            // a parameter stays mandatory when matching; only selection keys become defaults
            None if template.parameter(key).is_some() => {}
            None => {
                defaults.insert(key, value);
            }
        }
    }
    Ok(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::EndpointHandler;

    fn def(template: &str) -> RouteDefinition {
        RouteDefinition::new(template, Arc::new(EndpointHandler::new(template)))
    }

    #[test]
    fn test_invalid_template_fails_build() {
        let err = TreeRouteBuilder::new().route(def("a/{id")).build(1).unwrap_err();
        assert!(matches!(err, BuildError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_unknown_constraint_fails_build() {
        let err = TreeRouteBuilder::new().route(def("a/{id:nope}")).build(1).unwrap_err();
        assert!(matches!(err, BuildError::UnknownConstraint { ref constraint, .. } if constraint == "nope"));

        let err = TreeRouteBuilder::new()
            .route(def("a/{id}").constraint_expr("id", "min(x)"))
            .build(1)
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConstraintArgument { .. }));
    }

    #[test]
    fn test_conflicting_default_fails_build() {
        let err = TreeRouteBuilder::new()
            .route(def("{action=Index}").default_value("action", "About"))
            .build(1)
            .unwrap_err();
        assert!(matches!(err, BuildError::ConflictingDefault { .. }));

        assert!(TreeRouteBuilder::new()
            .route(def("{action=Index}").default_value("action", "index"))
            .build(1)
            .is_ok());
    }

    #[test]
    fn test_required_values_become_defaults() {
        let router = TreeRouteBuilder::new()
            .route(def("store/{action}").required_value("controller", "Store"))
            .build(1)
            .unwrap();
        let entry = &router.outbound_entries()[0].entry;
        assert_eq!(entry.defaults.get("controller"), Some("Store"));

        let err = TreeRouteBuilder::new()
            .route(
                def("store/{action}")
                    .required_value("controller", "Store")
                    .default_value("controller", "Blog"),
            )
            .build(1)
            .unwrap_err();
        assert!(matches!(err, BuildError::ConflictingDefault { ref parameter, .. } if parameter == "controller"));
    }

    #[test]
    fn test_direction_flags_split_entries() {
        let router = TreeRouteBuilder::new()
            .route(def("in").inbound_only())
            .route(def("out").outbound_only())
            .route(def("both"))
            .build(1)
            .unwrap();
        assert_eq!(router.inbound_entries().len(), 2);
        assert_eq!(router.outbound_entries().len(), 2);
    }

    #[test]
    fn test_constrained_parameter_precedence() {
        let router = TreeRouteBuilder::new()
            .route(def("{id:int}"))
            .route(def("{slug}").constraint_expr("slug", "alpha"))
            .route(def("{any}"))
            .build(1)
            .unwrap();
        let kinds: Vec<_> = router
            .inbound_entries()
            .iter()
            .map(|e| e.segment_kind(0))
            .collect();
        use crate::routing::entry::SegmentKind::*;
        assert_eq!(kinds, vec![ConstrainedParameter, ConstrainedParameter, Parameter]);
    }
}
