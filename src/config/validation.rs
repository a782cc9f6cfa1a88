//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Build every route on its own to surface template and constraint errors
//! - Check referential integrity (redirects name existing routes)
//! - Validate value ranges (statuses, addresses, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{ResponseConfig, RouterConfig};
use crate::routing::{BuildError, EndpointHandler, TreeRouteBuilder};

/// One semantic problem in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("request timeout must be greater than zero")]
    RequestTimeout,

    #[error("handler timeout must be greater than zero")]
    HandlerTimeout,

    #[error("route #{index}: {source}")]
    Route {
        index: usize,
        #[source]
        source: BuildError,
    },

    #[error("route #{index}: status {status} is not a valid {expected} status")]
    Status {
        index: usize,
        status: u16,
        expected: &'static str,
    },

    #[error("route #{index}: redirect target '{name}' is not a named route")]
    UnknownRedirectRoute { index: usize, name: String },

    #[error("route name '{name}' is used by templates '{first}' and '{second}'")]
    AmbiguousRouteName {
        name: String,
        first: String,
        second: String,
    },
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.dispatch.handler_timeout_ms == Some(0) {
        errors.push(ValidationError::HandlerTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    // lowercased name -> template of the first outbound route using it
    let mut names: HashMap<String, &str> = HashMap::new();
    for route in &config.routes {
        let Some(name) = &route.name else { continue };
        if !route.outbound {
            continue;
        }
        match names.get(&name.to_ascii_lowercase()) {
            Some(first) if !first.eq_ignore_ascii_case(&route.template) => {
                errors.push(ValidationError::AmbiguousRouteName {
                    name: name.clone(),
                    first: first.to_string(),
                    second: route.template.clone(),
                });
            }
            Some(_) => {}
            None => {
                names.insert(name.to_ascii_lowercase(), &route.template);
            }
        }
    }

    for (index, route) in config.routes.iter().enumerate() {
        let handler = Arc::new(EndpointHandler::new(route.endpoint_name(index)));
        if let Err(source) = TreeRouteBuilder::new().route(route.definition(handler)).build(0) {
            errors.push(ValidationError::Route { index, source });
        }

        match &route.response {
            ResponseConfig::Content { status, .. } if !(200..=599).contains(status) => {
                errors.push(ValidationError::Status {
                    index,
                    status: *status,
                    expected: "content",
                });
            }
            ResponseConfig::Redirect {
                redirect_route,
                status,
                ..
            } => {
                if !(300..=399).contains(status) {
                    errors.push(ValidationError::Status {
                        index,
                        status: *status,
                        expected: "redirect",
                    });
                }
                if let Some(target) = redirect_route {
                    if !names.contains_key(&target.to_ascii_lowercase()) {
                        errors.push(ValidationError::UnknownRedirectRoute {
                            index,
                            name: target.clone(),
                        });
                    }
                }
            }
            ResponseConfig::Content { .. } => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> RouterConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = parse(
            r#"
            [[routes]]
            name = "product"
            template = "products/{id:int}"

            [[routes]]
            template = "p/{id}"
            response = { kind = "redirect", redirect_route = "product" }
            "#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_are_reported() {
        let config = parse(
            r#"
            [server]
            bind_address = "nowhere"

            [[routes]]
            template = "a/{id:nope}"

            [[routes]]
            template = "b/{id"

            [[routes]]
            template = "c"
            response = { kind = "redirect", redirect_route = "missing", status = 200 }
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(matches!(errors[0], ValidationError::BindAddress(_)));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Route { index: 0, source: BuildError::UnknownConstraint { .. } }
        )));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownRedirectRoute { .. })));
    }

    #[test]
    fn test_ambiguous_names_rejected() {
        let config = parse(
            r#"
            [[routes]]
            name = "default"
            template = "a/{x}"

            [[routes]]
            name = "Default"
            template = "b/{x}"
            "#,
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::AmbiguousRouteName { .. }));
    }
}
