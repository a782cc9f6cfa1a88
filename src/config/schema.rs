//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router
//! service. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::routing::{RouteDefinition, RouteHandler};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener and request limits.
    pub server: ServerConfig,

    /// Dispatcher settings.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route table, in registration order.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// A handler running longer than this is treated as declined.
    pub handler_timeout_ms: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One registered route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route name for named link generation.
    pub name: Option<String>,

    /// Path template, e.g. "products/{id:int}".
    pub template: String,

    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Values that select this route for unnamed link generation.
    #[serde(default)]
    pub required_values: BTreeMap<String, String>,

    /// Parameter to constraint list, e.g. `id = "int:min(1)"`.
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,

    #[serde(default)]
    pub data_tokens: BTreeMap<String, String>,

    /// Participate in request matching.
    #[serde(default = "default_true")]
    pub inbound: bool,

    /// Participate in link generation.
    #[serde(default = "default_true")]
    pub outbound: bool,

    #[serde(default)]
    pub response: ResponseConfig,
}

impl RouteConfig {
    /// The endpoint name reported for requests matched by this route.
    pub fn endpoint_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{index} {}", self.template),
        }
    }

    /// The engine-level definition of this route, dispatching to `handler`.
    pub fn definition(&self, handler: Arc<dyn RouteHandler>) -> RouteDefinition {
        let mut definition = RouteDefinition::new(self.template.clone(), handler);
        definition.name = self.name.clone();
        definition.defaults = self.defaults.iter().collect();
        definition.required_values = self.required_values.iter().collect();
        definition.constraint_exprs = self.constraint_exprs();
        definition.data_tokens = self.data_tokens.iter().collect();
        definition.inbound = self.inbound;
        definition.outbound = self.outbound;
        definition
    }

    /// Split each constraint list on `:` outside parentheses.
    pub fn constraint_exprs(&self) -> Vec<(String, String)> {
        self.constraints
            .iter()
            .flat_map(|(parameter, list)| {
                split_constraint_list(list)
                    .into_iter()
                    .map(move |expr| (parameter.clone(), expr))
            })
            .collect()
    }
}

fn default_true() -> bool {
    true
}

/// What the front-end returns for a matched route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseConfig {
    /// A fixed body; `{name}` is replaced by the matched route value.
    Content {
        #[serde(default = "default_content_status")]
        status: u16,
        #[serde(default)]
        body: String,
    },
    /// A redirect to a generated link.
    Redirect {
        /// Target route name; unnamed generation when absent.
        redirect_route: Option<String>,
        #[serde(default)]
        redirect_values: BTreeMap<String, String>,
        #[serde(default = "default_redirect_status")]
        status: u16,
    },
}

impl Default for ResponseConfig {
    fn default() -> Self {
        ResponseConfig::Content {
            status: default_content_status(),
            body: String::new(),
        }
    }
}

impl ResponseConfig {
    pub fn status(&self) -> u16 {
        match self {
            ResponseConfig::Content { status, .. } | ResponseConfig::Redirect { status, .. } => *status,
        }
    }
}

fn default_content_status() -> u16 {
    200
}

fn default_redirect_status() -> u16 {
    302
}

fn split_constraint_list(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RouterConfig = toml::from_str(
            r#"
            [[routes]]
            template = "products/{id}"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(config.dispatch.handler_timeout_ms.is_none());
        let route = &config.routes[0];
        assert!(route.inbound && route.outbound);
        assert_eq!(route.response, ResponseConfig::default());
        assert_eq!(route.endpoint_name(0), "#0 products/{id}");
    }

    #[test]
    fn test_response_kinds() {
        let config: RouterConfig = toml::from_str(
            r#"
            [[routes]]
            template = "old/{id}"
            response = { kind = "redirect", redirect_route = "item", redirect_values = { tab = "info" } }

            [[routes]]
            name = "item"
            template = "items/{id}"
            response = { kind = "content", body = "item {id}" }
            "#,
        )
        .unwrap();
        assert!(matches!(
            &config.routes[0].response,
            ResponseConfig::Redirect { redirect_route: Some(r), status: 302, .. } if r == "item"
        ));
        assert_eq!(config.routes[1].response.status(), 200);
    }

    #[test]
    fn test_constraint_lists_split_outside_parentheses() {
        let config: RouterConfig = toml::from_str(
            r#"
            [[routes]]
            template = "a/{id}/{code}"
            constraints = { id = "int:min(1)", code = "regex(^[a-z]{2}:[0-9]$)" }
            "#,
        )
        .unwrap();
        let exprs = config.routes[0].constraint_exprs();
        assert_eq!(
            exprs,
            vec![
                ("code".to_string(), "regex(^[a-z]{2}:[0-9]$)".to_string()),
                ("id".to_string(), "int".to_string()),
                ("id".to_string(), "min(1)".to_string()),
            ]
        );
    }
}
