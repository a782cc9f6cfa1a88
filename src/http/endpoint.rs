//! Configured endpoints and the config-to-router bridge.
//!
//! # Responsibilities
//! - Terminal handler that records which configured response to send
//! - Build a `TreeRouter` from a `RouterConfig`
//! - Render content bodies and redirect targets for a matched request

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::config::{ResponseConfig, RouterConfig};
use crate::routing::{
    BuildError, RouteContext, RouteError, RouteHandler, RouteValues, TreeRouteBuilder, TreeRouter,
    VirtualPathContext, VirtualPathData,
};

/// Accepts every request routed to it and attaches its response to the context.
#[derive(Debug, Clone)]
pub struct ConfiguredEndpoint {
    name: String,
    response: Arc<ResponseConfig>,
}

impl ConfiguredEndpoint {
    pub fn new(name: impl Into<String>, response: ResponseConfig) -> Self {
        Self {
            name: name.into(),
            response: Arc::new(response),
        }
    }
}

impl RouteHandler for ConfiguredEndpoint {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            context.extensions.insert(Arc::clone(&self.response));
            context.set_endpoint(self.name.clone());
            Ok(())
        })
    }
}

/// Build version `version` of the route table described by `config`.
pub fn build_router(config: &RouterConfig, version: u64) -> Result<TreeRouter, BuildError> {
    let mut builder = TreeRouteBuilder::new();
    if let Some(ms) = config.dispatch.handler_timeout_ms {
        builder = builder.handler_timeout(Duration::from_millis(ms));
    }
    for (index, route) in config.routes.iter().enumerate() {
        let handler = Arc::new(ConfiguredEndpoint::new(
            route.endpoint_name(index),
            route.response.clone(),
        ));
        builder.add(route.definition(handler));
    }
    builder.build(version)
}

/// Replace `{name}` placeholders with route values. Unknown names are left as is.
pub fn render_body(body: &str, values: &RouteValues) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Generate the target of a redirect response, using the matched values as ambient values.
pub fn redirect_target(
    router: &TreeRouter,
    context: &RouteContext,
    route: Option<&str>,
    values: &RouteValues,
) -> Result<Option<VirtualPathData>, RouteError> {
    let mut link = VirtualPathContext::new(values)
        .with_ambient_values(context.route_data.values())
        .with_extensions(&context.extensions);
    if let Some(name) = route {
        link = link.with_route_name(name);
    }
    router.generate_path(&link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body_substitutes_values() {
        let values = RouteValues::from([("id", "42")]);
        assert_eq!(render_body("item {id} of {total}", &values), "item 42 of {total}");
        assert_eq!(render_body("open {brace", &values), "open {brace");
    }

    #[tokio::test]
    async fn test_configured_endpoint_attaches_response() {
        let endpoint = ConfiguredEndpoint::new("home", ResponseConfig::default());
        let mut context = RouteContext::for_path("/");
        endpoint.route(&mut context).await.unwrap();
        assert_eq!(context.endpoint(), Some("home"));
        assert!(context.extensions.get::<Arc<ResponseConfig>>().is_some());
    }
}
