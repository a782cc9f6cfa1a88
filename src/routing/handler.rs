//! Handler capability and the per-call contexts passed to it.
//!
//! # Responsibilities
//! - Define `RouteHandler`, implemented by terminal endpoints and nested routers
//! - Carry per-request dispatch state (`RouteContext`)
//! - Carry link generation inputs and results (`VirtualPathContext`, `VirtualPathData`)
//!
//! # Design Decisions
//! - A request counts as handled once a handler resolves an endpoint on the context
//! - Handler invocation is async; the future borrows the context mutably
//! - Short-circuit link generation defaults to "not handled"

use std::fmt;

use axum::http::Extensions;
use futures_util::future::BoxFuture;
use url::Url;

use crate::routing::error::RouteError;
use crate::routing::path::RequestPath;
use crate::routing::route_data::RouteData;
use crate::routing::values::RouteValues;

/// Something a route entry delegates to once its template and constraints match.
pub trait RouteHandler: Send + Sync + fmt::Debug {
    /// Try to handle the request. Leaving `context.endpoint()` unset declines it.
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>>;

    /// Produce a fully formed path instead of the entry's own template.
    fn virtual_path(
        &self,
        _context: &VirtualPathContext<'_>,
    ) -> Result<Option<VirtualPathData>, RouteError> {
        Ok(None)
    }
}

/// Per-request dispatch state.
#[derive(Debug)]
pub struct RouteContext {
    path: RequestPath,
    pub route_data: RouteData,
    /// Request-scoped data visible to constraints and handlers.
    pub extensions: Extensions,
    endpoint: Option<String>,
}

impl RouteContext {
    pub fn new(path: RequestPath) -> Self {
        Self {
            path,
            route_data: RouteData::new(),
            extensions: Extensions::new(),
            endpoint: None,
        }
    }

    /// Tokenize `path` and build a context for it.
    pub fn for_path(path: &str) -> Self {
        Self::new(RequestPath::parse(path))
    }

    pub fn path(&self) -> &RequestPath {
        &self.path
    }

    /// The endpoint that handled the request, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = Some(endpoint.into());
    }

    pub fn is_handled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub(crate) fn take_endpoint(&mut self) -> Option<String> {
        self.endpoint.take()
    }

    pub(crate) fn replace_endpoint(&mut self, endpoint: Option<String>) {
        self.endpoint = endpoint;
    }
}

/// A terminal handler: accepts every request routed to it.
#[derive(Debug, Clone)]
pub struct EndpointHandler {
    name: String,
}

impl EndpointHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RouteHandler for EndpointHandler {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            context.set_endpoint(self.name.clone());
            Ok(())
        })
    }
}

static NO_VALUES: RouteValues = RouteValues::new();

/// Inputs to link generation.
#[derive(Debug, Clone, Copy)]
pub struct VirtualPathContext<'a> {
    route_name: Option<&'a str>,
    values: &'a RouteValues,
    ambient_values: &'a RouteValues,
    extensions: Option<&'a Extensions>,
}

impl<'a> VirtualPathContext<'a> {
    /// Generate from explicit `values` with no ambient values and no route name.
    pub fn new(values: &'a RouteValues) -> Self {
        Self {
            route_name: None,
            values,
            ambient_values: &NO_VALUES,
            extensions: None,
        }
    }

    pub fn with_route_name(mut self, name: &'a str) -> Self {
        self.route_name = Some(name);
        self
    }

    /// Values of the currently executing route.
    pub fn with_ambient_values(mut self, ambient: &'a RouteValues) -> Self {
        self.ambient_values = ambient;
        self
    }

    pub fn with_extensions(mut self, extensions: &'a Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn route_name(&self) -> Option<&'a str> {
        self.route_name
    }

    pub fn values(&self) -> &'a RouteValues {
        self.values
    }

    pub fn ambient_values(&self) -> &'a RouteValues {
        self.ambient_values
    }

    pub fn extensions(&self) -> Option<&'a Extensions> {
        self.extensions
    }
}

/// A generated link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPathData {
    path: String,
    query: String,
    router_version: u64,
    data_tokens: RouteValues,
}

impl VirtualPathData {
    pub fn new(path: impl Into<String>, router_version: u64) -> Self {
        Self {
            path: path.into(),
            query: String::new(),
            router_version,
            data_tokens: RouteValues::new(),
        }
    }

    pub(crate) fn with_query(mut self, query: String) -> Self {
        self.query = query;
        self
    }

    pub(crate) fn with_data_tokens(mut self, data_tokens: RouteValues) -> Self {
        self.data_tokens = data_tokens;
        self
    }

    /// The rendered path, starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Encoded query string without the leading `?`; empty when there is none.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Version of the router that produced this link.
    pub fn router_version(&self) -> u64 {
        self.router_version
    }

    pub fn data_tokens(&self) -> &RouteValues {
        &self.data_tokens
    }

    /// Path plus query string.
    pub fn to_url_string(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// Resolve this link beneath `base`, treating `base` as a directory.
    pub fn join(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        base.join(self.to_url_string().trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_endpoint_handler_resolves() {
        let handler = EndpointHandler::new("home");
        let mut context = RouteContext::for_path("/");
        handler.route(&mut context).await.unwrap();
        assert_eq!(context.endpoint(), Some("home"));
        assert!(context.is_handled());
    }

    #[test]
    fn test_join_under_base_path() {
        let link = VirtualPathData::new("/products/Buy", 1).with_query("id=5".into());
        let base = Url::parse("https://shop.example.com/store").unwrap();
        assert_eq!(
            link.join(&base).unwrap().as_str(),
            "https://shop.example.com/store/products/Buy?id=5"
        );
        assert_eq!(link.to_url_string(), "/products/Buy?id=5");
    }
}
