//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use tree_router::routing::{
    EndpointHandler, RouteContext, RouteDefinition, RouteError, RouteHandler, TreeRouteBuilder, TreeRouter,
};

/// A terminal handler that resolves to `name`.
pub fn endpoint(name: &str) -> Arc<dyn RouteHandler> {
    Arc::new(EndpointHandler::new(name))
}

/// Build a router from `(template, endpoint)` pairs in registration order.
pub fn router(routes: &[(&str, &str)]) -> TreeRouter {
    let mut builder = TreeRouteBuilder::new();
    for (template, name) in routes {
        builder.add(RouteDefinition::new(*template, endpoint(name)));
    }
    builder.build(1).unwrap()
}

/// Writes a marker value and a data token, then declines.
#[derive(Debug)]
pub struct Declining;

impl RouteHandler for Declining {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            context.route_data.set_value("touched", "yes");
            context.route_data.set_data_token("declined-by", "declining");
            Ok(())
        })
    }
}

/// Resolves only after sleeping.
#[derive(Debug)]
pub struct Slow {
    pub name: &'static str,
    pub delay: Duration,
}

impl RouteHandler for Slow {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            context.set_endpoint(self.name);
            Ok(())
        })
    }
}

/// Always fails.
#[derive(Debug)]
pub struct Faulty;

impl RouteHandler for Faulty {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            context.route_data.set_value("partial", "1");
            Err(RouteError::handler("backend exploded"))
        })
    }
}

/// Fails with an I/O error as the underlying cause.
#[derive(Debug)]
pub struct Unreachable;

impl RouteHandler for Unreachable {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            context.route_data.set_value("attempt", "1");
            let cause = io::Error::new(io::ErrorKind::ConnectionRefused, "upstream refused connection");
            Err(RouteError::from_source(cause))
        })
    }
}

/// Dispatch `path` and return the context afterwards.
pub async fn dispatch(router: &TreeRouter, path: &str) -> (bool, RouteContext) {
    let mut context = RouteContext::for_path(path);
    let handled = router.route_request(&mut context).await.unwrap();
    (handled, context)
}
