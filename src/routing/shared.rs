//! Atomically replaceable router handle.
//!
//! # Design Decisions
//! - Readers load an `Arc<TreeRouter>` and keep it for the whole call, so a swap
//!   never changes the table under an in-flight request
//! - Versions must strictly increase; a stale build is rejected

use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tracing::info;

use crate::routing::error::RouteError;
use crate::routing::handler::{RouteContext, RouteHandler, VirtualPathContext, VirtualPathData};
use crate::routing::router::TreeRouter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    #[error("router version {offered} is not newer than current version {current}")]
    StaleVersion { current: u64, offered: u64 },
}

/// The currently published router.
#[derive(Debug)]
pub struct SharedRouter {
    current: ArcSwap<TreeRouter>,
}

impl SharedRouter {
    pub fn new(router: TreeRouter) -> Self {
        metrics::gauge!("router_version").set(router.version() as f64);
        Self {
            current: ArcSwap::from_pointee(router),
        }
    }

    pub fn load(&self) -> Arc<TreeRouter> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// The version a rebuild should use.
    pub fn next_version(&self) -> u64 {
        self.version() + 1
    }

    /// Publish `router`, returning the version it replaced.
    pub fn swap(&self, router: TreeRouter) -> Result<u64, SwapError> {
        let next = Arc::new(router);
        loop {
            let current = self.current.load();
            if next.version() <= current.version() {
                return Err(SwapError::StaleVersion {
                    current: current.version(),
                    offered: next.version(),
                });
            }
            let previous = self.current.compare_and_swap(&*current, Arc::clone(&next));
            if Arc::ptr_eq(&*previous, &*current) {
                info!(from = current.version(), to = next.version(), "Router swapped");
                metrics::gauge!("router_version").set(next.version() as f64);
                return Ok(current.version());
            }
        }
    }
}

impl RouteHandler for SharedRouter {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move {
            let router = self.load();
            router.route_request(context).await.map(|_| ())
        })
    }

    fn virtual_path(&self, context: &VirtualPathContext<'_>) -> Result<Option<VirtualPathData>, RouteError> {
        self.load().generate_path(context)
    }
}
