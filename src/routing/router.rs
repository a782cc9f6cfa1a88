//! Request dispatch and link generation over one immutable route table.
//!
//! # Responsibilities
//! - Walk the matching trie and try each candidate entry in order
//! - Roll back route values when a candidate's constraints or handler decline
//! - Generate links by name or by required values
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Structural and constraint rejections are not errors; faults propagate
//! - A handler that times out counts as declined
//! - Named generation never falls back to unnamed candidates
//! - A router is also a `RouteHandler`, so routers nest

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::routing::constraint::{self, RouteDirection};
use crate::routing::entry::{InboundRouteEntry, OutboundRouteEntry};
use crate::routing::error::RouteError;
use crate::routing::handler::{RouteContext, RouteHandler, VirtualPathContext, VirtualPathData};
use crate::routing::link::{LinkGenerationDecisionTree, OutboundMatch};
use crate::routing::matcher;
use crate::routing::named::NamedEntries;
use crate::routing::tree::UrlMatchingTree;
use crate::routing::values::{route_parts_equal, RouteValues};

/// A built, versioned route table.
#[derive(Debug)]
pub struct TreeRouter {
    pub(crate) version: u64,
    pub(crate) inbound: Vec<Arc<InboundRouteEntry>>,
    pub(crate) outbound: Vec<Arc<OutboundMatch>>,
    pub(crate) tree: UrlMatchingTree,
    pub(crate) link_tree: LinkGenerationDecisionTree,
    pub(crate) named: NamedEntries,
    pub(crate) handler_timeout: Option<Duration>,
}

impl TreeRouter {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn inbound_entries(&self) -> &[Arc<InboundRouteEntry>] {
        &self.inbound
    }

    pub fn outbound_entries(&self) -> &[Arc<OutboundMatch>] {
        &self.outbound
    }

    /// Dispatch `context` to the most specific matching route.
    ///
    /// Returns `Ok(true)` once a handler resolves an endpoint. On `Ok(false)`
    /// the route data is exactly as it was on entry.
    pub async fn route_request(&self, context: &mut RouteContext) -> Result<bool, RouteError> {
        let path = context.path().clone();
        let mut nodes = self.tree.enumerate();

        while let Some(node) = nodes.next(&path) {
            for entry in node.matches() {
                let Some(values) = matcher::try_match(&entry.template, &entry.defaults, &path) else {
                    continue;
                };

                let snapshot = context.route_data.snapshot();
                for (key, value) in values.iter() {
                    context.route_data.set_value(key, value);
                }
                for (key, value) in entry.data_tokens.iter() {
                    context.route_data.set_data_token(key, value);
                }

                let accepted = constraint::match_all(
                    &entry.constraints,
                    context.route_data.values(),
                    Some(&context.extensions),
                    self,
                    RouteDirection::IncomingRequest,
                    entry.template.text(),
                );
                match accepted {
                    Ok(true) => {}
                    Ok(false) => {
                        context.route_data.restore(snapshot);
                        continue;
                    }
                    Err(e) => {
                        context.route_data.restore(snapshot);
                        metrics::counter!("router_dispatch_total", "outcome" => "fault").increment(1);
                        return Err(e.into());
                    }
                }

                context.route_data.push_router(Arc::clone(&entry.handler));
                // the candidate must resolve an endpoint itself; a prior one is put back on decline
                let prior_endpoint = context.take_endpoint();
                let outcome = self.invoke(entry, context).await;
                let handled = outcome.is_ok() && context.is_handled();
                if !handled {
                    context.replace_endpoint(prior_endpoint);
                }
                match outcome {
                    Ok(()) if handled => {
                        debug!(
                            path = %path.as_str(),
                            template = %entry.template,
                            endpoint = ?context.endpoint(),
                            version = self.version,
                            "Request matched"
                        );
                        metrics::counter!("router_dispatch_total", "outcome" => "matched").increment(1);
                        return Ok(true);
                    }
                    Ok(()) => {
                        trace!(template = %entry.template, "Handler declined, trying next candidate");
                        context.route_data.restore(snapshot);
                    }
                    Err(e) => {
                        context.route_data.restore(snapshot);
                        metrics::counter!("router_dispatch_total", "outcome" => "fault").increment(1);
                        return Err(e);
                    }
                }
            }
        }

        debug!(path = %path.as_str(), version = self.version, "No route matched");
        metrics::counter!("router_dispatch_total", "outcome" => "unmatched").increment(1);
        Ok(false)
    }

    async fn invoke(&self, entry: &InboundRouteEntry, context: &mut RouteContext) -> Result<(), RouteError> {
        let call = entry.handler.route(context);
        let Some(limit) = self.handler_timeout else {
            return call.await;
        };
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    template = %entry.template,
                    timeout_ms = limit.as_millis() as u64,
                    "Handler timed out, treating as declined"
                );
                context.take_endpoint();
                Ok(())
            }
        }
    }

    /// Generate a link. `Ok(None)` means no route is reachable with these values.
    pub fn generate_path(&self, context: &VirtualPathContext<'_>) -> Result<Option<VirtualPathData>, RouteError> {
        let result = match context.route_name() {
            Some(name) => match self.named.get(name) {
                Some(candidate) => self.try_generate(candidate, context)?,
                None => {
                    debug!(name = %name, "No route with this name");
                    None
                }
            },
            None => {
                let mut found = None;
                for candidate in self.link_tree.get_matches(context.values(), context.ambient_values()) {
                    if let Some(data) = self.try_generate(candidate, context)? {
                        found = Some(data);
                        break;
                    }
                }
                found
            }
        };

        let outcome = if result.is_some() { "generated" } else { "none" };
        metrics::counter!("router_link_generation_total", "outcome" => outcome).increment(1);
        Ok(result)
    }

    fn try_generate(
        &self,
        candidate: &OutboundMatch,
        context: &VirtualPathContext<'_>,
    ) -> Result<Option<VirtualPathData>, RouteError> {
        let entry = &candidate.entry;
        if let Some((key, value)) = selection_mismatch(entry, context.values()) {
            trace!(template = %entry.template, key = %key, value = %value, "Explicit value contradicts required value");
            return Ok(None);
        }
        let input: RouteValues = context
            .values()
            .iter()
            .filter(|(key, _)| !entry.is_selection_only(key))
            .collect();

        let Some(binding) = candidate.binder.get_values(context.ambient_values(), &input) else {
            trace!(template = %entry.template, "Values do not bind to template");
            return Ok(None);
        };

        let accepted = constraint::match_all(
            &entry.constraints,
            &binding.combined_values,
            context.extensions(),
            self,
            RouteDirection::UrlGeneration,
            entry.template.text(),
        )?;
        if !accepted {
            return Ok(None);
        }

        if let Some(data) = entry.handler.virtual_path(context)? {
            return Ok(Some(data));
        }

        let Some(rendered) = candidate.binder.bind_values(&binding.accepted_values) else {
            trace!(template = %entry.template, "Template could not be rendered");
            return Ok(None);
        };
        Ok(Some(
            VirtualPathData::new(rendered.path, self.version)
                .with_query(rendered.query)
                .with_data_tokens(entry.data_tokens.clone()),
        ))
    }
}

/// The first explicit selection-only value that differs from the entry's required value.
fn selection_mismatch<'v>(entry: &OutboundRouteEntry, values: &'v RouteValues) -> Option<(&'v str, &'v str)> {
    values.iter().find(|(key, value)| {
        !value.is_empty()
            && entry.is_selection_only(key)
            && entry
                .required_link_values
                .get(key)
                .is_some_and(|required| !route_parts_equal(required, value))
    })
}

impl RouteHandler for TreeRouter {
    fn route<'a>(&'a self, context: &'a mut RouteContext) -> BoxFuture<'a, Result<(), RouteError>> {
        Box::pin(async move { self.route_request(context).await.map(|_| ()) })
    }

    fn virtual_path(&self, context: &VirtualPathContext<'_>) -> Result<Option<VirtualPathData>, RouteError> {
        self.generate_path(context)
    }
}
