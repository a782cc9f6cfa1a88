//! Mutable per-request route state with transactional rollback.
//!
//! # Responsibilities
//! - Hold matched route values, data tokens and the active handler chain
//! - Record every mutation in an undo log
//! - Restore a snapshot by undoing the log down to a saved length
//!
//! # Design Decisions
//! - All mutations go through `RouteData` methods so none can bypass the log
//! - A snapshot is only a log length; taking one costs nothing
//! - A discarded snapshot needs no cleanup

use std::fmt;
use std::sync::Arc;

use crate::routing::handler::RouteHandler;
use crate::routing::values::RouteValues;

#[derive(Debug)]
enum Undo {
    Value { key: String, previous: Option<String> },
    DataToken { key: String, previous: Option<String> },
    Router,
}

/// A point in the mutation log that `RouteData::restore` can return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a snapshot does nothing unless it is restored"]
pub struct RouteDataSnapshot {
    mark: usize,
}

/// Route values, data tokens and handler chain for one dispatch.
#[derive(Default)]
pub struct RouteData {
    values: RouteValues,
    data_tokens: RouteValues,
    routers: Vec<Arc<dyn RouteHandler>>,
    log: Vec<Undo>,
}

impl RouteData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &RouteValues {
        &self.values
    }

    pub fn data_tokens(&self) -> &RouteValues {
        &self.data_tokens
    }

    /// Handlers that accepted a candidate, outermost first.
    pub fn routers(&self) -> &[Arc<dyn RouteHandler>] {
        &self.routers
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let previous = self.values.insert(key.clone(), value);
        self.log.push(Undo::Value { key, previous });
    }

    pub fn set_data_token(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let previous = self.data_tokens.insert(key.clone(), value);
        self.log.push(Undo::DataToken { key, previous });
    }

    pub fn push_router(&mut self, router: Arc<dyn RouteHandler>) {
        self.routers.push(router);
        self.log.push(Undo::Router);
    }

    pub fn snapshot(&self) -> RouteDataSnapshot {
        RouteDataSnapshot {
            mark: self.log.len(),
        }
    }

    /// Undo every mutation made since `snapshot` was taken.
    pub fn restore(&mut self, snapshot: RouteDataSnapshot) {
        while self.log.len() > snapshot.mark {
            let Some(undo) = self.log.pop() else { break };
            match undo {
                Undo::Value { key, previous } => revert(&mut self.values, key, previous),
                Undo::DataToken { key, previous } => revert(&mut self.data_tokens, key, previous),
                Undo::Router => {
                    self.routers.pop();
                }
            }
        }
    }
}

fn revert(map: &mut RouteValues, key: String, previous: Option<String>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl From<RouteValues> for RouteData {
    fn from(values: RouteValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }
}

impl fmt::Debug for RouteData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteData")
            .field("values", &self.values)
            .field("data_tokens", &self.data_tokens)
            .field("routers", &self.routers.len())
            .finish()
    }
}
