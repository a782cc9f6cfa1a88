//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → path.rs (tokenize, percent-decode)
//!     → tree.rs (candidate nodes, most specific first)
//!     → matcher.rs (structural match) → constraint.rs (incoming mode)
//!     → handler invoked; route_data.rs rolls back on decline
//!
//! Link generation (name or values)
//!     → named.rs (by name) | link.rs (decision tree by required values)
//!     → binder.rs (ambient/explicit/default values) → constraint.rs (generation mode)
//!     → rendered path + query
//!
//! Route compilation (at startup or reload):
//!     RouteDefinition[] → builder.rs → TreeRouter (immutable, versioned)
//!     → shared.rs (atomic publish)
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Deterministic: same input always matches the same route
//! - Registration order breaks ties between equally specific templates

pub mod binder;
pub mod builder;
pub mod constraint;
pub mod entry;
pub mod error;
pub mod handler;
pub mod link;
pub mod matcher;
pub mod named;
pub mod path;
pub mod route_data;
pub mod router;
pub mod shared;
pub mod tree;
pub mod values;

pub use builder::TreeRouteBuilder;
pub use constraint::{ConstraintContext, ConstraintResolver, RouteConstraint, RouteDirection};
pub use entry::RouteDefinition;
pub use error::{BuildError, ConstraintError, RouteError};
pub use handler::{EndpointHandler, RouteContext, RouteHandler, VirtualPathContext, VirtualPathData};
pub use path::RequestPath;
pub use route_data::RouteData;
pub use router::TreeRouter;
pub use shared::{SharedRouter, SwapError};
pub use values::RouteValues;
