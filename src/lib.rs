//! Tree-based URL routing with link generation.
//!
//! The core lives in [`routing`]: a forward matching trie for dispatch and a
//! decision tree plus template binder for generating links. The remaining
//! modules wrap it in a configurable HTTP service.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod template;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{SharedRouter, TreeRouteBuilder, TreeRouter};
