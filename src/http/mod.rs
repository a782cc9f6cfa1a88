//! HTTP front-end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum fallback, request ID, trace, timeout layers)
//!     → SharedRouter::load → TreeRouter::route_request
//!     → endpoint.rs (configured content or generated redirect)
//!     → Send to client
//! ```

pub mod endpoint;
pub mod server;

pub use endpoint::{build_router, ConfiguredEndpoint};
pub use server::HttpServer;
