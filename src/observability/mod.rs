//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: template, path, version)
//!     → metrics.rs (counters, gauges, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Library code only emits; the binary installs subscriber and exporter
//! - Request ID flows through the HTTP layer as `x-request-id`
//! - Metrics are cheap (atomic increments); without an exporter they are no-ops

pub mod logging;
pub mod metrics;
