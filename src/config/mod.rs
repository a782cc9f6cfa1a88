//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, every route built in isolation)
//!     → RouterConfig (validated, immutable)
//!     → http::endpoint builds a versioned TreeRouter from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server rebuilds with the next version and swaps atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ObservabilityConfig, ResponseConfig, RouteConfig, RouterConfig, ServerConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
