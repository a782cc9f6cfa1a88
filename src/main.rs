//! tree-router
//!
//! A configurable HTTP front-end over the tree routing engine.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, trace, timeout)
//!                         │
//!                         ▼
//!                   routing::SharedRouter ──load──▶ TreeRouter (version N)
//!                         │                            │ trie walk, constraints, rollback
//!                         ▼                            ▼
//!                   http::endpoint ◀───────────── ConfiguredEndpoint
//!                         │ content body | redirect via link generation
//!     Client Response ◀───┘
//!
//!     config::watcher ──change──▶ rebuild (version N+1) ──swap──▶ SharedRouter
//! ```
//!
//! # Commands
//! - `serve`: run the HTTP front-end with hot reload
//! - `match`: dispatch one path offline and print the result as JSON
//! - `link`: generate one link offline

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use tree_router::config::{load_config, ConfigWatcher};
use tree_router::http::server::spawn_reloader;
use tree_router::http::{build_router, HttpServer};
use tree_router::lifecycle::{signals::shutdown_on_signal, Shutdown};
use tree_router::observability::{logging, metrics};
use tree_router::routing::{RouteContext, RouteValues, VirtualPathContext};

#[derive(Parser)]
#[command(name = "tree-router")]
#[command(about = "Tree-based URL routing with link generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve HTTP requests using the configured routes
    Serve {
        #[arg(short, long, default_value = "router.toml")]
        config: PathBuf,
    },
    /// Match a request path and print the result
    Match {
        #[arg(short, long, default_value = "router.toml")]
        config: PathBuf,
        path: String,
    },
    /// Generate a link from route values
    Link {
        #[arg(short, long, default_value = "router.toml")]
        config: PathBuf,
        /// Route name; unnamed generation when absent
        #[arg(long)]
        name: Option<String>,
        /// Explicit value, repeatable
        #[arg(long = "value", value_parser = parse_pair)]
        values: Vec<(String, String)>,
        /// Ambient value, repeatable
        #[arg(long = "ambient", value_parser = parse_pair)]
        ambient: Vec<(String, String)>,
        /// Resolve the link against this base URL
        #[arg(long)]
        base: Option<url::Url>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config } => serve(&config).await,
        Commands::Match { config, path } => match_path(&config, &path).await,
        Commands::Link {
            config,
            name,
            values,
            ambient,
            base,
        } => link(&config, name.as_deref(), values, ambient, base),
    }
}

async fn serve(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    logging::init_logging(Some(&config.observability.log_level));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tree-router starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.server.request_timeout_secs,
        handler_timeout_ms = ?config.dispatch.handler_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();

    let (watcher, updates) = ConfigWatcher::new(path);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };
    let reloader = spawn_reloader(Arc::clone(server.shared()), updates, shutdown.subscribe());

    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown_on_signal(&shutdown).await })
    };

    server.run(listener, &shutdown).await?;
    shutdown.trigger();
    let _ = reloader.await;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn match_path(path: &Path, request_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(Some("warn"));
    let config = load_config(path)?;
    let router = build_router(&config, 1)?;

    let mut context = RouteContext::for_path(request_path);
    let matched = router.route_request(&mut context).await?;
    let output = serde_json::json!({
        "matched": matched,
        "endpoint": context.endpoint(),
        "values": to_json(context.route_data.values()),
        "data_tokens": to_json(context.route_data.data_tokens()),
        "version": router.version(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn link(
    path: &Path,
    name: Option<&str>,
    values: Vec<(String, String)>,
    ambient: Vec<(String, String)>,
    base: Option<url::Url>,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(Some("warn"));
    let config = load_config(path)?;
    let router = build_router(&config, 1)?;

    let values: RouteValues = values.into_iter().collect();
    let ambient: RouteValues = ambient.into_iter().collect();
    let mut context = VirtualPathContext::new(&values).with_ambient_values(&ambient);
    if let Some(name) = name {
        context = context.with_route_name(name);
    }

    match router.generate_path(&context)? {
        Some(data) => match base {
            Some(base) => println!("{}", data.join(&base)?),
            None => println!("{}", data.to_url_string()),
        },
        None => {
            eprintln!("no route can generate a link for these values");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn to_json(values: &RouteValues) -> serde_json::Value {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect::<serde_json::Map<_, _>>()
        .into()
}
