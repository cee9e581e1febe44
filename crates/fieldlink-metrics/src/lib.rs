//! ---
//! fl_section: "03-logging-metrics"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Metrics collection and export utilities."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::Registry;

mod gateway;
mod server;

pub use gateway::GatewayMetrics;
pub use server::{spawn_http_server, MetricsServer};

/// Shared registry type used across the workspace.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

pub use prometheus;
