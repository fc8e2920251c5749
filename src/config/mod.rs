/// Configuration management for the Blueprint engine
///
/// Handles interpreter bounds, store policy, and logging parameters.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store policy and interpreter bounds
    pub engine: EngineConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Engine configuration shared by the graph store and the interpreter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum exec-node firings per `execute` call before the run is aborted
    /// with `StepBoundExceeded` (cycle guard)
    pub max_steps: usize,
    /// Maximum nesting depth of on-demand data resolution
    pub max_data_depth: usize,
    /// Whether a connection may link a node to itself
    pub allow_self_loops: bool,
}

/// Logging configuration for the tracing subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive (e.g., "info", "ignis_blueprint=debug")
    pub filter: String,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for embedding hosts
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: LoggingConfig {
                filter: std::env::var("IGNIS_LOG").unwrap_or_else(|_| "info".to_string()),
            },
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: env_or("IGNIS_MAX_STEPS", 10_000),
            max_data_depth: env_or("IGNIS_MAX_DATA_DEPTH", 256),
            allow_self_loops: env_or("IGNIS_ALLOW_SELF_LOOPS", false),
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Initialize the global tracing subscriber
///
/// Only the binary calls this; the library never installs a subscriber itself.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}
