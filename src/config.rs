//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::orders::DEFAULT_ATTEMPT_BUDGET;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUEST_HUNT_BACK_CONFIG_PATH";
/// Default buffer depth for the per-connection SSE forwarder.
const DEFAULT_SSE_BUFFER: usize = 8;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    order_attempt_budget: usize,
    sse_buffer: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        order_attempt_budget = config.order_attempt_budget,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Shuffle attempts granted per order slot before accepting a duplicate.
    pub fn order_attempt_budget(&self) -> usize {
        self.order_attempt_budget
    }

    /// Buffer depth for the per-connection SSE forwarder channel.
    pub fn sse_buffer(&self) -> usize {
        self.sse_buffer
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            order_attempt_budget: DEFAULT_ATTEMPT_BUDGET,
            sse_buffer: DEFAULT_SSE_BUFFER,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    order_attempt_budget: Option<usize>,
    sse_buffer: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            order_attempt_budget: raw
                .order_attempt_budget
                .unwrap_or(defaults.order_attempt_budget),
            sse_buffer: raw.sse_buffer.unwrap_or(defaults.sse_buffer),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
