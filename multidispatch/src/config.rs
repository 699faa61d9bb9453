//! Dispatch configuration.
//!
//! ```toml
//! # Try registered coercions when no signature matches exactly.
//! coercion = true
//! # Warn when a coercion function is registered twice for one type.
//! log_overwrites = true
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::{CoercionFn, CoercionRegistry};
use crate::object::{Ty, Value};

/// Errors from loading or saving a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid dispatch configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize dispatch configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings that shape dispatcher behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Run the coercive path when no candidate matches exactly.
    pub coercion: bool,

    /// Log a warning when a coercion is registered over an existing one.
    pub log_overwrites: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            coercion: true,
            log_overwrites: true,
        }
    }
}

impl DispatchConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

/// Configuration plus the coercion registry dispatchers are built with.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    config: DispatchConfig,
    coercions: Arc<CoercionRegistry>,
}

impl DispatchContext {
    pub fn new(config: DispatchConfig, coercions: Arc<CoercionRegistry>) -> Self {
        Self { config, coercions }
    }

    /// Use `config` with the process-wide coercion registry.
    ///
    /// If `log_overwrites` differs from the global registry's setting, the
    /// context gets its own copy of the table with the configured setting.
    pub fn from_config(config: DispatchConfig) -> Self {
        let global = CoercionRegistry::global();
        let coercions = if global.log_overwrites() == config.log_overwrites {
            global
        } else {
            Arc::new((*global).clone().with_overwrite_logging(config.log_overwrites))
        };
        Self::new(config, coercions)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn coercions(&self) -> &Arc<CoercionRegistry> {
        &self.coercions
    }

    /// Register a coercion for dispatchers built with this context.
    ///
    /// The table is copied first if it is shared, so dispatchers that were
    /// already built keep the table they were built with.
    pub fn register_coercion<F>(&mut self, target: Ty, coercion: F) -> Option<Arc<CoercionFn>>
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.coercions).register(target, coercion)
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::from_config(DispatchConfig::default())
    }
}
