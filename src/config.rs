//! Classifier bridge configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::runtime::CompileHints;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "OVC_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory the runtime caches compiled models in
    pub cache_dir: PathBuf,
    /// Device the cache directory property is applied to
    pub cache_device: String,
    /// Devices whose name contains this marker are never offered
    pub excluded_device_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub execution_device: String,
    pub performance_mode: String,
    pub inference_precision: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from `OVC_CONFIG` or the default path, falling back to defaults.
    pub fn load_or_default() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| Self::default_path().to_string());
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default config ({}: {})", path, e);
            Config::default()
        })
    }

    pub fn default_path() -> &'static str {
        "ov-classifier.toml"
    }

    /// Fixed compilation hints derived from the `[compile]` table.
    pub fn compile_hints(&self) -> CompileHints {
        CompileHints {
            execution_device: self.compile.execution_device.clone(),
            performance_mode: self.compile.performance_mode.clone(),
            inference_precision: self.compile.inference_precision.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            compile: CompileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            cache_device: "GPU".to_string(),
            excluded_device_marker: "GNA".to_string(),
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            execution_device: "MULTI".to_string(),
            performance_mode: "LATENCY".to_string(),
            inference_precision: "f32".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
