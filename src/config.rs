//! Configuration for the terminal session engine.
//!
//! Loaded from `~/.axshell/config.toml`:
//!
//! ```toml
//! # Stored key-pair identifier handed to the credential provider
//! key_pair = "default"
//!
//! [endpoint]
//! host = "127.0.0.1"
//! port = 5555
//!
//! [terminal]
//! rows = 24
//! cols = 80
//! output_buffer_chunks = 64
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::Endpoint;
use crate::session::DEFAULT_OUTPUT_CHUNKS;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stored key-pair identifier for the credential provider
    pub key_pair: String,
    /// Device-shell endpoint
    pub endpoint: EndpointConfig,
    /// Terminal defaults
    pub terminal: TerminalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_pair: "default".to_string(),
            endpoint: EndpointConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

/// Device-shell endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        // Standard ADB-over-TCP port on the local device
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
        }
    }
}

impl EndpointConfig {
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Terminal defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub rows: usize,
    pub cols: usize,
    /// Output buffer capacity, in chunks, before oldest are dropped
    pub output_buffer_chunks: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 80,
            output_buffer_chunks: DEFAULT_OUTPUT_CHUNKS,
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when the file is missing or malformed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &std::path::Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("cannot read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), String> {
        let path = Self::config_path().ok_or("could not determine config path")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| format!("failed to create config dir: {}", e))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("failed to serialize config: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("failed to write config: {}", e))?;
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        let home = env::var_os("HOME").map(PathBuf::from)?;
        Some(home.join(".axshell").join("config.toml"))
    }
}
