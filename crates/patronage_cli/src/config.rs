//! Configuration file support for the patronage CLI.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Environment variables (`PATRONAGE_ACCESS_TOKEN`, `PATRONAGE_CACHE_PATH`,
//!    or structured `PATRONAGE_API__*` / `PATRONAGE_CACHE__*` overrides)
//! 2. Local config file (./patronage.toml)
//! 3. XDG config file (~/.config/patronage/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [api]
//! access_token = "..."           # or use PATRONAGE_ACCESS_TOKEN
//! base_url = "https://api.patreon.com"
//! max_requests_per_hour = 100
//! max_requests_per_day = 1000
//! request_timeout = 30
//!
//! [cache]
//! path = "/var/lib/patronage/cache.json"  # optional, defaults to the state dir
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use patronage::ApiConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API configuration.
    pub api: ApiConfig,
    /// Cache file configuration.
    pub cache: CacheConfig,
}

/// Cache file configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the JSON cache file.
    /// Defaults to `~/.local/state/patronage/cache.json` if not specified.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "patronage") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("patronage.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./patronage.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., PATRONAGE_API__ACCESS_TOKEN -> api.access_token
        builder = builder.add_source(
            Environment::with_prefix("PATRONAGE")
                .separator("__")
                .try_parsing(true),
        );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        };

        // Short-form variables for the two settings everyone needs.
        if let Ok(token) = std::env::var("PATRONAGE_ACCESS_TOKEN") {
            config.api.access_token = token;
        }
        if let Ok(path) = std::env::var("PATRONAGE_CACHE_PATH") {
            config.cache.path = Some(PathBuf::from(path));
        }

        config
    }

    /// The API client configuration.
    pub fn api_config(&self) -> &ApiConfig {
        &self.api
    }

    /// The cache file path, falling back to the default state directory.
    ///
    /// On Linux this is `$XDG_STATE_HOME/patronage/cache.json` or
    /// `~/.local/state/patronage/cache.json`.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache
            .path
            .clone()
            .or_else(|| Self::default_state_dir().map(|dir| dir.join("cache.json")))
    }

    /// Get the default state directory path.
    ///
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "patronage").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
