//! Configuration loading for the audio-discover node engine.
//!
//! Kept dependency-light so the engine, the replay tool and tests can all
//! import it without pulling in the engine itself.
//!
//! # Configuration Sections
//!
//! - **Discovery** (`DiscoverConfig`): filtering criteria applied while a
//!   card is expanded into nodes - channel range, selected-profile mode and
//!   the name of the silent null sink.
//!
//! - **Infrastructure** (`TelemetryConfig`): things fixed for the lifetime
//!   of the process, currently just the log filter.
//!
//! # Usage
//!
//! ```rust,no_run
//! use discoverconf::DiscoverConf;
//!
//! let config = DiscoverConf::load().expect("Failed to load config");
//!
//! println!("channels: {}..={}", config.discover.chmin, config.discover.chmax);
//! println!("log level: {}", config.telemetry.log_level);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/audio-discover/config.toml` (system)
//! 2. `~/.config/audio-discover/config.toml` (user)
//! 3. `./audio-discover.toml` (local override, replaced by an explicit path)
//! 4. Environment variables (`AUDIO_DISCOVER_*`)
//!
//! # Example Config
//!
//! ```toml
//! [discover]
//! chmin = 1
//! chmax = 2
//! selected_profile_only = true
//! null_sink_name = "null"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod discover;
pub mod infra;
pub mod loader;

pub use discover::DiscoverConfig;
pub use infra::TelemetryConfig;
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiscoverConf {
    /// Card expansion and node filtering.
    #[serde(default)]
    pub discover: DiscoverConfig,

    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl DiscoverConf {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/audio-discover/config.toml`
    /// 3. `~/.config/audio-discover/config.toml`
    /// 4. `./audio-discover.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` replacing the local override.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    ///
    /// An explicit `config_path` must exist. The merged result is validated
    /// before it is returned.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = DiscoverConf::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        config.validate()?;
        Ok((config, sources))
    }

    /// Reject channel ranges no profile could ever satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.discover;
        if d.chmin == 0 {
            return Err(ConfigError::Invalid(
                "discover.chmin must be at least 1".to_string(),
            ));
        }
        if d.chmin > d.chmax {
            return Err(ConfigError::Invalid(format!(
                "discover.chmin ({}) exceeds discover.chmax ({})",
                d.chmin, d.chmax
            )));
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# audio-discover configuration\n\n");

        output.push_str("[discover]\n");
        output.push_str(&format!("chmin = {}\n", self.discover.chmin));
        output.push_str(&format!("chmax = {}\n", self.discover.chmax));
        output.push_str(&format!(
            "selected_profile_only = {}\n",
            self.discover.selected_profile_only
        ));
        if let Some(ref name) = self.discover.null_sink_name {
            output.push_str(&format!("null_sink_name = \"{}\"\n", name));
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output
    }
}
