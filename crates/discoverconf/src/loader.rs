//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, DiscoverConf};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override and is returned
/// even when missing, so loading it reports the error.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/audio-discover/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("audio-discover/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("audio-discover.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file on top of the defaults.
pub fn load_from_file(path: &Path) -> Result<DiscoverConf, ConfigError> {
    let mut config = DiscoverConf::default();
    apply_file(&mut config, path)?;
    Ok(config)
}

/// Overlay the keys set in a TOML file onto `config`.
///
/// Keys the file omits keep their current value; keys it sets win, even when
/// they restore a default an earlier file changed.
pub fn apply_file(config: &mut DiscoverConf, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

#[cfg(test)]
fn parse_toml(contents: &str, path: &Path) -> Result<DiscoverConf, ConfigError> {
    let mut config = DiscoverConf::default();
    apply_toml(&mut config, contents, path)?;
    Ok(config)
}

fn apply_toml(config: &mut DiscoverConf, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let discover = &mut config.discover;
    if let Some(section) = table.get("discover").and_then(|v| v.as_table()) {
        if let Some(v) = section.get("chmin") {
            discover.chmin = v
                .as_integer()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| parse_err(format!("discover.chmin must be a non-negative integer, got {}", v)))?;
        }
        if let Some(v) = section.get("chmax") {
            discover.chmax = v
                .as_integer()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| parse_err(format!("discover.chmax must be a non-negative integer, got {}", v)))?;
        }
        if let Some(v) = section.get("selected_profile_only") {
            discover.selected_profile_only = v
                .as_bool()
                .ok_or_else(|| parse_err(format!("discover.selected_profile_only must be a boolean, got {}", v)))?;
        }
        if let Some(v) = section.get("null_sink_name") {
            let name = v
                .as_str()
                .ok_or_else(|| parse_err(format!("discover.null_sink_name must be a string, got {}", v)))?;
            // an empty name disables the null sink
            discover.null_sink_name = if name.is_empty() { None } else { Some(name.to_string()) };
        }
    }

    if let Some(section) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = section.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut DiscoverConf, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("AUDIO_DISCOVER_CHMIN") {
        if let Ok(n) = v.parse() {
            config.discover.chmin = n;
            sources.env_overrides.push("AUDIO_DISCOVER_CHMIN".to_string());
        }
    }
    if let Ok(v) = env::var("AUDIO_DISCOVER_CHMAX") {
        if let Ok(n) = v.parse() {
            config.discover.chmax = n;
            sources.env_overrides.push("AUDIO_DISCOVER_CHMAX".to_string());
        }
    }
    if let Ok(v) = env::var("AUDIO_DISCOVER_SELECTED") {
        if let Some(b) = parse_bool(&v) {
            config.discover.selected_profile_only = b;
            sources.env_overrides.push("AUDIO_DISCOVER_SELECTED".to_string());
        }
    }
    if let Ok(v) = env::var("AUDIO_DISCOVER_NULL_SINK") {
        config.discover.null_sink_name = if v.is_empty() { None } else { Some(v) };
        sources.env_overrides.push("AUDIO_DISCOVER_NULL_SINK".to_string());
    }

    if let Ok(v) = env::var("AUDIO_DISCOVER_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("AUDIO_DISCOVER_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[discover]
chmax = 6
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.discover.chmax, 6);
        // Other values should be defaults
        assert_eq!(config.discover.chmin, 1);
        assert!(config.discover.selected_profile_only);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[discover]
chmin = 2
chmax = 8
selected_profile_only = false
null_sink_name = "null"

[telemetry]
log_level = "audio_discover=debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.discover.chmin, 2);
        assert_eq!(config.discover.chmax, 8);
        assert!(!config.discover.selected_profile_only);
        assert_eq!(config.discover.null_sink_name.as_deref(), Some("null"));
        assert_eq!(config.telemetry.log_level, "audio_discover=debug");
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let toml = r#"
[discover]
chmin = "one"
"#;
        let err = parse_toml(toml, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("discover.chmin"));
    }

    #[test]
    fn test_parse_rejects_invalid_syntax() {
        let err = parse_toml("[discover\nchmin = 1", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_later_file_keeps_unset_keys() {
        let mut config = DiscoverConf::default();
        apply_toml(
            &mut config,
            "[discover]\nchmax = 8\nnull_sink_name = \"null\"",
            Path::new("system.toml"),
        )
        .unwrap();
        apply_toml(&mut config, "[telemetry]\nlog_level = \"debug\"", Path::new("user.toml")).unwrap();

        assert_eq!(config.discover.chmax, 8);
        assert_eq!(config.discover.null_sink_name.as_deref(), Some("null"));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_later_file_can_restore_default() {
        let mut config = DiscoverConf::default();
        apply_toml(
            &mut config,
            "[discover]\nchmax = 8\nselected_profile_only = false\nnull_sink_name = \"null\"",
            Path::new("system.toml"),
        )
        .unwrap();
        apply_toml(
            &mut config,
            "[discover]\nchmax = 2\nselected_profile_only = true\nnull_sink_name = \"\"",
            Path::new("local.toml"),
        )
        .unwrap();

        assert_eq!(config.discover.chmax, 2);
        assert!(config.discover.selected_profile_only);
        assert!(config.discover.null_sink_name.is_none());
    }

    #[test]
    fn test_explicit_path_is_kept_when_missing() {
        let missing = Path::new("/nonexistent/explicit.toml");
        let files = discover_config_files_with_override(Some(missing));
        assert_eq!(files.last().map(PathBuf::as_path), Some(missing));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[discover]\nselected_profile_only = false").unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert!(!config.discover.selected_profile_only);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_from_file(Path::new("/nonexistent/audio-discover.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
