// Configuration loading and validation (config/client.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Location of the config file relative to the base directory.
pub const CONFIG_FILE: &str = "config/client.toml";

/// Environment variable that overrides `backend.url`.
pub const BACKEND_URL_ENV: &str = "EIGHTPACK_BACKEND_URL";

const STORE_FILE: &str = "eightpack.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8003".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding the access token. Defaults to the platform data
    /// directory.
    pub path: Option<PathBuf>,
    /// Key the access token is stored under.
    pub token_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            token_key: "access_key".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "eightpack=info,warn".into(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// Resolved token store path: the configured one, else the platform data
    /// directory, else the working directory.
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        ProjectDirs::from("", "", "eightpack")
            .map(|dirs| dirs.data_dir().join(STORE_FILE))
            .unwrap_or_else(|| PathBuf::from(STORE_FILE))
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/client.toml` under `base_dir`. A missing file
/// yields the built-in defaults; environment overrides are not applied.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join(CONFIG_FILE);
    let config = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.clone(),
            source,
        })?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

/// Apply an explicit backend URL override, then re-validate.
pub fn apply_overrides(
    mut config: Config,
    backend_url: Option<String>,
) -> Result<Config, ConfigError> {
    if let Some(url) = backend_url.filter(|u| !u.trim().is_empty()) {
        config.backend.url = url.trim().to_string();
    }
    validate(&config)?;
    Ok(config)
}

/// Convenience wrapper: loads config relative to `base_dir` and applies the
/// `EIGHTPACK_BACKEND_URL` override from the environment.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    let config = load_config_from(base_dir)?;
    apply_overrides(config, std::env::var(BACKEND_URL_ENV).ok())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = &config.backend.url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "backend.url".into(),
            message: format!("must start with http:// or https://, got `{url}`"),
        });
    }

    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "backend.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.storage.token_key.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "storage.token_key".into(),
            message: "must not be empty".into(),
        });
    }

    if config
        .storage
        .path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "storage.path".into(),
            message: "must not be empty when set".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fresh temp directory with an optional `config/client.toml`.
    fn temp_base(name: &str, contents: Option<&str>) -> PathBuf {
        let base = std::env::temp_dir().join(format!(
            "eightpack_config_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(base.join("config")).unwrap();
        if let Some(text) = contents {
            fs::write(base.join(CONFIG_FILE), text).unwrap();
        }
        base
    }

    #[test]
    fn missing_file_yields_defaults() {
        let base = temp_base("missing", None);
        let config = load_config_from(&base).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend.url, "http://localhost:8003");
        assert_eq!(config.storage.token_key, "access_key");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn file_values_override_defaults() {
        let base = temp_base(
            "full",
            Some(
                r#"
                [backend]
                url = "https://drafts.example.com"
                timeout_secs = 5

                [storage]
                path = "/tmp/eightpack-test.db"
                token_key = "token"

                [logging]
                filter = "eightpack=debug"
                "#,
            ),
        );
        let config = load_config_from(&base).unwrap();
        assert_eq!(config.backend.url, "https://drafts.example.com");
        assert_eq!(config.backend.timeout_secs, 5);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/eightpack-test.db"));
        assert_eq!(config.storage.token_key, "token");
        assert_eq!(config.logging.filter, "eightpack=debug");
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let base = temp_base("partial", Some("[backend]\ntimeout_secs = 3\n"));
        let config = load_config_from(&base).unwrap();
        assert_eq!(config.backend.url, "http://localhost:8003");
        assert_eq!(config.backend.timeout_secs, 3);
        assert_eq!(config.storage, StorageConfig::default());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let base = temp_base("malformed", Some("[backend\nurl = "));
        let err = load_config_from(&base).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn non_http_url_is_rejected() {
        let base = temp_base("badurl", Some("[backend]\nurl = \"ftp://x\"\n"));
        let err = load_config_from(&base).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "backend.url"),
            other => panic!("expected validation error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("backend.timeout_secs"));
    }

    #[test]
    fn empty_token_key_is_rejected() {
        let mut config = Config::default();
        config.storage.token_key = "  ".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn override_replaces_url_and_revalidates() {
        let config =
            apply_overrides(Config::default(), Some("https://other.example".into())).unwrap();
        assert_eq!(config.backend.url, "https://other.example");

        let unchanged = apply_overrides(Config::default(), Some("   ".into())).unwrap();
        assert_eq!(unchanged.backend.url, "http://localhost:8003");

        assert!(apply_overrides(Config::default(), Some("nonsense".into())).is_err());
    }

    #[test]
    fn shipped_example_matches_defaults() {
        let text = include_str!("../../../config/client.toml.example");
        let config: Config = toml::from_str(text).expect("example config should parse");
        validate(&config).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn default_store_path_ends_with_store_file() {
        let config = Config::default();
        assert!(config.store_path().ends_with(STORE_FILE));
    }
}
