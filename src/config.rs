//! Configuration file parser for ~/.config/murmur/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields`
//! off), though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
///
/// The custom `Debug` impl masks `password` to keep the secret out of logs
/// and error messages; the value itself is only ever exposed at the login
/// call site, wrapped in a `SecretString`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the feed server.
    pub server_url: String,

    /// Per-request timeout in seconds for all remote calls.
    pub timeout_secs: u64,

    /// Username used when `login` is issued without one.
    pub username: Option<String>,

    /// Password for non-interactive login.
    /// The MURMUR_PASSWORD env var takes precedence over the config file.
    pub password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
            username: None,
            password: None,
        }
    }
}

/// Mask the password in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged
    ///   as a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["server_url", "timeout_secs", "username", "password"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), server_url = %config.server_url, "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 10);
        assert!(config.username.is_none());
        assert!(config.password.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/murmur_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.server_url, "http://localhost:8080");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("murmur_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 10);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("murmur_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "server_url = \"https://feed.example.com\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server_url, "https://feed.example.com");
        assert_eq!(config.timeout_secs, 10); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("murmur_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
server_url = "https://feed.example.com"
timeout_secs = 30
username = "alice"
password = "hunter2"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server_url, "https://feed.example.com");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.password.as_deref(), Some("hunter2"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("murmur_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("murmur_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
server_url = "http://localhost:8080"
totally_fake_key = "should not fail"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server_url, "http://localhost:8080");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = std::env::temp_dir().join("murmur_config_test_wrongtype");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        // timeout_secs should be an integer, not a string
        std::fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();

        assert!(Config::load(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("murmur_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::TooLarge(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_password() {
        let config = Config {
            password: Some("super-secret-pw".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(
            !debug_output.contains("super-secret-pw"),
            "Debug output should not contain the password"
        );
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should show [REDACTED] for the password"
        );
    }
}
