//! Configuration file parser for ~/.config/gamedex/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored with a warning. API keys may also come from the
//! environment, which wins over the file.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::catalog::DEFAULT_BASE_URL;
use crate::feed::DEFAULT_PAGE_SIZE;

pub const ENV_CATALOG_API_KEY: &str = "GAMEDEX_CATALOG_API_KEY";
pub const ENV_BACKEND_URL: &str = "GAMEDEX_BACKEND_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "GAMEDEX_BACKEND_ANON_KEY";

const MAX_PAGE_SIZE: u32 = 40;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys can be given. `Debug`
/// masks both API keys.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// "dark" or "light"
    pub theme: String,

    /// Games per catalog page (1..=40).
    pub page_size: u32,

    pub catalog_base_url: String,

    pub catalog_api_key: Option<String>,

    /// Hosted auth/row-store project URL. Accounts are disabled without it.
    pub backend_url: Option<String>,

    pub backend_anon_key: Option<String>,

    /// Keybinding overrides: action name → key string.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            catalog_base_url: DEFAULT_BASE_URL.to_string(),
            catalog_api_key: None,
            backend_url: None,
            backend_anon_key: None,
            keybindings: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("theme", &self.theme)
            .field("page_size", &self.page_size)
            .field("catalog_base_url", &self.catalog_base_url)
            .field(
                "catalog_api_key",
                &self.catalog_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("backend_url", &self.backend_url)
            .field(
                "backend_anon_key",
                &self.backend_anon_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("keybindings", &self.keybindings)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "theme",
        "page_size",
        "catalog_base_url",
        "catalog_api_key",
        "backend_url",
        "backend_anon_key",
        "keybindings",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or blank file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line info
    /// - Over 1 MB → `Err(ConfigError::TooLarge)`
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
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            theme = %config.theme,
            page_size = config.page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Overlay `GAMEDEX_*` environment variables onto the file values.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(ENV_CATALOG_API_KEY) {
            self.catalog_api_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_BACKEND_ANON_KEY) {
            self.backend_anon_key = Some(key);
        }
    }

    /// Page size clamped to what the catalog API accepts.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn catalog_api_key(&self) -> Option<SecretString> {
        self.catalog_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::from(k.trim().to_string()))
    }

    /// Backend URL and anon key, when both are configured.
    pub fn backend(&self) -> Option<(&str, SecretString)> {
        let url = self.backend_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let key = self
            .backend_anon_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())?;
        Some((url.trim(), SecretString::from(key.trim().to_string())))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gamedex_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.page_size, 12);
        assert_eq!(config.catalog_base_url, "https://api.rawg.io/api");
        assert!(config.catalog_api_key().is_none());
        assert!(config.backend().is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/gamedex_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.theme, "dark");
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 12);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
theme = "light"
page_size = 20
catalog_base_url = "https://games.example.com/api"
catalog_api_key = "rawg-key"
backend_url = "https://project.example.co"
backend_anon_key = "anon-key"

[keybindings]
quit = "Ctrl+q"
toggle_wishlist = "W"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.theme, "light");
        assert_eq!(config.effective_page_size(), 20);
        assert_eq!(config.catalog_base_url, "https://games.example.com/api");
        assert_eq!(
            config.catalog_api_key().unwrap().expose_secret(),
            "rawg-key"
        );
        let (url, key) = config.backend().unwrap();
        assert_eq!(url, "https://project.example.co");
        assert_eq!(key.expose_secret(), "anon-key");
        assert_eq!(
            config.keybindings.get("toggle_wishlist").map(String::as_str),
            Some("W")
        );
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "theme = \"dark\"\nrefresh_interval = 5\n");
        assert_eq!(Config::load(&path).unwrap().theme, "dark");
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        cleanup(&path);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let config = Config {
            page_size: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_page_size(), 1);
        let config = Config {
            page_size: 500,
            ..Config::default()
        };
        assert_eq!(config.effective_page_size(), 40);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config {
            catalog_api_key: Some("from-file".into()),
            backend_url: Some("https://file.example.co".into()),
            ..Config::default()
        };
        config.apply_env_from(|name| match name {
            ENV_CATALOG_API_KEY => Some("from-env".into()),
            ENV_BACKEND_ANON_KEY => Some("env-anon".into()),
            ENV_BACKEND_URL => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.catalog_api_key.as_deref(), Some("from-env"));
        // Blank env values do not clobber the file
        assert_eq!(config.backend_url.as_deref(), Some("https://file.example.co"));
        assert!(config.backend().is_some());
    }

    #[test]
    fn test_half_configured_backend_is_disabled() {
        let config = Config {
            backend_url: Some("https://project.example.co".into()),
            ..Config::default()
        };
        assert!(config.backend().is_none());
    }

    #[test]
    fn test_debug_masks_api_keys() {
        let config = Config {
            catalog_api_key: Some("super-secret-rawg".into()),
            backend_anon_key: Some("super-secret-anon".into()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret"));
        assert_eq!(debug_output.matches("[REDACTED]").count(), 2);
    }
}
