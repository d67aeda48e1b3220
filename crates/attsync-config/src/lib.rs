//! Configuration management for attsync.
//!
//! Parses `attsync.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ## Sections
//!
//! - `[server]` - base URL and context path of the wiki, endpoint paths
//! - `[http]` - transport timeout
//! - `[effects]` - fade duration gating DOM replacement
//! - `[messages]` - fallback texts used when a widget carries no i18n parameters

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "attsync.toml";

/// Upper bound for `effects.fade_ms`.
const MAX_FADE_MS: u64 = 10_000;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server endpoints.
    pub server: ServerConfig,
    /// HTTP transport settings.
    pub http: HttpConfig,
    /// Visual transition settings.
    pub effects: EffectsConfig,
    /// Fallback user-facing messages.
    pub messages: MessagesConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Server endpoint configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Wiki base URL, used to resolve relative links.
    pub base_url: String,
    /// Context path prefix (e.g. `/confluence`), empty for root deployments.
    pub context_path: String,
    /// Macro-render endpoint path, relative to the context path.
    pub render_path: String,
    /// Loading indicator image path, relative to the context path.
    pub wait_icon: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_owned(),
            context_path: String::new(),
            render_path: "/pages/plugins/attachments/rendermacro.action".to_owned(),
            wait_icon: "/images/icons/wait.gif".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Path of the macro-render endpoint including the context path.
    #[must_use]
    pub fn render_url(&self) -> String {
        format!("{}{}", self.context_path, self.render_path)
    }

    /// Path of the loading indicator image including the context path.
    #[must_use]
    pub fn wait_icon_url(&self) -> String {
        format!("{}{}", self.context_path, self.wait_icon)
    }
}

/// HTTP transport configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Global request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Visual transition configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Fade in/out duration in milliseconds.
    pub fade_ms: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        // jQuery's "normal" speed.
        Self { fade_ms: 400 }
    }
}

impl EffectsConfig {
    /// Fade duration as a [`Duration`].
    #[must_use]
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

/// Fallback messages for widgets rendered without i18n parameters.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Delete confirmation template, `{0}` is the file name.
    pub delete_confirm: String,
    /// Shown when a post-upload refresh is rejected.
    pub not_permitted: String,
    /// Shown in place of the loading indicator when a delete request fails.
    pub delete_failed: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            delete_confirm: "Are you sure you want to delete {0}?".to_owned(),
            not_permitted: "You are not permitted to perform this operation.".to_owned(),
            delete_failed: "The attachment could not be removed.".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require an absolute path (leading `/`).
fn require_absolute_path(path: &str, field: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Validation(format!("{field} must start with /")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `attsync.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or parsing or
    /// validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }
        match Self::discover_config() {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or `ConfigError::Validation`.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Strip trailing slashes so paths can be joined by plain concatenation.
    fn normalize(&mut self) {
        let trimmed = self.server.base_url.trim_end_matches('/').len();
        self.server.base_url.truncate(trimmed);
        let trimmed = self.server.context_path.trim_end_matches('/').len();
        self.server.context_path.truncate(trimmed);
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file or string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_http()?;
        self.validate_effects()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        require_non_empty(&server.base_url, "server.base_url")?;
        require_http_url(&server.base_url, "server.base_url")?;

        // Root deployments use an empty context path
        if !server.context_path.is_empty() {
            require_absolute_path(&server.context_path, "server.context_path")?;
        }
        require_absolute_path(&server.render_path, "server.render_path")?;
        require_absolute_path(&server.wait_icon, "server.wait_icon")?;
        Ok(())
    }

    fn validate_http(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_effects(&self) -> Result<(), ConfigError> {
        if self.effects.fade_ms > MAX_FADE_MS {
            return Err(ConfigError::Validation(format!(
                "effects.fade_ms cannot exceed {MAX_FADE_MS}"
            )));
        }
        Ok(())
    }
}
