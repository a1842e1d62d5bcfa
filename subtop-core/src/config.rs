//! Runtime configuration.
//!
//! Values come from three layers, later ones winning: an optional TOML file,
//! environment variables, and whatever the binary applies from its command line.

use crate::{ConfigError, TimePeriod};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "subtop.toml";

pub const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://subtop.db";
pub const DEFAULT_LIMIT: u32 = 200;

const ENV_USERNAME: &str = "REDDIT_USERNAME";
const ENV_PASSWORD: &str = "REDDIT_PASSWORD";
const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";
const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_PERIOD: &str = "SUBTOP_PERIOD";
const ENV_LIMIT: &str = "SUBTOP_LIMIT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditSettings,
    pub database: DatabaseSettings,
    pub sync: SyncSettings,
}

/// Script-app credentials and endpoints for the Reddit API.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub authorize_url: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            user_agent: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for RedditSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditSettings")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("user_agent", &self.user_agent)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("token_url", &self.token_url)
            .field("authorize_url", &self.authorize_url)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub period: TimePeriod,
    pub limit: u32,
    /// Treat a post whose permalink is already stored as a no-op instead of
    /// inserting a second row.
    pub dedupe: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            period: TimePeriod::default(),
            limit: DEFAULT_LIMIT,
            dedupe: false,
        }
    }
}

impl AppConfig {
    /// Loads `path` (or `subtop.toml` when it exists), then applies the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            let path = path.display().to_string();
            match e.kind() {
                io::ErrorKind::NotFound => ConfigError::FileNotFound { path },
                io::ErrorKind::PermissionDenied => ConfigError::PermissionDenied { path },
                _ => ConfigError::InvalidFormat {
                    details: format!("{}: {}", path, e),
                },
            }
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overrides fields from environment variables resolved through `lookup`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_USERNAME) {
            self.reddit.username = value;
        }
        if let Some(value) = get(ENV_PASSWORD) {
            self.reddit.password = value;
        }
        if let Some(value) = get(ENV_USER_AGENT) {
            self.reddit.user_agent = value;
        }
        if let Some(value) = get(ENV_CLIENT_ID) {
            self.reddit.client_id = value;
        }
        if let Some(value) = get(ENV_CLIENT_SECRET) {
            self.reddit.client_secret = value;
        }
        if let Some(value) = get(ENV_DATABASE_URL) {
            self.database.url = value;
        }
        if let Some(value) = get(ENV_PERIOD) {
            self.sync.period = value.parse()?;
        }
        if let Some(value) = get(ENV_LIMIT) {
            self.sync.limit = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    field: ENV_LIMIT.to_string(),
                    value,
                })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.limit".to_string(),
                value: "0".to_string(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".to_string(),
                value: "0".to_string(),
            });
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url".to_string(),
            });
        }
        Ok(())
    }

    /// Credentials are only needed when the run talks to Reddit.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        let required = [
            ("reddit.username", &self.reddit.username),
            ("reddit.password", &self.reddit.password),
            ("reddit.user_agent", &self.reddit.user_agent),
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}
