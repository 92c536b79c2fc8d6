use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = ".vigil/config.toml";
const CONFIG_ENV: &str = "VIGIL_CONFIG";
/// Channel prefixes the bot understands, the same set `vigil-irc` routes on.
const CHANNEL_SIGILS: [char; 2] = ['#', '&'];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VigilConfig {
    /// IRC server host name.
    pub server: String,
    pub port: u16,
    pub nick: String,
    /// NickServ password; when set the bot identifies right after registration.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Channels that get the extended incident summary (document links).
    #[serde(default)]
    pub public_channels: Vec<String>,
    /// Nicknames with unconditional access to every command. Make sure they are
    /// registered with NickServ on the network.
    #[serde(default)]
    pub admins: Vec<String>,
    pub db_path: PathBuf,
    pub log_level: String,
    #[serde(default)]
    pub documents: DocumentConfig,
}

/// Settings for the incident document provider. Documents are only created when
/// `template_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub template_id: Option<String>,
    pub drive_id: Option<String>,
    pub folder_id: Option<String>,
    /// Domain granted writer access on newly created documents.
    pub share_domain: Option<String>,
    /// Environment variable holding the OAuth bearer token for the Drive API.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            template_id: None,
            drive_id: None,
            folder_id: None,
            share_domain: None,
            token_env: default_token_env(),
        }
    }
}

impl DocumentConfig {
    pub fn enabled(&self) -> bool {
        self.template_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

fn default_token_env() -> String {
    "VIGIL_DRIVE_TOKEN".to_string()
}

impl Default for VigilConfig {
    fn default() -> Self {
        let db_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vigil")
            .join("vigil.db");

        Self {
            server: "irc.libera.chat".to_string(),
            port: 6667,
            nick: "VigilBot".to_string(),
            password: None,
            channels: vec!["#somechannel".to_string()],
            public_channels: Vec::new(),
            admins: Vec::new(),
            db_path,
            log_level: "info".to_string(),
            documents: DocumentConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write config at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize default config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("config has invalid value: {0}")]
    ValidationFailed(String),
}

impl VigilConfig {
    /// Explicit path first, then `VIGIL_CONFIG`, then `~/.vigil/config.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Returns the config, the path it lives at, and whether it was just created.
    pub fn load_or_create(explicit: Option<&Path>) -> Result<(Self, PathBuf, bool), ConfigError> {
        let path = Self::resolve_path(explicit);
        if path.exists() {
            let cfg = Self::load(&path)?;
            return Ok((cfg, path, false));
        }

        let cfg = Self::default();
        cfg.save(&path)?;
        Ok((cfg, path, true))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "server cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationFailed(
                "port must be non-zero".to_string(),
            ));
        }
        if self.nick.trim().is_empty() || self.nick.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationFailed(
                "nick must be a single non-empty word".to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "log_level cannot be empty".to_string(),
            ));
        }
        for channel in self.channels.iter().chain(&self.public_channels) {
            if !channel.starts_with(CHANNEL_SIGILS) || channel.contains([' ', ',']) {
                return Err(ConfigError::ValidationFailed(format!(
                    "channel '{channel}' must start with '#' or '&' and contain no spaces or commas"
                )));
            }
        }
        if let Some(public) = self
            .public_channels
            .iter()
            .find(|public| !self.channels.contains(public))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "public channel '{public}' is not in channels"
            )));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    pub fn is_public_channel(&self, channel: &str) -> bool {
        self.public_channels.iter().any(|public| public == channel)
    }
}
