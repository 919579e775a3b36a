//! Configuration module
//!
//! Handles loading and saving GuessNet configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::{CommandRules, OpponentIdPolicy};
use crate::network::{ConnectionMode, ConnectionError, Endpoint};
use crate::protocol::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_PORT, DEFAULT_SOCKET_PATH, MAX_TEXT_LENGTH};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Game command settings
    #[serde(default)]
    pub game: GameConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connect over TCP ("network") or a Unix socket ("local")
    #[serde(default)]
    pub mode: ConnectionMode,
    /// Server host in network mode
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port in network mode
    #[serde(default = "default_port")]
    pub port: u16,
    /// Socket path in local mode
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Offer to retry when the server refuses the connection
    #[serde(default = "default_true")]
    pub reconnect_prompt: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::default(),
            host: default_host(),
            port: default_port(),
            socket_path: default_socket_path(),
            connect_timeout_ms: default_connect_timeout(),
            reconnect_prompt: default_true(),
        }
    }
}

impl NetworkConfig {
    /// Endpoint for the given mode and optional address override
    pub fn endpoint(&self, mode: Option<ConnectionMode>, address: Option<&str>) -> Result<Endpoint, ConnectionError> {
        let mode = mode.unwrap_or(self.mode);
        match address {
            Some(address) => Endpoint::parse(mode, address, self.port),
            None => Ok(match mode {
                ConnectionMode::Local => Endpoint::Unix(self.socket_path.clone()),
                ConnectionMode::Network => Endpoint::Tcp {
                    host: self.host.clone(),
                    port: self.port,
                },
            }),
        }
    }
}

/// Game command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Maximum characters in a word, guess or hint
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Reject opponent ids that are not numbers instead of sending them anyway
    #[serde(default)]
    pub strict_opponent_id: bool,
    /// Largest frame the decoder will buffer
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_max_text_length() -> usize {
    MAX_TEXT_LENGTH
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            strict_opponent_id: false,
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl GameConfig {
    pub fn command_rules(&self) -> CommandRules {
        CommandRules {
            max_text_length: self.max_text_length,
            opponent_id_policy: if self.strict_opponent_id {
                OpponentIdPolicy::Strict
            } else {
                OpponentIdPolicy::Lenient
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("guessnet/config.toml")),
            Some(PathBuf::from("./guessnet.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        network: NetworkConfig {
            mode: ConnectionMode::Local,
            ..Default::default()
        },
        game: GameConfig {
            strict_opponent_id: true,
            ..Default::default()
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}
