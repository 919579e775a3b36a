//! Network module - Handles the stream connection to the game server
//!
//! Provides:
//! - Endpoint selection (TCP or Unix domain socket)
//! - Dialing with a timeout
//! - A writer task and a cloneable handle for queuing outbound frames

mod connection;

pub use connection::*;

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_PORT;

/// How to reach the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Unix domain socket on this machine
    Local,
    /// TCP to host:port
    #[default]
    Network,
}

/// A resolved place to connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Endpoint {
    /// Build an endpoint from a mode and a user-supplied address.
    ///
    /// In network mode a bare host gets `default_port`.
    pub fn parse(mode: ConnectionMode, address: &str, default_port: u16) -> Result<Self, ConnectionError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ConnectionError::InvalidAddress(address.to_string()));
        }

        match mode {
            ConnectionMode::Local => Ok(Endpoint::Unix(PathBuf::from(address))),
            ConnectionMode::Network => match address.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port
                        .parse::<u16>()
                        .map_err(|_| ConnectionError::InvalidAddress(address.to_string()))?;
                    if host.is_empty() {
                        return Err(ConnectionError::InvalidAddress(address.to_string()));
                    }
                    Ok(Endpoint::Tcp {
                        host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
                        port,
                    })
                }
                None => Ok(Endpoint::Tcp {
                    host: address.to_string(),
                    port: default_port,
                }),
            },
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        match self {
            Endpoint::Tcp { .. } => ConnectionMode::Network,
            Endpoint::Unix(_) => ConnectionMode::Local,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}
