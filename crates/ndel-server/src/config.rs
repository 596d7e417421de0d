use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ServerError, ServerResult};

/// Prefix for environment overrides, e.g. `ND_LISTEN`.
pub const ENV_PREFIX: &str = "ND";

/// Server configuration.
///
/// Built once at startup (defaults, then an optional TOML file, then
/// environment overrides) and passed by reference to the server constructor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address: `tcp://host:port`, `host:port` or `:port`.
    pub listen: String,
    /// Public host name clients use to reach the server.
    pub host: String,
    /// Root directory for blobs and the metadata database.
    pub data_path: PathBuf,
    /// Public scheme (`http` or `https`). TLS is terminated in front of us.
    pub proto: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_size: usize,
    /// How long to wait for the metadata database lock at startup.
    pub db_open_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "tcp://:8080".into(),
            host: "localhost:8080".into(),
            data_path: PathBuf::from("/var/opt/ndel/"),
            proto: "http".into(),
            max_upload_size: 1024 * 1024 * 1024,
            db_open_timeout_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read the optional TOML file at `path` and apply process environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServerError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                let config = Self::from_toml_str(&text)?;
                info!(path = %path.display(), "configuration file loaded");
                config
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `ND_*` overrides, then `PORT`, using `lookup` to read variables.
    ///
    /// `PORT` wins over `ND_LISTEN` so platform-assigned ports are honoured.
    pub fn apply_env<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |field: &str| -> Option<(String, String)> {
            let key = format!("{ENV_PREFIX}_{}", field.to_uppercase());
            lookup(&key).filter(|v| !v.is_empty()).map(|v| (key, v))
        };

        if let Some((key, value)) = var("Listen") {
            info!(%key, %value, "listen set from env");
            self.listen = value;
        }
        if let Some((key, value)) = var("Host") {
            info!(%key, %value, "host set from env");
            self.host = value;
        }
        if let Some((key, value)) = var("DataPath") {
            info!(%key, %value, "data_path set from env");
            self.data_path = PathBuf::from(value);
        }
        if let Some((key, value)) = var("Proto") {
            info!(%key, %value, "proto set from env");
            self.proto = value;
        }
        if let Some((key, value)) = var("MaxUploadSize") {
            self.max_upload_size = value
                .parse()
                .map_err(|e| ServerError::Config(format!("{key}={value}: {e}")))?;
            info!(%key, %value, "max_upload_size set from env");
        }
        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            info!(%port, "listen port set from PORT");
            self.listen = format!("tcp://:{port}");
        }
        Ok(())
    }

    /// Resolve [`listen`](Self::listen) to a socket address. An empty host
    /// binds all interfaces.
    pub fn listen_addr(&self) -> ServerResult<SocketAddr> {
        let addr = match self.listen.split_once("://") {
            Some(("tcp", rest)) => rest,
            Some((scheme, _)) => {
                return Err(ServerError::Config(format!(
                    "unsupported listen scheme: {scheme}"
                )))
            }
            None => self.listen.as_str(),
        };
        let addr = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr.to_string()
        };
        addr.to_socket_addrs()
            .map_err(|e| ServerError::Config(format!("invalid listen address {addr}: {e}")))?
            .next()
            .ok_or_else(|| ServerError::Config(format!("listen address {addr} did not resolve")))
    }

    pub fn is_https(&self) -> bool {
        self.proto.contains("https")
    }

    /// Directory holding one file per blob.
    pub fn objects_dir(&self) -> PathBuf {
        self.data_path.join("objects")
    }

    /// Path of the metadata database file.
    pub fn meta_db_path(&self) -> PathBuf {
        self.data_path.join("meta.db")
    }

    pub fn db_open_timeout(&self) -> Duration {
        Duration::from_millis(self.db_open_timeout_ms)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}
