use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use dotenvy::Error as DotenvError;
use it_worked_image::container_data_url;
use thiserror::Error;

use crate::platform::RuntimePlatform;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "public/data";
const PORT_ENV: &str = "PORT";
const BIND_ADDR_ENV: &str = "BIND_ADDR";
const DATA_DIR_ENV: &str = "DATA_DIR";
const ORIGIN_ENV: &str = "PAGE_ORIGIN";

/// Configuration consumed by the runtime before spinning up Axum.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding `container.json`, served at `/data/container.json`.
    pub data_dir: PathBuf,
    /// Origin the page fetches `/data/container.json` from. `None` means "this server".
    pub origin: Option<String>,
    pub platform: RuntimePlatform,
}

impl ServerConfig {
    /// Loads configuration from `PORT`, `BIND_ADDR`, `DATA_DIR` and `PAGE_ORIGIN`.
    ///
    /// Values from a local `.env` file (parsed via [`dotenvy::dotenv_override`]) override whatever
    /// is already set in the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_overrides()?;

        let port = env::var(PORT_ENV)
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let addr = env::var(BIND_ADDR_ENV)
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let data_dir = env::var(DATA_DIR_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let origin = env::var(ORIGIN_ENV)
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(validate_origin)
            .transpose()?; // convert Option<Result> -> Result<Option>

        Ok(Self {
            bind_addr: SocketAddr::new(addr, port),
            data_dir,
            origin,
            platform: RuntimePlatform::detect(),
        })
    }

    /// Returns a builder for programmatic overrides.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Origin the page fetches from once the listener is bound to `local_addr`.
    ///
    /// Without an explicit origin this is the server itself, reached over loopback when the
    /// listener is bound to an unspecified address.
    pub fn origin_for(&self, local_addr: SocketAddr) -> String {
        if let Some(origin) = &self.origin {
            return origin.clone();
        }

        let ip = match local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}", SocketAddr::new(ip, local_addr.port()))
    }
}

impl Default for ServerConfig {
    /// Binds to `0.0.0.0:3000` and serves `public/data`.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            origin: None,
            platform: RuntimePlatform::default(),
        }
    }
}

/// Builder type for [`ServerConfig`].
#[derive(Default, Clone, Debug)]
pub struct ServerConfigBuilder {
    bind_addr: Option<SocketAddr>,
    data_dir: Option<PathBuf>,
    origin: Option<String>,
}

impl ServerConfigBuilder {
    /// Sets the address for the embedded Axum listener.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Sets the directory `container.json` is served from.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Makes the page fetch its container document from another origin.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Builds the final configuration, validating the origin if one was set.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let defaults = ServerConfig::default();
        let origin = self.origin.map(validate_origin).transpose()?;

        Ok(ServerConfig {
            bind_addr: self.bind_addr.unwrap_or(defaults.bind_addr),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            origin,
            platform: defaults.platform,
        })
    }
}

/// Errors that can occur while building [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid page origin: {0}")]
    InvalidOrigin(String),
    #[error("failed to load .env overrides: {0}")]
    Dotenv(#[from] DotenvError),
}

fn validate_origin(origin: String) -> Result<String, ConfigError> {
    match container_data_url(&origin) {
        Ok(_) => Ok(origin),
        Err(_) => Err(ConfigError::InvalidOrigin(origin)),
    }
}

fn load_env_overrides() -> Result<(), ConfigError> {
    match dotenvy::dotenv_override() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err)),
    }
}
