//! Configuration types.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use tracing::warn;

use crate::error::ConfigError;

/// Server configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Address the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/fitmatch.db"),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// - `FITMATCH_DB_PATH`: database file (default `./data/fitmatch.db`)
    /// - `FITMATCH_BIND_ADDR`: listen address (default `0.0.0.0`)
    /// - `FITMATCH_PORT`: listen port (default `8080`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Invalid values are logged
    /// and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("FITMATCH_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = match lookup("FITMATCH_BIND_ADDR") {
            Some(raw) => parse_value("FITMATCH_BIND_ADDR", &raw).unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default bind address");
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let port = match lookup("FITMATCH_PORT") {
            Some(raw) => parse_value("FITMATCH_PORT", &raw).unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default port");
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            db_path,
            bind_addr,
            port,
        }
    }

    /// Socket address for the HTTP listener.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
