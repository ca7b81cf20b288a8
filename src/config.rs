use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::error::ServerError;

/// Upstream the root path is forwarded to when no static index exists.
pub const DEFAULT_PROXY_UPSTREAM: &str = "http://google.com/";

/// Immutable server settings, built once at startup and handed to the
/// listener and router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interface to bind. Defaults to every interface.
    pub host: String,
    /// HTTPS port. Defaults to 4000.
    pub port: u16,
    /// Directory served read-only. Defaults to `static`, resolved against
    /// the process working directory rather than the executable's location,
    /// so start the server from the directory that holds `static/` or set
    /// `STATIC_ROOT` to an absolute path.
    pub static_root: PathBuf,
    /// PEM certificate chain. Defaults to `cert.pem`.
    pub cert_path: PathBuf,
    /// PEM private key. Defaults to `key.pem`.
    pub key_path: PathBuf,
    /// Plain-HTTP URL answering `/` when the static root has no index.
    /// `None` turns the forwarder off.
    pub proxy_upstream: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            static_root: PathBuf::from("static"),
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
            proxy_upstream: Some(DEFAULT_PROXY_UPSTREAM.to_string()),
        }
    }
}

impl Config {
    /// Defaults overridden by `HOST`, `PORT`, `STATIC_ROOT`, `CERT_PATH`,
    /// `KEY_PATH` and `PROXY_UPSTREAM`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    ///
    /// An unparsable `PORT` keeps the default. An empty `PROXY_UPSTREAM`
    /// disables the forwarder.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            static_root: lookup("STATIC_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_root),
            cert_path: lookup("CERT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cert_path),
            key_path: lookup("KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_path),
            proxy_upstream: match lookup("PROXY_UPSTREAM") {
                Some(url) if url.trim().is_empty() => None,
                Some(url) => Some(url),
                None => defaults.proxy_upstream,
            },
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ServerError::InvalidAddress {
                host: self.host.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
