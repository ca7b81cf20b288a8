use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the server from starting or keep it from serving.
///
/// Per-request failures never surface here; they become status codes.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load TLS certificate {} and key {}", .cert.display(), .key.display())]
    Tls {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid listen address {host:?}")]
    InvalidAddress {
        host: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid proxy upstream {url:?}: {reason}")]
    InvalidUpstream { url: String, reason: &'static str },

    #[error("server on {addr} failed")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}
