pub mod config;
pub mod error;
pub mod headers;
pub mod proxy;
pub mod server;
pub mod static_files;
pub mod tls;

pub use config::Config;
pub use error::ServerError;
