use axum_server::tls_rustls::RustlsConfig;
use log::debug;

use crate::config::Config;
use crate::error::ServerError;

/// Reads and parses the certificate chain and private key named by `config`.
///
/// Must succeed before any socket is bound.
pub async fn load(config: &Config) -> Result<RustlsConfig, ServerError> {
    debug!(
        "loading TLS material from {} and {}",
        config.cert_path.display(),
        config.key_path.display()
    );

    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|source| ServerError::Tls {
            cert: config.cert_path.clone(),
            key: config.key_path.clone(),
            source,
        })
}
