use std::net::SocketAddr;
use std::time::Duration;

use axum::{middleware, Router};
use axum_server::Handle;
use log::info;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ServerError;
use crate::proxy::{self, Upstream};
use crate::{headers, static_files, tls};

/// Grace period for in-flight requests after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Loads TLS material, binds the listener and serves until shutdown.
///
/// A missing or unparsable certificate or key is returned before any
/// socket is opened.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    let tls_config = tls::load(&config).await?;
    let app = create_routes(&config)?;

    let handle = Handle::new();
    tokio::spawn(announce_when_bound(handle.clone()));
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|source| ServerError::Serve { addr, source })?;

    info!("server stopped");
    Ok(())
}

/// The request pipeline: headers, path guard, static root and the
/// optional root proxy, in that order.
pub fn create_routes(config: &Config) -> Result<Router, ServerError> {
    let upstream = config
        .proxy_upstream
        .as_deref()
        .map(Upstream::new)
        .transpose()?;
    if let Some(upstream) = &upstream {
        info!("proxying / to {} when no index is present", upstream.uri());
    }

    let files = static_files::service(&config.static_root, proxy::routes(upstream));
    let router = Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn(static_files::guard_paths));

    Ok(headers::apply(router).layer(TraceLayer::new_for_http()))
}

async fn announce_when_bound(handle: Handle) {
    if let Some(addr) = handle.listening().await {
        println!("server is running at port {}", addr.port());
        info!("listening on https://{}", display_addr(addr));
    }
}

async fn shutdown_on_ctrl_c(handle: Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    }
}

fn display_addr(addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        SocketAddr::new([127, 0, 0, 1].into(), addr.port())
    } else {
        addr
    }
}
