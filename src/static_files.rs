//! Static file resolution under a read-only root.

use std::path::Path;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use log::warn;
use percent_encoding::percent_decode_str;
use tower_http::services::ServeDir;

/// Directory exempt from the hidden-file rule.
const WELL_KNOWN: &str = ".well-known";

/// Serves files below `root`, answering directories with their
/// `index.html`. Anything that resolves to no file, and any method other
/// than `GET`/`HEAD`, goes to `fallback`.
pub fn service(root: &Path, fallback: Router) -> ServeDir<Router> {
    ServeDir::new(root)
        .append_index_html_on_directories(true)
        .call_fallback_on_method_not_allowed(true)
        .fallback(fallback)
}

/// Middleware run before the filesystem is consulted: traversal attempts
/// get 403, hidden files get 404.
pub async fn guard_paths(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if is_traversal(path) {
        warn!("rejected path traversal attempt: {}", request.uri());
        return StatusCode::FORBIDDEN.into_response();
    }
    if is_hidden(path) {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// True when the percent-decoded path has a `..` segment or a NUL byte.
/// Backslashes count as separators.
pub fn is_traversal(path: &str) -> bool {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded.contains('\0') || decoded.split(['/', '\\']).any(|segment| segment == "..")
}

/// True when a percent-decoded segment starts with `.`. A leading
/// `/.well-known/` directory is allowed; dotfiles inside it are not.
pub fn is_hidden(path: &str) -> bool {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .any(|(i, segment)| segment.starts_with('.') && !(i == 0 && segment == WELL_KNOWN))
}
