//! Cross-origin headers stamped on every response.

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Header names and values, in the order they are applied.
pub const CROSS_ORIGIN_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
];

/// Wraps `router` so each response leaves with exactly these values,
/// replacing whatever an inner service (or a proxied upstream) set.
pub fn apply(router: Router) -> Router {
    CROSS_ORIGIN_HEADERS
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}
