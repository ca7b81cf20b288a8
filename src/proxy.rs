//! Pass-through forwarder for the root path.
//!
//! When the static root has no index, `/` is relayed to one fixed upstream
//! URL and the upstream's status, headers and body are streamed back as
//! they arrive. Redirects to plain-HTTP targets are followed up to
//! [`MAX_REDIRECTS`] times; the forwarder never retries.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header,
        uri::Scheme,
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use log::{debug, error};

use crate::error::ServerError;

/// Redirect hops followed before the request is abandoned with 502.
pub const MAX_REDIRECTS: usize = 10;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// The fixed target plus a pooled client to reach it.
#[derive(Clone)]
pub struct Upstream {
    uri: Uri,
    client: Client<HttpConnector, Body>,
}

impl Upstream {
    /// Accepts absolute `http://` URLs only.
    pub fn new(url: &str) -> Result<Self, ServerError> {
        let invalid = |reason| ServerError::InvalidUpstream {
            url: url.to_string(),
            reason,
        };

        let uri: Uri = url.parse().map_err(|_| invalid("not a valid URI"))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid("only http:// upstreams are supported"));
        }
        if uri.authority().is_none() {
            return Err(invalid("missing host"));
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { uri, client })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

/// Fallback router for requests the static root could not answer.
///
/// With an upstream, `GET /` (and `HEAD /`) is forwarded; every other
/// request, other methods on `/` included, is a 404.
pub fn routes(upstream: Option<Upstream>) -> Router {
    match upstream {
        Some(upstream) => Router::new()
            .route("/", get(forward).fallback(not_found))
            .with_state(upstream),
        None => Router::new(),
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn forward(State(upstream): State<Upstream>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    debug!("forwarding {} {} to {}", parts.method, parts.uri, upstream.uri);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    let mut target = upstream.uri.clone();
    let mut redirects = 0;
    loop {
        let outbound = outbound_request(&parts.method, &target, &headers);
        let response = match upstream.client.request(outbound).await {
            Ok(response) => response,
            Err(err) => {
                error!("upstream {} failed: {}", target, err);
                return StatusCode::BAD_GATEWAY.into_response();
            }
        };

        match redirect_target(&target, response.status(), response.headers()) {
            Some(next) if redirects < MAX_REDIRECTS => {
                debug!("following {} redirect to {}", response.status(), next);
                redirects += 1;
                target = next;
            }
            Some(_) => {
                error!("upstream {} exceeded {} redirects", upstream.uri, MAX_REDIRECTS);
                return StatusCode::BAD_GATEWAY.into_response();
            }
            None => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                return Response::from_parts(parts, Body::new(body));
            }
        }
    }
}

/// Builds a bodiless request for `target`, with `Host` set to its authority.
fn outbound_request(method: &Method, target: &Uri, headers: &HeaderMap) -> Request {
    let mut headers = headers.clone();
    if let Some(host) = target
        .authority()
        .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
    {
        headers.insert(header::HOST, host);
    }

    let mut outbound = Request::new(Body::empty());
    *outbound.method_mut() = method.clone();
    *outbound.uri_mut() = target.clone();
    *outbound.version_mut() = Version::HTTP_11;
    *outbound.headers_mut() = headers;
    outbound
}

/// Where a redirect response points, if it should be followed. Only
/// plain-HTTP targets are followed; anything else is relayed as is.
fn redirect_target(base: &Uri, status: StatusCode, headers: &HeaderMap) -> Option<Uri> {
    if !matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    let next = resolve_location(base, location)?;
    (next.scheme() == Some(&Scheme::HTTP)).then_some(next)
}

/// Resolves a `Location` value against the URL that produced it.
fn resolve_location(base: &Uri, location: &str) -> Option<Uri> {
    if let Some(rest) = location.strip_prefix("//") {
        let scheme = base.scheme_str().unwrap_or("http");
        return format!("{scheme}://{rest}").parse().ok();
    }
    if location.contains("://") {
        return location.parse().ok();
    }

    let path = if location.starts_with('/') {
        location.to_string()
    } else {
        let base_path = base.path();
        let dir = &base_path[..base_path.rfind('/').map_or(0, |i| i + 1)];
        format!("{dir}{location}")
    };

    let mut parts = base.clone().into_parts();
    parts.path_and_query = Some(path.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// Removes hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
