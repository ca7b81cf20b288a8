//! Shared helpers for driving the request pipeline in-process.
#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use ems_server::{headers::CROSS_ORIGIN_HEADERS, Config};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tower::ServiceExt;

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A temporary static root holding `files` (relative path, contents).
pub fn static_root(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        write_file(&dir, path, contents.as_bytes());
    }
    dir
}

pub fn write_file(root: &TempDir, path: &str, contents: &[u8]) {
    let full = root.path().join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, contents).unwrap();
}

/// Config pointing at `root`, with the given upstream (or none).
pub fn config_for(root: &TempDir, upstream: Option<String>) -> Config {
    Config {
        static_root: root.path().to_path_buf(),
        proxy_upstream: upstream,
        ..Config::default()
    }
}

pub async fn send(router: Router, method: Method, uri: &str) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    Reply {
        status: parts.status,
        headers: parts.headers,
        body: to_bytes(body, usize::MAX).await.unwrap(),
    }
}

pub async fn get(router: Router, uri: &str) -> Reply {
    send(router, Method::GET, uri).await
}

pub fn assert_cross_origin_headers(headers: &HeaderMap) {
    for (name, value) in CROSS_ORIGIN_HEADERS {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec![value], "header {name}");
    }
}

/// Starts a one-shot upstream answering with the raw HTTP `response`.
/// The receiver yields the request head the upstream saw.
pub async fn start_mock_upstream(
    response: &'static str,
) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = tx.send(read_head(&mut socket).await);
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    (addr, rx)
}

/// Starts an upstream answering successive connections with `responses`,
/// one per connection, in order. The receiver yields each request head.
pub async fn start_scripted_upstream(
    responses: Vec<String>,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = tx.send(read_head(&mut socket).await);
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });

    (addr, rx)
}

/// A bodiless redirect to `location` that closes the connection.
pub fn redirect_to(location: &str) -> String {
    format!(
        "HTTP/1.1 301 Moved Permanently\r\nLocation: {location}\r\n\
         Content-Length: 0\r\nConnection: close\r\n\r\n"
    )
}

/// A `200 OK` plain-text response carrying `body`.
pub fn ok_with(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    )
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut head: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
