//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use query_frontend::{FrontendConfig, HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned reply from a mock querier.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn protobuf(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "application/protobuf",
            body,
        }
    }
}

/// Handle on a running mock querier.
pub struct MockQuerier {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockQuerier {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable querier on an ephemeral port.
///
/// `f` receives the request target and returns the reply.
pub async fn start_mock_querier<F>(f: F) -> MockQuerier
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let (task_calls, task_requests) = (calls.clone(), requests.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let calls = task_calls.clone();
                    let requests = task_requests.clone();
                    tokio::spawn(async move {
                        let Some(target) = read_request_target(&mut socket).await else {
                            return;
                        };
                        calls.fetch_add(1, Ordering::SeqCst);
                        requests.lock().unwrap().push(target.clone());

                        let reply = f(&target);
                        let head = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            status_line(reply.status),
                            reply.content_type,
                            reply.body.len()
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&reply.body).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockQuerier { addr, calls, requests }
}

/// Read a request head and return its target, e.g. `/api/search?start=1`.
async fn read_request_target(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

/// Config pointing at `querier_url` with default cache settings.
pub fn frontend_config(querier_url: &str) -> FrontendConfig {
    let mut config = FrontendConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.querier_url = querier_url.to_string();
    config.timeouts.request_secs = 5;
    config
}

/// Start a frontend on an ephemeral port. Triggering the returned
/// [`Shutdown`] stops it.
pub async fn start_frontend(config: FrontendConfig) -> (String, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    (format!("http://{addr}"), shutdown)
}
