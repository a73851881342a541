//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bff_aggregator::config::{BffConfig, PropagationStyle};
use bff_aggregator::lifecycle::Shutdown;
use bff_aggregator::observability::{Segment, SegmentEmitter, Tracer};
use bff_aggregator::HttpServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Header names are lowercased.
pub type Headers = HashMap<String, String>;

/// A raw-TCP backend that records what it receives.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<(Instant, Headers)>>>,
    completed: Arc<Mutex<Vec<Instant>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn headers(&self) -> Vec<Headers> {
        self.requests.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn first_received_at(&self) -> Option<Instant> {
        self.requests.lock().unwrap().first().map(|(at, _)| *at)
    }

    pub fn first_completed_at(&self) -> Option<Instant> {
        self.completed.lock().unwrap().first().copied()
    }
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicU32::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
        completed: Arc::new(Mutex::new(Vec::new())),
    };
    let f = Arc::new(f);
    let recorder = backend.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorder = recorder.clone();
                    tokio::spawn(async move {
                        let headers = read_request_head(&mut socket).await;
                        recorder.hits.fetch_add(1, Ordering::SeqCst);
                        recorder.requests.lock().unwrap().push((Instant::now(), headers));

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        recorder.completed.lock().unwrap().push(Instant::now());
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Start a mock backend that always returns the same status and body.
pub async fn start_json_backend(status: u16, body: &'static str) -> MockBackend {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request_head(socket: &mut TcpStream) -> Headers {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    String::from_utf8_lossy(&buf)
        .lines()
        .skip(1)
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}

/// Collects closed segments in memory.
#[derive(Default)]
pub struct CollectingEmitter(Mutex<Vec<Segment>>);

impl CollectingEmitter {
    pub fn segments(&self) -> Vec<Segment> {
        self.0.lock().unwrap().clone()
    }
}

impl SegmentEmitter for CollectingEmitter {
    fn emit(&self, segment: &Segment) {
        self.0.lock().unwrap().push(segment.clone());
    }
}

/// A running aggregator bound to an ephemeral port.
pub struct TestBff {
    pub addr: SocketAddr,
    pub emitter: Arc<CollectingEmitter>,
    shutdown: Shutdown,
}

impl TestBff {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestBff {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn config_for(backend_1: &str, backend_2: &str) -> BffConfig {
    let mut config = BffConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.downstream.backend_1_url = Some(backend_1.to_string());
    config.downstream.backend_2_url = Some(backend_2.to_string());
    config
}

pub async fn start_bff(config: BffConfig) -> TestBff {
    let emitter = Arc::new(CollectingEmitter::default());
    let tracer = Tracer::new(
        config.tracing.service_name.clone(),
        config.tracing.propagation,
        emitter.clone(),
    );
    let server = HttpServer::with_tracer(config, tracer);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestBff {
        addr,
        emitter,
        shutdown,
    }
}

pub async fn start_bff_with_style(backend_1: &str, backend_2: &str, style: PropagationStyle) -> TestBff {
    let mut config = config_for(backend_1, backend_2);
    config.tracing.propagation = style;
    start_bff(config).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
