#![allow(dead_code)]
//! Minimal HTTP/1.1 server for scenarios wiremock cannot express: dropping
//! connections on accept, never answering, and counting accepted connections.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answer every request with this status over a keep-alive connection
    Respond(u16),
    /// Close the socket right after accept
    CloseOnAccept,
    /// Read requests but never answer
    Hang,
}

pub struct MockHttpServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    accept_task: JoinHandle<()>,
}

impl MockHttpServer {
    pub async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(AtomicUsize::new(0));

        let accept_task = {
            let connections = Arc::clone(&connections);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                // Dropped with the accept task, which aborts every connection
                let mut open = JoinSet::new();
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    match behavior {
                        Behavior::CloseOnAccept => drop(stream),
                        _ => {
                            open.spawn(serve(stream, behavior, Arc::clone(&requests)));
                        }
                    }
                }
            })
        };

        Self {
            addr,
            connections,
            requests,
            accept_task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(mut stream: TcpStream, behavior: Behavior, requests: Arc<AtomicUsize>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let (header_end, content_length) = loop {
            if let Some(pos) = find_header_end(&buf) {
                break (pos + 4, content_length(&buf[..pos]));
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        while buf.len() < header_end + content_length {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        buf.drain(..header_end + content_length);
        requests.fetch_add(1, Ordering::SeqCst);

        match behavior {
            Behavior::Respond(status) => {
                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok",
                    reason(status)
                );
                if stream.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
            }
            Behavior::Hang => std::future::pending::<()>().await,
            Behavior::CloseOnAccept => return,
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

#[tokio::test]
async fn test_mock_server_answers_keep_alive_requests() {
    let server = MockHttpServer::start(Behavior::Respond(200)).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    for _ in 0..2 {
        stream
            .write_all(b"POST /ingest HTTP/1.1\r\nHost: x\r\nContent-Length: 2\r\n\r\n[]")
            .await
            .unwrap();
        let mut response = [0u8; 128];
        let n = stream.read(&mut response).await.unwrap();
        assert!(response[..n].starts_with(b"HTTP/1.1 200 OK"));
    }

    assert_eq!(server.connections(), 1);
    assert_eq!(server.requests(), 2);
}
