//! Scripted HTTP backend for coordinator tests.
//!
//! Accepts real connections, parses just enough HTTP/1.1 to route
//! `(method, path, body)` through a test-provided closure, and logs every
//! request so tests can assert ordering (e.g. "the stop must be confirmed
//! before the next start goes out").

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Path including query string
    pub path: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn is(&self, method: &str, path_prefix: &str) -> bool {
        self.method == method && self.path.starts_with(path_prefix)
    }
}

pub type Responder = dyn Fn(&CapturedRequest) -> (u16, String) + Send + Sync;

pub struct MockBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    accept_loop: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start(responder: Arc<Responder>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::default();

        let log = requests.clone();
        let accept_loop = tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request.clone());
                let (status, body) = responder(&request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    body,
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        Self {
            base_url,
            requests,
            accept_loop,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let mut header_end = None;
    let mut content_length = 0usize;

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if header_end.is_none() {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                header_end = Some(pos);
                let head = String::from_utf8_lossy(&buf[..pos]);
                content_length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
            }
        }
        if let Some(pos) = header_end {
            if buf.len() >= pos + 4 + content_length {
                break;
            }
        }
    }

    let pos = header_end.unwrap_or(buf.len());
    let head = String::from_utf8_lossy(&buf[..pos]).to_string();
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let body = if buf.len() > pos + 4 {
        String::from_utf8_lossy(&buf[pos + 4..]).to_string()
    } else {
        String::new()
    };

    CapturedRequest { method, path, body }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        _ => "200 OK",
    }
}

// ── Envelope body helpers ───────────────────────────────────────────────────

pub fn ok_data(data: serde_json::Value) -> (u16, String) {
    (
        200,
        serde_json::json!({"success": true, "data": data}).to_string(),
    )
}

pub fn ok_empty() -> (u16, String) {
    (200, r#"{"success": true, "data": null}"#.to_string())
}

pub fn rejected(error: &str) -> (u16, String) {
    (
        400,
        serde_json::json!({"success": false, "error": error}).to_string(),
    )
}

pub fn record_json(id: i64, estimate_id: &str, started_at: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "tarefa_id": format!("task-of-{estimate_id}"),
        "cliente_id": "C-1",
        "usuario_id": 7,
        "tempo_estimado_id": estimate_id,
        "data_inicio": started_at,
    })
}
