use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Captured HTTP request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Chooses the `(status, body)` answered to the n-th request (0-based).
pub type Responder = Arc<dyn Fn(&CapturedRequest, usize) -> (u16, String) + Send + Sync>;

/// Local HTTP server answering through a `Responder`, recording every request.
pub struct MockServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl MockServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::with_capacity(8192);
    let mut tmp = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };
    let header_section = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let body_start = header_end + 4;

    let mut lines = header_section.lines();
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let path = request_line.next().unwrap_or("").to_string();
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let already_read = buf.len() - body_start;
    if already_read < content_length {
        let mut rest = vec![0u8; content_length - already_read];
        stream.read_exact(&mut rest).await.ok()?;
        buf.extend_from_slice(&rest);
    }
    let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();

    Some(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

pub fn spawn_mock_server(responder: Responder) -> MockServer {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    let listener = tokio::net::TcpListener::from_std(listener).unwrap();

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let (h, r) = (hits.clone(), requests.clone());
    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    if let Ok((mut stream, _)) = result {
                        let (hits, requests, responder) = (h.clone(), r.clone(), responder.clone());
                        tokio::spawn(async move {
                            let Some(req) = read_request(&mut stream).await else { return };
                            let n = hits.fetch_add(1, Ordering::SeqCst);
                            let (status, body) = responder(&req, n);
                            requests.lock().unwrap().push(req);
                            let response = format!(
                                "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status,
                                body.len(),
                                body
                            );
                            let _ = stream.write_all(response.as_bytes()).await;
                        });
                    }
                }
                _ = &mut shutdown_rx => break,
            }
        }
    });

    MockServer {
        base_url: format!("http://{}", addr),
        hits,
        requests,
        _shutdown: shutdown_tx,
    }
}

/// Executor stand-in that accepts every submission.
pub fn spawn_accepting_executor() -> MockServer {
    spawn_mock_server(Arc::new(|_: &CapturedRequest, _: usize| (200, "{}".to_string())))
}

/// Executor stand-in that rejects every submission.
pub fn spawn_failing_executor() -> MockServer {
    spawn_mock_server(Arc::new(|_: &CapturedRequest, _: usize| {
        (500, r#"{"error":"no GPU available"}"#.to_string())
    }))
}
