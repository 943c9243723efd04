use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

/// What the stub saw on the wire for one request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct StubServer {
    pub base_url: String,
    pub requests: Receiver<CapturedRequest>,
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serves `response` verbatim to the next `connections` clients, then stops.
pub fn serve(response: Vec<u8>, connections: usize) -> StubServer {
    serve_with_delay(response, connections, Duration::ZERO)
}

/// Like [`serve`] but waits `delay` after reading each request before answering.
pub fn serve_with_delay(response: Vec<u8>, connections: usize, delay: Duration) -> StubServer {
    spawn(connections, move |stream| {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let _ = stream.write_all(&response);
        let _ = stream.flush();
    })
}

/// Sends `head` at once, then `body` one byte every `interval`.
pub fn serve_trickle(head: Vec<u8>, body: Vec<u8>, interval: Duration) -> StubServer {
    spawn(1, move |stream| {
        let _ = stream.write_all(&head);
        let _ = stream.flush();
        for byte in &body {
            thread::sleep(interval);
            let _ = stream.write_all(&[*byte]);
            let _ = stream.flush();
        }
    })
}

fn spawn<F>(connections: usize, respond: F) -> StubServer
where
    F: Fn(&mut TcpStream) + Send + 'static,
{
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let base_url = format!("http://{}", listener.local_addr().expect("stub address"));
    let (sender, requests) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let Ok(mut stream) = stream else { continue };
            let Some(captured) = read_request(&mut stream) else { continue };
            let _ = sender.send(captured);
            respond(&mut stream);
        }
    });

    StubServer { base_url, requests }
}

fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok()?;

    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = raw[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

/// A full HTTP/1.1 response with a `Content-Length` computed from `body`.
pub fn response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut raw = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

    let mut raw = raw.into_bytes();
    raw.extend_from_slice(body);
    raw
}
