//! Shared test support: an in-process detection service stub.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Scripted response body: called with the request index (0-based) and the
/// parsed request JSON.
pub type ResponseScript = Box<dyn Fn(usize, &serde_json::Value) -> String + Send>;

/// Minimal HTTP detection service for integration tests. Serves one scripted
/// response per request and records every request body.
pub struct StubService {
    pub base_url: String,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StubService {
    pub fn spawn(script: ResponseScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub service");
        let addr = listener.local_addr().expect("stub service addr");
        listener.set_nonblocking(true).expect("nonblocking listener");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_requests = requests.clone();
        let thread_shutdown = shutdown.clone();

        let join = std::thread::spawn(move || {
            let mut served = 0usize;
            loop {
                if thread_shutdown.load(Ordering::SeqCst) {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _)) => {
                        handle_request(stream, &script, served, &thread_requests);
                        served += 1;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
            shutdown,
            join: Some(join),
        }
    }

    /// Request bodies received so far, in arrival order.
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for StubService {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn handle_request(
    mut stream: TcpStream,
    script: &ResponseScript,
    index: usize,
    requests: &Arc<Mutex<Vec<serde_json::Value>>>,
) {
    stream.set_nonblocking(false).expect("blocking stream");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");

    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find_subsequence(&data, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf).expect("read request headers");
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
    };

    let headers = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf).expect("read request body");
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }

    let body: serde_json::Value =
        serde_json::from_slice(&data[header_end..header_end + content_length])
            .expect("json request body");
    let payload = script(index, &body);
    requests.lock().expect("requests lock").push(body);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes());
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Successful response carrying the given (label, confidence) detections.
pub fn success_response(detections: &[(&str, f32)]) -> String {
    let detections: Vec<serde_json::Value> = detections
        .iter()
        .map(|(label, confidence)| {
            serde_json::json!({
                "class": label,
                "confidence": confidence,
                "bbox": [10, 20, 110, 220],
            })
        })
        .collect();
    serde_json::json!({
        "success": true,
        "detections": detections,
        "processed_image": "data:image/jpeg;base64,QUJD",
        "timestamp": "2024-05-02 13:45:09",
        "processing_time_ms": 5,
    })
    .to_string()
}

/// Well-formed response with `success: false`.
pub fn failure_response(error: &str) -> String {
    serde_json::json!({
        "success": false,
        "error": error,
    })
    .to_string()
}
