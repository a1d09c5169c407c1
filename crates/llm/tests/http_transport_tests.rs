//! Tests for the HTTP transport against a loopback listener.

use std::time::Duration;

use llm::*;
use pipeline::{GenerationRequest, ServiceError, TextGenerator};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts one connection, answers with `status` and `body`, and returns the
/// raw request it received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (base_url, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

fn request() -> GenerationRequest {
    GenerationRequest::new("Explain: {}", "Respond with JSON.")
}

#[tokio::test]
async fn posts_generate_body_and_reads_last_fragment() {
    let (base_url, server) = serve_once(
        "200 OK",
        "{\"response\":\"{\\\"explanation\\\":\",\"done\":false}\n{\"response\":\"{\\\"explanation\\\": \\\"ok\\\"}\",\"done\":true}\n",
    )
    .await;
    let client = GenerationClient::http(&format!("{base_url}/"), "mistral")
        .unwrap()
        .with_policy(BackoffPolicy::immediate(1));

    let text = client.generate_text(&request()).await.unwrap();
    let raw_request = server.await.unwrap();

    assert_eq!(text, r#"{"explanation": "ok"}"#);
    assert!(raw_request.starts_with("POST /api/generate HTTP/1.1"), "{raw_request}");

    let body_start = raw_request.find("\r\n\r\n").unwrap() + 4;
    let sent: serde_json::Value = serde_json::from_str(&raw_request[body_start..]).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({
            "model": "mistral",
            "prompt": "Explain: {}",
            "system": "Respond with JSON.",
            "stream": false,
            "format": "json",
        })
    );
}

#[tokio::test]
async fn error_status_is_not_retried() {
    let (base_url, server) = serve_once("500 Internal Server Error", "model not loaded").await;
    let client = GenerationClient::http(&base_url, "mistral")
        .unwrap()
        .with_policy(BackoffPolicy::immediate(5));

    let err = client.generate(&request()).await.unwrap_err();
    server.await.unwrap();

    match err {
        ServiceError::GenerationFailed { reason } => {
            assert!(reason.contains("500"), "{reason}");
            assert!(reason.contains("model not loaded"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn closed_port_is_unreachable_and_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = GenerationClient::http(&base_url, "mistral")
        .unwrap()
        .with_policy(BackoffPolicy::immediate(2))
        .with_attempt_timeout(Duration::from_secs(5));

    let err = client.generate_text(&request()).await.unwrap_err();

    assert!(
        matches!(err, GenerationError::Exhausted { attempts: 2, .. }),
        "{err:?}"
    );
}

#[test]
fn endpoint_path_is_appended_once() {
    let transport = HttpTransport::new("http://localhost:11434/", DEFAULT_ATTEMPT_TIMEOUT).unwrap();
    assert_eq!(transport.url(), "http://localhost:11434/api/generate");
}
