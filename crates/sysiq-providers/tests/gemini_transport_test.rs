//! Integration tests for the Gemini transport.
//!
//! CHARACTERIZATION: These tests drive `GeminiProvider` against a throwaway
//! HTTP listener on localhost and check how each transport outcome surfaces.
//!
//! What this test protects:
//! - The request hits `/v1beta/models/<model>:generateContent` with the key header
//! - A 200 envelope yields the generated text
//! - Non-success statuses surface as `HttpStatus(code)` with no retry
//! - Refused connections and stalled servers map to `ConnectFailed` / `Timeout`
//!
//! What this test intentionally does NOT assert:
//! - Real Gemini behaviour (requires an API key)

use std::time::Duration;

use sysiq_providers::{CompletionRequest, GeminiProvider, LLMProvider, ProviderError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one HTTP/1.1 request (headers + Content-Length body).
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(header_end) = find_subslice(&buf, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Serve exactly one canned response; the join handle yields the raw request.
async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{}", addr), handle)
}

fn provider_for(base_url: &str, timeout: Duration) -> GeminiProvider {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .unwrap();
    GeminiProvider::new(
        "test-key".to_string(),
        Some("gemini-test".to_string()),
        Some(256),
        None,
    )
    .unwrap()
    .with_client(client)
    .with_base_url(base_url)
}

#[tokio::test]
async fn test_successful_envelope_yields_generated_text() {
    let envelope = r#"{"candidates":[{"content":{"parts":[{"text":"{\"command\":\"df -h\"}"}],"role":"model"},"finishReason":"STOP"}]}"#;
    let (base_url, server) = serve_once("200 OK", envelope.to_string()).await;

    let provider = provider_for(&base_url, Duration::from_secs(5));
    let request = CompletionRequest::new("show me disk usage")
        .with_temperature(0.0)
        .with_json_output(true);

    let response = provider.complete(request).await.unwrap();
    assert_eq!(response.content, r#"{"command":"df -h"}"#);
    assert_eq!(response.model, "gemini-test");

    let raw_request = server.await.unwrap();
    assert!(raw_request.starts_with("POST /v1beta/models/gemini-test:generateContent"));
    assert!(raw_request.to_lowercase().contains("x-goog-api-key: test-key"));
    assert!(raw_request.contains("show me disk usage"));
    assert!(raw_request.contains("\"generationConfig\""));
    assert!(raw_request.contains("\"responseMimeType\":\"application/json\""));
}

#[tokio::test]
async fn test_rate_limit_status_is_reported() {
    let (base_url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"code":429,"message":"quota"}}"#.to_string(),
    )
    .await;

    let provider = provider_for(&base_url, Duration::from_secs(5));
    let err = provider
        .send(CompletionRequest::new("anything"))
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::HttpStatus(429));
    assert!(err.is_rate_limited());
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_status_is_reported() {
    let (base_url, server) = serve_once("503 Service Unavailable", String::new()).await;

    let provider = provider_for(&base_url, Duration::from_secs(5));
    let err = provider
        .send(CompletionRequest::new("anything"))
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::HttpStatus(503));
    server.await.unwrap();
}

#[tokio::test]
async fn test_envelope_without_text_is_malformed() {
    let (base_url, server) = serve_once("200 OK", r#"{"candidates":[]}"#.to_string()).await;

    let provider = provider_for(&base_url, Duration::from_secs(5));
    let err = provider
        .complete(CompletionRequest::new("anything"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::MalformedEnvelope(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_refused_connection_is_connect_failed() {
    // Reserve a port, then release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = provider_for(&format!("http://{}", addr), Duration::from_secs(5));
    let err = provider
        .send(CompletionRequest::new("anything"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ConnectFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_stalled_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
    });

    let provider = provider_for(&format!("http://{}", addr), Duration::from_millis(300));
    let err = provider
        .send(CompletionRequest::new("anything"))
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::Timeout);
    server.abort();
}
