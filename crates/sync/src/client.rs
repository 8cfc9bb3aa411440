//! HTTP client for the trimlog remote API.
//!
//! Every endpoint is a `POST {base_url}/{endpoint}` with a JSON body and an optional bearer
//! token. Responses are returned as raw JSON; the synchronizers give them their shape.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use trimlog_core::errors::Result as CoreResult;
use trimlog_core::sync::{RemoteCollaborator, RemoteRequest};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};

const MAX_LOG_BODY_CHARS: usize = 512;

/// Error body the API sends with non-success statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "msg")]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn into_message(self) -> Option<String> {
        match (self.code, self.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        }
    }
}

/// Client for the remote collaborator.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.default_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    fn headers(token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| RemoteError::invalid_request("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    async fn parse_response(response: reqwest::Response, as_json: bool) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(ApiErrorResponse::into_message)
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(RemoteError::api(status.as_u16(), message));
        }

        if !as_json {
            return Ok(Value::String(body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            RemoteError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Sends one request and returns the parsed body.
    pub async fn send(&self, request: &RemoteRequest) -> Result<Value> {
        let url = self.config.endpoint_url(&request.endpoint);
        debug!("POST {} (timeout {} ms)", url, request.timeout_ms);

        let body = request.payload.clone().unwrap_or(Value::Object(Default::default()));
        let response = self
            .client
            .post(&url)
            .headers(Self::headers(request.auth_token.as_deref())?)
            .timeout(Duration::from_millis(request.timeout_ms))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::from_transport(e, request.timeout_ms))?;

        Self::parse_response(response, request.as_json)
            .await
            .map_err(|e| match e {
                RemoteError::Http(inner) => RemoteError::from_transport(inner, request.timeout_ms),
                other => other,
            })
    }
}

#[async_trait]
impl RemoteCollaborator for RemoteClient {
    async fn request(&self, request: RemoteRequest) -> CoreResult<Value> {
        self.send(&request).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;
    use trimlog_core::errors::Error;

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        request_line: String,
        headers: HashMap<String, String>,
        body: String,
    }

    #[derive(Debug, Clone)]
    struct MockResponse {
        status: u16,
        body: String,
        delay_ms: u64,
    }

    impl MockResponse {
        fn json(status: u16, body: Value) -> Self {
            Self {
                status,
                body: body.to_string(),
                delay_ms: 0,
            }
        }

        fn delayed(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }
    }

    fn header_end_offset(buffer: &[u8]) -> Option<usize> {
        buffer.windows(4).position(|window| window == b"\r\n\r\n")
    }

    async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if header_end_offset(&buffer).is_some() {
                break;
            }
        }

        let header_end = header_end_offset(&buffer)?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buffer[header_end + 4..].to_vec();
        while body.len() < content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        Some(CapturedRequest {
            request_line,
            headers,
            body: String::from_utf8_lossy(&body).to_string(),
        })
    }

    fn status_text(status: u16) -> &'static str {
        match status {
            200 => "OK",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            500 => "Internal Server Error",
            _ => "Error",
        }
    }

    async fn write_http_response(
        stream: &mut tokio::net::TcpStream,
        status: u16,
        body: &str,
    ) -> std::io::Result<()> {
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            status_text(status),
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.flush().await
    }

    async fn start_mock_server(
        responses: Vec<MockResponse>,
    ) -> (
        String,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
        let scripted = Arc::new(TokioMutex::new(VecDeque::from(responses)));
        let captured_clone = Arc::clone(&captured);
        let scripted_clone = Arc::clone(&scripted);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let captured_inner = Arc::clone(&captured_clone);
                let scripted_inner = Arc::clone(&scripted_clone);
                tokio::spawn(async move {
                    let Some(request) = read_http_request(&mut stream).await else {
                        return;
                    };
                    captured_inner.lock().await.push(request);

                    let response = scripted_inner.lock().await.pop_front().unwrap_or(
                        MockResponse::json(500, json!({ "message": "unexpected request" })),
                    );
                    if response.delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
                    }
                    let _ = write_http_response(&mut stream, response.status, &response.body).await;
                });
            }
        });

        (format!("http://{}", addr), captured, handle)
    }

    fn client_for(base_url: &str) -> RemoteClient {
        RemoteClient::new(RemoteConfig::new(base_url)).expect("build client")
    }

    #[tokio::test]
    async fn request_posts_json_with_bearer_token() {
        let (base_url, captured, server) = start_mock_server(vec![MockResponse::json(
            200,
            json!([{ "status": "ok", "key": 1 }]),
        )])
        .await;
        let client = client_for(&base_url);

        let response = client
            .request(
                RemoteRequest::new("sync/push")
                    .payload(json!({ "store": "ADDCLIENT", "records": [] }))
                    .auth_token(Some("secret".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(response, json!([{ "status": "ok", "key": 1 }]));
        let requests = captured.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].request_line, "POST /sync/push HTTP/1.1");
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer secret")
        );
        let sent: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent["store"], json!("ADDCLIENT"));
        server.abort();
    }

    #[tokio::test]
    async fn raw_mode_returns_the_body_as_a_string() {
        let (base_url, _captured, server) =
            start_mock_server(vec![MockResponse::json(200, json!({ "logged": true }))]).await;
        let client = client_for(&base_url);

        let response = client
            .request(RemoteRequest::new("errors/log").raw())
            .await
            .unwrap();

        assert_eq!(response, Value::String(r#"{"logged":true}"#.to_string()));
        server.abort();
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse::json(
            401,
            json!({ "message": "token expired" }),
        )])
        .await;
        let client = client_for(&base_url);

        let result = client.request(RemoteRequest::new("sync/pull")).await;

        assert!(matches!(result, Err(Error::Auth(ref m)) if m == "token expired"));
        server.abort();
    }

    #[tokio::test]
    async fn server_failure_carries_the_server_message() {
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse::json(
            500,
            json!({ "code": "DB_DOWN", "msg": "database unavailable" }),
        )])
        .await;
        let client = client_for(&base_url);

        let result = client.request(RemoteRequest::new("sync/pull")).await;

        assert!(matches!(result, Err(Error::Server(ref m)) if m == "DB_DOWN: database unavailable"));
        server.abort();
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let (base_url, _captured, server) = start_mock_server(vec![
            MockResponse::json(200, json!({ "status": "no-data" })).delayed(1_000),
        ])
        .await;
        let client = client_for(&base_url);

        let result = client
            .request(RemoteRequest::new("sync/pull").timeout_ms(50))
            .await;

        assert!(matches!(result, Err(Error::Timeout(50))));
        server.abort();
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(&format!("http://{}", addr));

        let result = client.request(RemoteRequest::new("sync/pull")).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }
}
