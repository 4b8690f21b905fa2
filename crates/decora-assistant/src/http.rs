//! HTTP implementation of the assistant backend.
//!
//! Talks to the Decora assistant service: JSON POST for chat turns,
//! multipart POST for attachment analysis. Timeout and retry policy live
//! here (in the reqwest client), not in the session core.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    AnalysisResponse, AttachmentUpload, Backend, BackendError, ChatTurnRequest, ChatTurnResponse,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8790";
const CHAT_PATH: &str = "/api/assistant/chat";
const ANALYZE_PATH: &str = "/api/assistant/analyze";

/// Backend client configuration.
#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub connect_timeout: std::time::Duration,
    pub request_timeout: std::time::Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
            bearer_token: None,
            connect_timeout: std::time::Duration::from_secs(10),
            request_timeout: std::time::Duration::from_secs(120),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// HTTP assistant backend client.
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { config, http }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder = self.http.post(url);
        if let Some(ref token) = self.config.bearer_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
    }

    fn transport_error(err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Network(err.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!("HTTP {status}: {text}")));
        }
        Ok(response)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse, BackendError> {
        debug!(history = request.history.len(), "assistant chat request");

        let response = self
            .request(CHAT_PATH)
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn analyze(&self, upload: AttachmentUpload) -> Result<AnalysisResponse, BackendError> {
        debug!(
            file = %upload.file_name,
            size = upload.bytes.len(),
            "attachment analysis request"
        );

        let mime = mime_for(&upload.file_name);
        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(mime)
            .map_err(|e| BackendError::Api(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .request(ANALYZE_PATH)
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}
