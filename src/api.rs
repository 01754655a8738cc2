use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::upload::SelectedFile;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Multipart field the backend reads the document from.
const UPLOAD_FIELD: &str = "file";
const CHAT_FALLBACK_DETAIL: &str = "Chat failed";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upload failed with status {0}")]
    Rejected(StatusCode),

    #[error("upload task ended unexpectedly: {0}")]
    Interrupted(String),
}

#[derive(Error, Debug)]
pub enum ChatError {
    /// Non-2xx reply. `detail` is the backend's `detail` field or the generic fallback.
    #[error("{detail}")]
    Server { status: StatusCode, detail: String },

    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid chat response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("chat task ended unexpectedly: {0}")]
    Interrupted(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// Fields the reference backend includes in a successful upload reply.
/// All optional, the client treats the body as opaque.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadReceipt {
    pub filename: Option<String>,
    pub chunks_added: Option<u64>,
    pub message: Option<String>,
}

impl UploadReceipt {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// The two calls the conversation and upload controls depend on.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn upload_document(&self, file: &SelectedFile) -> Result<Value, UploadError>;

    async fn chat(&self, query: &str) -> Result<ChatResponse, ChatError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn upload_document(&self, file: &SelectedFile) -> Result<Value, UploadError> {
        let url = format!("{}/upload", self.base_url);

        let bytes = tokio::fs::read(&file.path).await.map_err(|source| UploadError::Io {
            path: file.path.clone(),
            source,
        })?;
        tracing::debug!(file = %file.name, size = bytes.len(), "uploading document");

        let part = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.media_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(UploadError::Rejected(response.status()));
        }

        Ok(response.json().await?)
    }

    pub async fn chat(&self, query: &str) -> Result<ChatResponse, ChatError> {
        let url = format!("{}/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ChatError::Server {
                status,
                detail: error_detail(&body),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn health(&self) -> anyhow::Result<HealthStatus> {
        let url = format!("{}/", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Backend health check failed: {}", response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentBackend for ApiClient {
    async fn upload_document(&self, file: &SelectedFile) -> Result<Value, UploadError> {
        ApiClient::upload_document(self, file).await
    }

    async fn chat(&self, query: &str) -> Result<ChatResponse, ChatError> {
        ApiClient::chat(self, query).await
    }
}

/// `detail` from an error body, or the generic fallback when absent, empty or unparsable.
/// Structured details (validation errors) are kept as compact JSON.
fn error_detail(body: &[u8]) -> String {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .map(|d| match d {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        });

    detail
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| CHAT_FALLBACK_DETAIL.to_string())
}
