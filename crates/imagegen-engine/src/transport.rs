use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageGenerationPayload {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
    pub n: u32,
}

impl ImageGenerationPayload {
    pub fn for_prompt(prompt: impl Into<String>) -> Self {
        Self {
            model: IMAGE_MODEL.to_string(),
            prompt: prompt.into(),
            size: IMAGE_SIZE.to_string(),
            quality: IMAGE_QUALITY.to_string(),
            n: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Timeout, connection failure or an unreadable body.
    Request(String),
    Status { code: u16, body: String },
    MalformedBody(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request(msg) => write!(f, "request failed: {}", msg),
            TransportError::Status { code, body } => write!(f, "API error {}: {}", code, body),
            TransportError::MalformedBody(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// The two provider calls a live generator makes.
pub trait ImageTransport {
    /// Submits one generation request and returns the hosted image URL.
    fn request_image(&self, payload: &ImageGenerationPayload) -> Result<String, TransportError>;
    fn download(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

pub struct OpenAiTransport {
    api_base: String,
    api_key: String,
    http: HttpClient,
    generation_timeout: Duration,
    download_timeout: Duration,
}

impl OpenAiTransport {
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Self {
        Self::with_client(api_key, api_base, HttpClient::new())
    }

    pub fn with_client(api_key: impl Into<String>, api_base: &str, http: HttpClient) -> Self {
        Self {
            api_base: normalize_api_base(api_base),
            api_key: api_key.into(),
            http,
            generation_timeout: GENERATION_TIMEOUT,
            download_timeout: DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, generation: Duration, download: Duration) -> Self {
        self.generation_timeout = generation;
        self.download_timeout = download;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn generations_endpoint(&self) -> String {
        format!("{}/images/generations", self.api_base)
    }
}

impl ImageTransport for OpenAiTransport {
    fn request_image(&self, payload: &ImageGenerationPayload) -> Result<String, TransportError> {
        let endpoint = self.generations_endpoint();
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(payload)
            .timeout(self.generation_timeout)
            .send()
            .map_err(|err| TransportError::Request(format!("{endpoint}: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| TransportError::Request(format!("reading response body: {err}")))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                body: truncate_text(&body, 512),
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|err| TransportError::MalformedBody(format!("invalid JSON: {err}")))?;
        extract_image_url(&parsed)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .map_err(|err| TransportError::Request(format!("{url}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                code: status.as_u16(),
                body: truncate_text(&body, 512),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|err| TransportError::Request(format!("reading image bytes: {err}")))?;
        Ok(bytes.to_vec())
    }
}

pub fn normalize_api_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_BASE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn extract_image_url(payload: &Value) -> Result<String, TransportError> {
    payload
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .and_then(|row| row.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TransportError::MalformedBody("missing data[0].url".to_string()))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
