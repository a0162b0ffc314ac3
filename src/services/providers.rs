// Inference Provider Service
// Hosted text-classification endpoints (Hugging Face Inference API shape) for
// valence and entailment models.

use crate::models::{LabelScore, VendorOutput};
use crate::services::config_store::{ConfigStore, EntailmentLabelScheme, ProviderConfig};
use crate::services::detection::classifiers::{EntailmentClassifier, ValenceClassifier};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

pub const INFERENCE_DEFAULT_URL: &str = "https://api-inference.huggingface.co/models";
pub const VALENCE_DEFAULT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const ENTAILMENT_DEFAULT_MODEL: &str = "roberta-large-mnli";

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_ATTEMPTS: usize = 3; // initial + retries
const BACKOFF_STEP_MS: u64 = 400;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Transient failures worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::HttpError(_) | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Response shapes returned by text-classification endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrediction {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Single(LabelScore),
}

impl From<RawPrediction> for VendorOutput {
    fn from(raw: RawPrediction) -> Self {
        match raw {
            RawPrediction::Nested(batches) => {
                VendorOutput::Distribution(batches.into_iter().next().unwrap_or_default())
            }
            RawPrediction::Flat(items) => VendorOutput::Distribution(items),
            RawPrediction::Single(item) => VendorOutput::Best(item),
        }
    }
}

/// Parse a classification response body into the vendor output union.
pub fn parse_prediction(body: &str) -> Result<VendorOutput, ProviderError> {
    serde_json::from_str::<RawPrediction>(body)
        .map(VendorOutput::from)
        .map_err(|e| ProviderError::JsonError(e.to_string()))
}

/// `base/model`, or `base` alone when no model is given (self-hosted endpoints).
pub fn endpoint_url(base_url: &str, model: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let model = model.trim_matches('/');
    if model.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, model)
    }
}

pub struct ProviderClient {
    client: Client,
    timeout: Duration,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        let timeout = Duration::from_secs(REQUEST_TIMEOUT_SECS);
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                // Per-request tokio timeout in `classify` still applies.
                warn!("[PROVIDER] client builder failed, using default client: {}", e);
                Client::default()
            }
        };
        Self { client, timeout }
    }

    async fn post_once(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<VendorOutput, ProviderError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_prediction(&text)
    }

    /// POST a classification request, retrying transient failures with linear backoff.
    pub async fn classify(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<VendorOutput, ProviderError> {
        let mut last_err: Option<ProviderError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let started = Instant::now();
            let res = tokio::time::timeout(self.timeout, self.post_once(url, api_key, body)).await;

            let err = match res {
                Ok(Ok(output)) => {
                    info!(
                        "[PROVIDER] ok url={} attempt={} latency_ms={}",
                        url,
                        attempt,
                        started.elapsed().as_millis()
                    );
                    return Ok(output);
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(self.timeout.as_secs()),
            };

            warn!("[PROVIDER] error url={} attempt={} : {}", url, attempt, err);
            if !err.is_retryable() {
                return Err(err);
            }
            last_err = Some(err);

            if attempt < MAX_ATTEMPTS {
                let backoff_ms = BACKOFF_STEP_MS * attempt as u64;
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Unavailable(url.to_string())))
    }
}

// ============ Remote Classifiers ============

pub struct HttpValenceClassifier {
    client: Arc<ProviderClient>,
    url: String,
    api_key: Option<String>,
}

impl HttpValenceClassifier {
    pub fn new(client: Arc<ProviderClient>, url: String, api_key: Option<String>) -> Self {
        Self { client, url, api_key }
    }

    pub fn from_config(client: Arc<ProviderClient>, config: &ProviderConfig, api_key: Option<String>) -> Self {
        let base = config.base_url.as_deref().unwrap_or(INFERENCE_DEFAULT_URL);
        let model = config.model.as_deref().unwrap_or(VALENCE_DEFAULT_MODEL);
        Self::new(client, endpoint_url(base, model), api_key)
    }
}

#[async_trait]
impl ValenceClassifier for HttpValenceClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ProviderError> {
        let body = serde_json::json!({
            "inputs": text,
            "options": { "wait_for_model": true }
        });
        match self.client.classify(&self.url, self.api_key.as_deref(), &body).await? {
            VendorOutput::Distribution(items) => Ok(items),
            VendorOutput::Best(item) => Ok(vec![item]),
        }
    }

    fn name(&self) -> &str {
        &self.url
    }
}

pub struct HttpEntailmentClassifier {
    client: Arc<ProviderClient>,
    url: String,
    api_key: Option<String>,
    scheme: EntailmentLabelScheme,
}

impl HttpEntailmentClassifier {
    pub fn new(
        client: Arc<ProviderClient>,
        url: String,
        api_key: Option<String>,
        scheme: EntailmentLabelScheme,
    ) -> Self {
        Self { client, url, api_key, scheme }
    }

    pub fn from_config(client: Arc<ProviderClient>, config: &ProviderConfig, api_key: Option<String>) -> Self {
        let base = config.base_url.as_deref().unwrap_or(INFERENCE_DEFAULT_URL);
        let model = config.model.as_deref().unwrap_or(ENTAILMENT_DEFAULT_MODEL);
        Self::new(client, endpoint_url(base, model), api_key, config.label_scheme)
    }
}

#[async_trait]
impl EntailmentClassifier for HttpEntailmentClassifier {
    async fn classify(&self, premise: &str, hypothesis: &str) -> Result<VendorOutput, ProviderError> {
        let body = serde_json::json!({
            "inputs": { "text": premise, "text_pair": hypothesis },
            "options": { "wait_for_model": true }
        });
        self.client.classify(&self.url, self.api_key.as_deref(), &body).await
    }

    fn name(&self) -> &str {
        &self.url
    }

    fn label_scheme(&self) -> EntailmentLabelScheme {
        self.scheme
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    let specific = format!("REVIEWSENSE_{}_API_KEY", provider.to_uppercase());
    let env_keys = [specific.as_str(), "REVIEWSENSE_API_KEY", "HF_API_TOKEN", "HUGGINGFACEHUB_API_TOKEN"];

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    let store = ConfigStore::new(ConfigStore::default_config_dir()?);
    match store.get_api_key(provider) {
        Ok(Some(key)) => Some(key),
        _ => store.get_api_key("huggingface").ok().flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("https://api-inference.huggingface.co/models/", "roberta-large-mnli"),
            "https://api-inference.huggingface.co/models/roberta-large-mnli"
        );
        assert_eq!(endpoint_url("http://localhost:8080/predict", ""), "http://localhost:8080/predict");
    }

    #[test]
    fn test_parse_nested_prediction() {
        let body = r#"[[{"label":"positive","score":0.9},{"label":"neutral","score":0.07},{"label":"negative","score":0.03}]]"#;
        match parse_prediction(body).unwrap() {
            VendorOutput::Distribution(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0].label, "positive");
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_parse_flat_and_single_prediction() {
        let flat = parse_prediction(r#"[{"label":"LABEL_0","score":0.8}]"#).unwrap();
        assert!(matches!(flat, VendorOutput::Distribution(ref v) if v.len() == 1));

        let single = parse_prediction(r#"{"label":"CONTRADICTION","score":0.71}"#).unwrap();
        assert_eq!(single, VendorOutput::Best(LabelScore::new("CONTRADICTION", 0.71)));
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_prediction(r#"{"error":"Model is loading"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::JsonError(_)));
    }

    #[test]
    fn test_retryable_statuses() {
        let rate_limited = ProviderError::ApiError { status: 429, message: String::new() };
        let bad_request = ProviderError::ApiError { status: 400, message: String::new() };
        assert!(rate_limited.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(ProviderError::Timeout(60).is_retryable());
        assert!(!ProviderError::MissingApiKey.is_retryable());
    }

    /// Drain one HTTP request (headers plus `Content-Length` body).
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            data.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    /// Local server answering every connection with `status_line`; returns its URL and a hit counter.
    async fn fixed_status_server(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let body = r#"{"error":"fixed response"}"#;
                    let response = format!(
                        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn body() -> serde_json::Value {
        serde_json::json!({ "inputs": "great camera" })
    }

    #[tokio::test]
    async fn test_classify_unreachable_exhausts_retries() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/model", port);

        let started = Instant::now();
        let err = ProviderClient::new().classify(&url, None, &body()).await.unwrap_err();
        assert!(matches!(err, ProviderError::HttpError(_)), "unexpected error: {:?}", err);
        // Backoff of 400ms + 800ms between the three attempts.
        assert!(started.elapsed() >= Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn test_classify_bad_request_fails_after_one_attempt() {
        let (url, hits) = fixed_status_server("HTTP/1.1 400 Bad Request").await;
        let err = ProviderClient::new().classify(&url, Some("key"), &body()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 400, .. }), "unexpected error: {:?}", err);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_classify_server_error_uses_all_attempts() {
        let (url, hits) = fixed_status_server("HTTP/1.1 503 Service Unavailable").await;
        let err = ProviderClient::new().classify(&url, None, &body()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 503, .. }), "unexpected error: {:?}", err);
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[test]
    fn test_from_config_defaults() {
        let client = Arc::new(ProviderClient::new());
        let config = ProviderConfig {
            label_scheme: EntailmentLabelScheme::CrossEncoder,
            ..ProviderConfig::default()
        };
        let nli = HttpEntailmentClassifier::from_config(client, &config, None);
        assert!(nli.url.ends_with(ENTAILMENT_DEFAULT_MODEL));
        assert_eq!(nli.label_scheme(), EntailmentLabelScheme::CrossEncoder);
    }
}
