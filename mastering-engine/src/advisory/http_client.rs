//! HTTP oracle client
//!
//! POSTs `{model, prompt, temperature}` as JSON and reads the reply text from
//! whichever of the common completion response shapes the service uses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mastering_common::config::OracleEndpoint;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{AdvisoryError, AdvisoryOracle};

const USER_AGENT: &str = concat!("mastering-engine/", env!("CARGO_PKG_VERSION"));

/// Minimum spacing between requests to one endpoint
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Oracle rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f64,
}

/// Oracle reached over HTTP
pub struct HttpOracle {
    name: String,
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpOracle {
    pub fn from_endpoint(name: impl Into<String>, config: &OracleEndpoint) -> Result<Self, AdvisoryError> {
        let name = name.into();
        if config.endpoint.trim().is_empty() {
            return Err(AdvisoryError::NotConfigured(format!("{name}: empty endpoint")));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisoryError::Network(e.to_string()))?;

        Ok(Self {
            name,
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(config.min_interval_ms)),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AdvisoryOracle for HttpOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, prompt: &str) -> Result<String, AdvisoryError> {
        self.rate_limiter.wait().await;

        tracing::debug!(
            oracle = %self.name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Querying advisory oracle"
        );

        let body = CompletionRequest {
            model: &self.model,
            prompt,
            temperature: 0.0,
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Api(status.as_u16(), error_text));
        }

        let text = response.text().await.map_err(map_reqwest_error)?;
        let reply = match serde_json::from_str::<Value>(&text) {
            Ok(json) => reply_text(&json).unwrap_or(text),
            Err(_) => text,
        };

        tracing::debug!(oracle = %self.name, reply_chars = reply.len(), "Oracle replied");
        Ok(reply)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AdvisoryError {
    if e.is_timeout() {
        AdvisoryError::Timeout
    } else {
        AdvisoryError::Network(e.to_string())
    }
}

/// Pull the generated text out of a completion-style response body
///
/// Returns `None` when the body has none of the known shapes, in which case
/// the body itself is handed to the decision parser.
fn reply_text(body: &Value) -> Option<String> {
    let candidates = [
        body.get("text"),
        body.get("output"),
        body.get("response"),
        body.pointer("/choices/0/message/content"),
        body.pointer("/choices/0/text"),
        body.pointer("/content/0/text"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
}
