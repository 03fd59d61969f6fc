//! Client for the remote text-embedding inference service.
//!
//! The service replies with a two-dimensional numeric array on success, or
//! a JSON object carrying an `error` field. A reply reporting the backing
//! model is still loading is retried exactly once after a fixed delay;
//! every other failure is surfaced as a typed error for the provider to
//! absorb.

use std::time::Duration;

use serde_json::Value;

use crate::embedding::EMBEDDING_DIM;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding service disabled or no credentials")]
    Disabled,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("model is still loading")]
    ModelLoading,

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

pub struct RemoteEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_token: Option<String>,
    loading_retry_delay: Duration,
}

impl RemoteEmbedder {
    pub fn new(endpoint: &str, request_timeout: Duration, loading_retry_delay: Duration) -> Self {
        let api_token = std::env::var("HF_API_TOKEN").ok();
        if api_token.is_none() {
            log::warn!("HF_API_TOKEN is missing; every embedding will use the local fallback");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client with static options");

        Self {
            client,
            endpoint: endpoint.to_string(),
            api_token,
            loading_retry_delay,
        }
    }

    /// Fetch an embedding from the inference endpoint.
    ///
    /// Retries exactly once, after a fixed delay, when the service reports
    /// the backing model is still loading.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        match self.request(text) {
            Err(EmbedError::ModelLoading) => {
                log::info!(
                    "model loading, retrying once in {}ms",
                    self.loading_retry_delay.as_millis()
                );
                std::thread::sleep(self.loading_retry_delay);
                self.request(text)
            }
            other => other,
        }
    }

    fn request(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let token = self.api_token.as_deref().ok_or(EmbedError::Disabled)?;

        let body = serde_json::json!({
            "inputs": text,
            "options": { "wait_for_model": true },
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .map_err(|e| EmbedError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EmbedError::Status(status.as_u16()));
        }

        let value: Value = resp.json().map_err(|e| EmbedError::Transport(e.to_string()))?;
        parse_embedding_response(&value)
    }
}

/// Extract the first row of a two-dimensional numeric array.
///
/// Anything that is not a matrix with a 384-wide finite first row is
/// rejected; a reply whose `error` field mentions "loading" becomes
/// [`EmbedError::ModelLoading`] so the caller can retry.
pub fn parse_embedding_response(value: &Value) -> Result<Vec<f32>, EmbedError> {
    if let Some(row) = value
        .as_array()
        .and_then(|rows| rows.first())
        .and_then(Value::as_array)
    {
        if row.len() != EMBEDDING_DIM {
            return Err(EmbedError::UnexpectedShape(format!(
                "first row has {} elements",
                row.len()
            )));
        }

        let mut out = Vec::with_capacity(EMBEDDING_DIM);
        for v in row {
            match v.as_f64() {
                Some(f) if f.is_finite() => out.push(f as f32),
                _ => return Err(EmbedError::UnexpectedShape("non-numeric element".into())),
            }
        }
        return Ok(out);
    }

    if let Some(err) = value.get("error").and_then(Value::as_str) {
        if err.contains("loading") {
            return Err(EmbedError::ModelLoading);
        }
        return Err(EmbedError::UnexpectedShape(format!("service error: {err}")));
    }

    let preview: String = value.to_string().chars().take(200).collect();
    Err(EmbedError::UnexpectedShape(preview))
}
