//! Inference gateway: the single point of entry for complaint classification.
//!
//! `classify` is total. Every failure mode (unconfigured endpoint, transport
//! error, timeout, non-2xx status, malformed or incomplete payload) resolves
//! to [`Prediction::fallback`] so intake keeps accepting complaints while the
//! prediction service is down.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const FALLBACK_CATEGORY: &str = "Other";
pub const FALLBACK_SENTIMENT: &str = "Neutral";
pub const FALLBACK_PRIORITY: &str = "Low";
pub const FALLBACK_CONFIDENCE: i32 = 50;
pub const FALLBACK_RESPONSE: &str = "Thank you for reaching out. We have received your \
    complaint and a member of our support team will review it shortly.";
pub const FALLBACK_EXPLANATION: &str =
    "Automatic classification was unavailable, so fallback values were used.";

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference endpoint is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference service returned status {0}")]
    Status(u16),

    #[error("inference payload is missing `{0}`")]
    MissingField(&'static str),
}

/// Classification result attached to every stored complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: String,
    pub sentiment: String,
    pub priority: String,
    pub ai_response: String,
    pub confidence_score: i32,
    pub explanation: String,
}

impl Prediction {
    pub fn fallback() -> Self {
        Self {
            category: FALLBACK_CATEGORY.to_string(),
            sentiment: FALLBACK_SENTIMENT.to_string(),
            priority: FALLBACK_PRIORITY.to_string(),
            ai_response: FALLBACK_RESPONSE.to_string(),
            confidence_score: FALLBACK_CONFIDENCE,
            explanation: FALLBACK_EXPLANATION.to_string(),
        }
    }
}

/// Anything that can classify complaint text. Carried in `AppState` as
/// `Arc<dyn Classifier>`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, complaint_text: &str) -> Prediction;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    complaint_text: &'a str,
}

/// Upstream payload. Every field is optional here so that shape problems
/// surface as `MissingField` rather than an opaque decode error.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    category: Option<String>,
    sentiment: Option<String>,
    priority: Option<String>,
    ai_response: Option<String>,
    confidence_score: Option<f64>,
    explanation: Option<String>,
}

impl PredictResponse {
    fn into_prediction(self) -> Result<Prediction, InferenceError> {
        Ok(Prediction {
            category: required(self.category, "category")?,
            sentiment: required(self.sentiment, "sentiment")?,
            priority: required(self.priority, "priority")?,
            ai_response: required(self.ai_response, "ai_response")?,
            confidence_score: self.confidence_score.map(clamp_confidence).unwrap_or(0),
            explanation: self.explanation.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, InferenceError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(InferenceError::MissingField(field)),
    }
}

fn clamp_confidence(raw: f64) -> i32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as i32
}

/// HTTP client for the prediction service (`POST {base}/predict`).
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    predict_url: Option<String>,
}

impl InferenceClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build inference HTTP client")?;
        let predict_url = base_url.map(|base| format!("{}/predict", base.trim_end_matches('/')));
        Ok(Self {
            client,
            predict_url,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.predict_url.is_some()
    }

    /// Single attempt against the prediction endpoint. No retries.
    pub async fn try_classify(&self, complaint_text: &str) -> Result<Prediction, InferenceError> {
        let url = self
            .predict_url
            .as_deref()
            .ok_or(InferenceError::NotConfigured)?;

        let response = self
            .client
            .post(url)
            .json(&PredictRequest { complaint_text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }

        let payload: PredictResponse = response.json().await?;
        payload.into_prediction()
    }
}

#[async_trait]
impl Classifier for InferenceClient {
    async fn classify(&self, complaint_text: &str) -> Prediction {
        match self.try_classify(complaint_text).await {
            Ok(prediction) => {
                debug!(
                    "Inference succeeded: category={}, priority={}, confidence={}",
                    prediction.category, prediction.priority, prediction.confidence_score
                );
                prediction
            }
            Err(e) => {
                warn!("Inference failed, using fallback classification: {e}");
                Prediction::fallback()
            }
        }
    }
}
