//! Suggestion classifier — optional, pluggable categorization of advice strings.
//!
//! `AppState` holds an `Option<Arc<dyn SuggestionClassifier>>`; the HTTP-backed
//! implementation is wired at startup when `CLASSIFIER_URL` is set. Failures never
//! fail an analysis: suggestions are returned unclassified instead.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-category probability for one text.
pub type CategoryScores = BTreeMap<String, f64>;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Classifier returned {got} predictions for {expected} texts")]
    LengthMismatch { expected: usize, got: usize },
}

#[async_trait]
pub trait SuggestionClassifier: Send + Sync {
    /// One score map per input text, in input order.
    async fn predict(&self, texts: &[String]) -> Result<Vec<CategoryScores>, ClassifierError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// A suggestion plus, when a classifier ran, its categories and scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSuggestion {
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: CategoryScores,
}

impl ClassifiedSuggestion {
    pub fn unclassified(suggestion: String) -> Self {
        Self {
            suggestion,
            categories: Vec::new(),
            scores: CategoryScores::new(),
        }
    }
}

/// Labels whose probability reaches `threshold`, in label order.
pub fn labels_above(scores: &CategoryScores, threshold: f64) -> Vec<String> {
    scores
        .iter()
        .filter(|(_, p)| **p >= threshold)
        .map(|(label, _)| label.clone())
        .collect()
}

/// Classifies suggestions when a classifier is available. Any classifier failure
/// degrades to unclassified suggestions.
pub async fn classify_suggestions(
    classifier: Option<&dyn SuggestionClassifier>,
    suggestions: Vec<String>,
    threshold: f64,
) -> Vec<ClassifiedSuggestion> {
    let Some(classifier) = classifier else {
        return suggestions
            .into_iter()
            .map(ClassifiedSuggestion::unclassified)
            .collect();
    };
    if suggestions.is_empty() {
        return Vec::new();
    }

    let predictions = match classifier.predict(&suggestions).await {
        Ok(p) if p.len() == suggestions.len() => p,
        Ok(p) => {
            warn!(
                "{}; returning unclassified suggestions",
                ClassifierError::LengthMismatch {
                    expected: suggestions.len(),
                    got: p.len(),
                }
            );
            return suggestions
                .into_iter()
                .map(ClassifiedSuggestion::unclassified)
                .collect();
        }
        Err(e) => {
            warn!("Suggestion classifier failed: {e}; returning unclassified suggestions");
            return suggestions
                .into_iter()
                .map(ClassifiedSuggestion::unclassified)
                .collect();
        }
    };

    suggestions
        .into_iter()
        .zip(predictions)
        .map(|(suggestion, scores)| ClassifiedSuggestion {
            categories: labels_above(&scores, threshold),
            suggestion,
            scores,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP-backed classifier
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<CategoryScores>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Calls a remote model service: `POST {url}` with `{"texts": [...]}`, expecting
/// `{"predictions": [{label: probability, ...}, ...]}`.
/// Retries on 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct HttpSuggestionClassifier {
    client: Client,
    url: String,
}

impl HttpSuggestionClassifier {
    pub fn new(url: String) -> Result<Self, ClassifierError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SuggestionClassifier for HttpSuggestionClassifier {
    async fn predict(&self, texts: &[String]) -> Result<Vec<CategoryScores>, ClassifierError> {
        let request_body = PredictRequest { texts };
        let mut last_error: Option<ClassifierError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 200ms, 400ms
                let delay = Duration::from_millis(200 * (1 << (attempt - 1)));
                warn!(
                    "Classifier attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&self.url).json(&request_body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ClassifierError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(ClassifierError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(ClassifierError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let parsed: PredictResponse = serde_json::from_str(&body)?;
            if parsed.predictions.len() != texts.len() {
                return Err(ClassifierError::LengthMismatch {
                    expected: texts.len(),
                    got: parsed.predictions.len(),
                });
            }

            debug!("Classified {} suggestions", texts.len());
            return Ok(parsed.predictions);
        }

        Err(last_error.unwrap_or(ClassifierError::Api {
            status: 503,
            message: format!("no response after {MAX_RETRIES} attempts"),
        }))
    }
}
