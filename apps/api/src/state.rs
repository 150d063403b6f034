use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::suggestions::classifier::SuggestionClassifier;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Built once at startup from `ANALYZER_CONFIG` (or defaults).
    pub analyzer: Arc<Analyzer>,
    /// Pluggable suggestion classifier. `None` unless `CLASSIFIER_URL` is set.
    pub classifier: Option<Arc<dyn SuggestionClassifier>>,
}
