use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::scoring::ScoreBreakdown;
use crate::analysis::signals::WeakPhraseHit;
use crate::analysis::{Analysis, AnalysisRequest};
use crate::annotation::highlighter::HighlightSpan;
use crate::annotation::rules::HighlightRule;
use crate::errors::AppError;
use crate::ingest::extract_text;
use crate::state::AppState;
use crate::suggestions::classifier::{classify_suggestions, ClassifiedSuggestion};

const MISSING_RESUME: &str = "No resume text or file provided";

#[derive(Debug, Serialize)]
pub struct AnalyseResponse {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub scores: ScoreBreakdown,
    pub suggestions: Vec<ClassifiedSuggestion>,
    pub weak_phrases: Vec<WeakPhraseHit>,
    pub highlight_rules: Vec<HighlightRule>,
    pub highlights: Vec<HighlightSpan>,
}

/// POST /api/v1/analyse
pub async fn handle_analyse(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalyseResponse>, AppError> {
    let response = run_analysis(&state, req, None).await?;
    Ok(Json(response))
}

/// POST /api/v1/analyse/upload
///
/// Multipart fields: `resume_file` (.pdf/.txt) or `resume_text`, plus optional
/// `jd_text`, `required_skills` (comma-separated) and `include_diagnostics`.
/// An uploaded file takes precedence over `resume_text`.
pub async fn handle_analyse_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyseResponse>, AppError> {
    let max_bytes = state.config.max_upload_bytes;
    let mut upload: Option<(String, Bytes)> = None;
    let mut req = AnalysisRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume_file" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                let Some(file_name) = file_name.filter(|n| !n.trim().is_empty()) else {
                    continue;
                };
                if data.len() > max_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "{file_name} is {} bytes; the limit is {max_bytes}",
                        data.len()
                    )));
                }
                upload = Some((file_name, data));
            }
            "resume_text" => req.resume_text = field.text().await.map_err(multipart_error)?,
            "jd_text" => req.jd_text = Some(field.text().await.map_err(multipart_error)?),
            "required_skills" => {
                let raw = field.text().await.map_err(multipart_error)?;
                req.required_skills = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "include_diagnostics" => {
                req.include_diagnostics = parse_flag(&field.text().await.map_err(multipart_error)?);
            }
            other => debug!("Ignoring unknown multipart field '{other}'"),
        }
    }

    let source_file = match upload {
        Some((file_name, data)) => {
            let name = file_name.clone();
            req.resume_text = tokio::task::spawn_blocking(move || extract_text(&name, &data))
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}"))
                })??;
            Some(file_name)
        }
        None => None,
    };

    let response = run_analysis(&state, req, source_file).await?;
    Ok(Json(response))
}

async fn run_analysis(
    state: &AppState,
    req: AnalysisRequest,
    source_file: Option<String>,
) -> Result<AnalyseResponse, AppError> {
    if req.resume_text.trim().is_empty() {
        return Err(AppError::Validation(MISSING_RESUME.to_string()));
    }

    let analyzer = Arc::clone(&state.analyzer);
    let Analysis {
        scores,
        suggestions,
        weak_phrases,
        highlight_rules,
        highlights,
    } = tokio::task::spawn_blocking(move || analyzer.analyse(&req))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in analysis: {e}")))??;

    let suggestions = classify_suggestions(
        state.classifier.as_deref(),
        suggestions,
        state.config.classifier_threshold,
    )
    .await;

    let analysis_id = Uuid::new_v4();
    info!(
        %analysis_id,
        final_score = scores.final_score,
        source = source_file.as_deref().unwrap_or("text"),
        "Analysed resume"
    );

    Ok(AnalyseResponse {
        analysis_id,
        analyzed_at: Utc::now(),
        source_file,
        scores,
        suggestions,
        weak_phrases,
        highlight_rules,
        highlights,
    })
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
