use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_CLASSIFIER_THRESHOLD: f64 = 0.5;

/// Process configuration loaded from environment variables.
/// Engine tuning (weights, vocabularies) lives in the optional `ANALYZER_CONFIG` file.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub analyzer_config: Option<PathBuf>,
    pub classifier_url: Option<String>,
    pub classifier_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            analyzer_config: None,
            classifier_url: None,
            classifier_threshold: DEFAULT_CLASSIFIER_THRESHOLD,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let classifier_threshold = parse_env("CLASSIFIER_THRESHOLD", DEFAULT_CLASSIFIER_THRESHOLD)?;
        anyhow::ensure!(
            (0.0..=1.0).contains(&classifier_threshold),
            "CLASSIFIER_THRESHOLD must lie in [0, 1], got {classifier_threshold}"
        );

        Ok(Config {
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            analyzer_config: optional_env("ANALYZER_CONFIG").map(PathBuf::from),
            classifier_url: optional_env("CLASSIFIER_URL"),
            classifier_threshold,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
