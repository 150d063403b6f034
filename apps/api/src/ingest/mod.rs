// Ingest: turns uploaded résumé files into raw text for the analysis engine.

pub mod extract;

pub use extract::{extract_text, DocumentFormat, ExtractError};
