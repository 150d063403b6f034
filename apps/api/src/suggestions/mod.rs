// Suggestions: threshold-driven advice strings, optionally categorized by an
// external classifier service.

pub mod classifier;
pub mod generator;
