// Annotation: severity-resolved highlight rules and the renderers that apply them.

pub mod highlighter;
pub mod rules;
