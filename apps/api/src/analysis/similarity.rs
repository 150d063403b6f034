//! Keyword similarity: bounded [0, 1] relevance between résumé and job description.
//!
//! Builds joint TF-IDF vectors (unigrams + bigrams, English stop words removed,
//! vocabulary capped) and returns their cosine. When vectorization is not
//! possible the score falls back to token-set overlap.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::analysis::config::SimilarityConfig;
use crate::analysis::normalizer::normalize;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "done",
    "down", "due", "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even",
    "ever", "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "having", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just", "last",
    "latter", "least", "less", "many", "may", "me", "meanwhile", "might", "more", "moreover",
    "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please",
    "rather", "same", "seem", "seemed", "seeming", "seems", "several", "she", "should", "since",
    "so", "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere",
    "still", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these",
    "they", "this", "those", "though", "through", "throughout", "thru", "thus", "to", "together",
    "too", "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
    "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
    "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
    "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

#[derive(Debug, Error, PartialEq)]
pub enum VectorizeError {
    #[error("empty vocabulary: documents contain only stop words or no tokens")]
    EmptyVocabulary,

    #[error("no documents to vectorize")]
    NoDocuments,
}

/// Sparse, l2-normalized term vector keyed by vocabulary index.
type TermVector = BTreeMap<usize, f64>;

/// Joint TF-IDF vectorizer. State lives only for one `fit_transform` call.
struct TermVectorizer {
    max_features: usize,
}

impl TermVectorizer {
    fn terms(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !STOP_SET.contains(t))
            .collect();

        let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
        terms
    }

    fn fit_transform(&self, documents: &[&str]) -> Result<Vec<TermVector>, VectorizeError> {
        if documents.is_empty() {
            return Err(VectorizeError::NoDocuments);
        }

        let counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|doc| {
                let mut tf = HashMap::new();
                for term in Self::terms(doc) {
                    *tf.entry(term).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        let mut corpus: HashMap<&str, (usize, usize)> = HashMap::new(); // term -> (total count, doc freq)
        for tf in &counts {
            for (term, n) in tf {
                let entry = corpus.entry(term.as_str()).or_insert((0, 0));
                entry.0 += n;
                entry.1 += 1;
            }
        }
        if corpus.is_empty() {
            return Err(VectorizeError::EmptyVocabulary);
        }

        // Keep the most frequent terms; ties broken alphabetically for determinism.
        let mut ranked: Vec<(&str, usize, usize)> =
            corpus.into_iter().map(|(t, (total, df))| (t, total, df)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features.max(1));
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let n_docs = documents.len() as f64;
        let vocabulary: Vec<(&str, f64)> = ranked
            .iter()
            .map(|(term, _, df)| (*term, ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0))
            .collect();

        Ok(counts
            .iter()
            .map(|tf| {
                let mut vector: TermVector = vocabulary
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, (term, idf))| {
                        tf.get(*term).map(|&count| (idx, count as f64 * idf))
                    })
                    .collect();
                let norm = vector.values().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    vector.values_mut().for_each(|v| *v /= norm);
                }
                vector
            })
            .collect())
    }
}

/// Dot product of two l2-normalized vectors; zero if either is empty.
fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    a.iter()
        .filter_map(|(idx, x)| b.get(idx).map(|y| x * y))
        .sum()
}

/// |résumé tokens ∩ JD tokens| / |JD tokens| over lower-cased whitespace tokens.
pub fn token_overlap(resume: &str, jd: &str) -> f64 {
    let resume_tokens: HashSet<String> = resume.split_whitespace().map(str::to_lowercase).collect();
    let jd_tokens: HashSet<String> = jd.split_whitespace().map(str::to_lowercase).collect();
    if jd_tokens.is_empty() {
        return 0.0;
    }
    resume_tokens.intersection(&jd_tokens).count() as f64 / jd_tokens.len() as f64
}

pub struct SimilarityScorer {
    config: SimilarityConfig,
}

impl SimilarityScorer {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    /// Relevance of the résumé to the job description in [0, 1]. Never fails.
    pub fn keyword_match_score(&self, resume: &str, jd: &str) -> f64 {
        let resume = normalize(resume);
        let jd = normalize(jd);

        if jd.is_empty() || jd.word_count() < self.config.min_jd_words || resume.is_empty() {
            return 0.0;
        }

        let vectorizer = TermVectorizer {
            max_features: self.config.max_features,
        };
        match vectorizer.fit_transform(&[resume.as_str(), jd.as_str()]) {
            Ok(vectors) => cosine(&vectors[0], &vectors[1]).clamp(0.0, 1.0),
            Err(e) => {
                debug!("Vectorization failed ({e}); using token overlap");
                token_overlap(&resume, &jd).clamp(0.0, 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SimilarityScorer {
        SimilarityScorer::new(SimilarityConfig::default())
    }

    const JD: &str = "Senior Rust engineer building distributed systems and Kubernetes infrastructure";

    #[test]
    fn test_short_jd_scores_zero() {
        assert_eq!(scorer().keyword_match_score("Rust engineer", "Rust engineer wanted now"), 0.0);
        assert_eq!(scorer().keyword_match_score("Rust engineer", ""), 0.0);
    }

    #[test]
    fn test_empty_resume_scores_zero() {
        assert_eq!(scorer().keyword_match_score("   ", JD), 0.0);
    }

    #[test]
    fn test_identical_texts_score_one() {
        let score = scorer().keyword_match_score(JD, JD);
        assert!((score - 1.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_disjoint_texts_score_zero() {
        let score = scorer().keyword_match_score("Pastry chef baking croissants", JD);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_partial_overlap_is_between_bounds() {
        let score = scorer().keyword_match_score("Rust engineer who likes gardening", JD);
        assert!(score > 0.0 && score < 1.0, "score was {score}");
    }

    #[test]
    fn test_casing_does_not_change_score() {
        let a = scorer().keyword_match_score("rust DISTRIBUTED systems", JD);
        let b = scorer().keyword_match_score("Rust distributed Systems", &JD.to_uppercase());
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_stop_word_only_documents_fall_back_to_overlap() {
        // No vocabulary survives, so the overlap ratio is used: "the" is 1 of 5 JD tokens.
        let score = scorer().keyword_match_score("a an the", "and the of to is");
        assert!((score - 0.2).abs() < 1e-12, "score was {score}");
    }

    #[test]
    fn test_vocabulary_cap_still_bounded() {
        let capped = SimilarityScorer::new(SimilarityConfig {
            max_features: 2,
            min_jd_words: 5,
        });
        let score = capped.keyword_match_score("Rust engineer building systems", JD);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_empty_vocabulary_error() {
        let v = TermVectorizer { max_features: 10 };
        assert_eq!(v.fit_transform(&["the", "of"]), Err(VectorizeError::EmptyVocabulary));
    }

    #[test]
    fn test_terms_include_bigrams_after_stop_words() {
        let terms = TermVectorizer::terms("Built the data pipeline");
        assert!(terms.contains(&"built".to_string()));
        assert!(terms.contains(&"built data".to_string()));
        assert!(terms.contains(&"data pipeline".to_string()));
        assert!(!terms.contains(&"the".to_string()));
    }
}
