//! Heuristic hallucination detection
//!
//! Flags responses that are not adequately supported by retrieved
//! evidence. Deliberately lexical and cheap: substring checks for hedging
//! and factual-claim phrasing, plus a word-overlap support score.

use mnemo_core::SourceTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

const DEFAULT_MIN_EVIDENCE_COUNT: usize = 2;
const DEFAULT_MIN_EVIDENCE_CONFIDENCE: f32 = 0.6;

/// Each flag reduces the confidence score by this much
const FLAG_PENALTY: f32 = 0.2;

const HEDGING_PATTERNS: [&str; 7] = [
    "i think",
    "probably",
    "maybe",
    "possibly",
    "i'm not sure",
    "i believe",
    "it seems",
];

/// Phrases that assert facts; suspicious when no strong evidence backs them
const FACTUAL_INDICATORS: [&str; 5] = [
    "according to",
    "research shows",
    "studies indicate",
    "it is known that",
    "the fact is",
];

/// A piece of retrieved evidence a response can be validated against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source: SourceTag,
    pub confidence: f32,
    pub content: String,
}

impl Evidence {
    pub fn new(source: SourceTag, confidence: f32, content: impl Into<String>) -> Self {
        Self {
            source,
            confidence,
            content: content.into(),
        }
    }
}

/// Verdict for one validated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallucinationReport {
    /// True when the confidence score fell below the caller's threshold
    pub is_hallucination: bool,

    /// Evidence-support score after flag penalties, in [0, 1]
    pub confidence_score: f32,

    /// Human-readable reasons the score was reduced
    pub flags: Vec<String>,

    /// The full evidence set the response was checked against
    pub supporting_evidence: Vec<Evidence>,
}

/// Validates responses against retrieved evidence
#[derive(Debug, Clone)]
pub struct HallucinationDetector {
    min_evidence_count: usize,
    min_evidence_confidence: f32,
    hedging_patterns: BTreeSet<String>,
}

impl Default for HallucinationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HallucinationDetector {
    pub fn new() -> Self {
        Self {
            min_evidence_count: DEFAULT_MIN_EVIDENCE_COUNT,
            min_evidence_confidence: DEFAULT_MIN_EVIDENCE_CONFIDENCE,
            hedging_patterns: HEDGING_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Add a phrase to the hedging lexicon (stored lowercased)
    pub fn add_hedging_pattern(&mut self, pattern: &str) {
        self.hedging_patterns.insert(pattern.to_lowercase());
    }

    /// How many strong evidence items a response needs before the
    /// insufficient-evidence flag is raised
    pub fn set_min_evidence_count(&mut self, count: usize) {
        self.min_evidence_count = count;
    }

    /// Confidence an evidence item needs to count as strong
    pub fn set_min_evidence_confidence(&mut self, confidence: f32) {
        self.min_evidence_confidence = confidence;
    }

    /// Validate a response against retrieved evidence
    ///
    /// Strong evidence is the subset meeting the confidence floor. Flags
    /// are raised for too little strong evidence, hedging language, and
    /// factual phrasing with no strong evidence behind it. The confidence
    /// score is the overlap-weighted support minus a fixed penalty per
    /// flag, clamped to [0, 1]; the verdict compares it against the
    /// caller's threshold.
    pub fn validate(
        &self,
        query: &str,
        response: &str,
        evidence: &[Evidence],
        confidence_threshold: f32,
    ) -> HallucinationReport {
        debug!(
            "Validating response against {} evidence items for query '{}'",
            evidence.len(),
            query
        );

        let strong: Vec<&Evidence> = evidence
            .iter()
            .filter(|item| item.confidence >= self.min_evidence_confidence)
            .collect();

        let response_lower = response.to_lowercase();
        let mut flags = Vec::new();

        if strong.len() < self.min_evidence_count {
            flags.push(format!(
                "Insufficient evidence count ({} < {})",
                strong.len(),
                self.min_evidence_count
            ));
        }

        if self
            .hedging_patterns
            .iter()
            .any(|pattern| response_lower.contains(pattern.as_str()))
        {
            flags.push("Response contains hedging language".to_string());
        }

        if strong.is_empty()
            && FACTUAL_INDICATORS
                .iter()
                .any(|indicator| response_lower.contains(indicator))
        {
            flags.push("Response contains unsubstantiated claims".to_string());
        }

        let support = evidence_support(&response_lower, &strong);
        let confidence_score = (support - FLAG_PENALTY * flags.len() as f32).clamp(0.0, 1.0);

        HallucinationReport {
            is_hallucination: confidence_score < confidence_threshold,
            confidence_score,
            flags,
            supporting_evidence: evidence.to_vec(),
        }
    }
}

/// Average strong-evidence confidence weighted by word overlap with the
/// response; falls back to the plain average when nothing overlaps.
///
/// Overlap counts response words longer than 3 characters that appear in
/// the evidence content, over the total response word count.
fn evidence_support(response_lower: &str, strong: &[&Evidence]) -> f32 {
    if strong.is_empty() {
        return 0.0;
    }

    let response_words: Vec<&str> = response_lower.split_whitespace().collect();

    let mut total_score = 0.0f32;
    let mut total_weight = 0.0f32;

    for item in strong {
        let content_lower = item.content.to_lowercase();
        let content_words: BTreeSet<&str> = content_lower.split_whitespace().collect();

        let common = response_words
            .iter()
            .copied()
            .filter(|word| word.len() > 3 && content_words.contains(*word))
            .count();

        let overlap = if response_words.is_empty() {
            0.0
        } else {
            common as f32 / response_words.len() as f32
        };

        total_score += item.confidence * overlap;
        total_weight += overlap;
    }

    if total_weight == 0.0 {
        let sum: f32 = strong.iter().map(|item| item.confidence).sum();
        return sum / strong.len() as f32;
    }

    total_score / total_weight
}
