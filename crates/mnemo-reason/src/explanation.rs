//! Structured reasoning traces
//!
//! Each pipeline stage contributes a [`ReasoningStep`] with its telemetry;
//! [`ExplanationBuilder`] assembles them into an [`Explanation`] with an
//! overall confidence and a one-paragraph summary, renderable as plain
//! text or JSON.

use crate::fusion::FusionWeights;
use mnemo_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline stage a reasoning step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    VectorSearch,
    EpisodicRetrieval,
    SemanticActivation,
    HybridFusion,
    HallucinationCheck,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::VectorSearch => "vector_search",
            StepKind::EpisodicRetrieval => "episodic_retrieval",
            StepKind::SemanticActivation => "semantic_activation",
            StepKind::HybridFusion => "hybrid_fusion",
            StepKind::HallucinationCheck => "hallucination_check",
        }
    }
}

/// One stage's contribution to the reasoning trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub stage: StepKind,
    pub description: String,
    pub details: BTreeMap<String, String>,
    pub confidence: f32,
}

impl ReasoningStep {
    fn new(stage: StepKind, description: impl Into<String>, confidence: f32) -> Self {
        Self {
            stage,
            description: description.into(),
            details: BTreeMap::new(),
            confidence,
        }
    }

    /// Telemetry for the vector search stage; confidence is the average
    /// similarity over the reported results
    pub fn vector_search(num_results: usize, avg_similarity: f32, top_results: &[String]) -> Self {
        let mut step = Self::new(
            StepKind::VectorSearch,
            "Vector similarity search",
            avg_similarity,
        );
        step.details
            .insert("num_results".to_string(), num_results.to_string());
        step.details
            .insert("avg_similarity".to_string(), format!("{avg_similarity:.6}"));
        if !top_results.is_empty() {
            let joined = top_results
                .iter()
                .take(3)
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            step.details.insert("top_results".to_string(), joined);
        }
        step
    }

    /// Telemetry for the episodic retrieval stage
    pub fn episodic_retrieval(
        num_episodes: usize,
        avg_relevance: f32,
        relevant_context: &[String],
    ) -> Self {
        let mut step = Self::new(
            StepKind::EpisodicRetrieval,
            "Retrieved conversation context",
            avg_relevance,
        );
        step.details
            .insert("num_episodes".to_string(), num_episodes.to_string());
        step.details
            .insert("avg_relevance".to_string(), format!("{avg_relevance:.6}"));
        if !relevant_context.is_empty() {
            let joined = relevant_context
                .iter()
                .take(2)
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            step.details.insert("relevant_context".to_string(), joined);
        }
        step
    }

    /// Telemetry for the spreading-activation stage; confidence is the top
    /// activation level
    pub fn semantic_activation(
        num_concepts: usize,
        activation_level: f32,
        activated_concepts: &[String],
    ) -> Self {
        let mut step = Self::new(
            StepKind::SemanticActivation,
            "Semantic concept spreading",
            activation_level,
        );
        step.details
            .insert("num_concepts".to_string(), num_concepts.to_string());
        step.details.insert(
            "activation_level".to_string(),
            format!("{activation_level:.6}"),
        );
        if !activated_concepts.is_empty() {
            let joined = activated_concepts
                .iter()
                .take(5)
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            step.details
                .insert("activated_concepts".to_string(), joined);
        }
        step
    }

    /// Telemetry for the fusion stage
    pub fn hybrid_fusion(weights: FusionWeights, final_score: f32) -> Self {
        let mut step = Self::new(
            StepKind::HybridFusion,
            "Combined evidence from multiple sources",
            final_score,
        );
        step.details
            .insert("vector_weight".to_string(), format!("{:.6}", weights.vector));
        step.details.insert(
            "episodic_weight".to_string(),
            format!("{:.6}", weights.episodic),
        );
        step.details.insert(
            "semantic_weight".to_string(),
            format!("{:.6}", weights.semantic),
        );
        step.details
            .insert("final_score".to_string(), format!("{final_score:.6}"));
        step
    }

    /// Telemetry for the validation stage. A failed check inverts the
    /// confidence so a confidently-failed response scores high here.
    pub fn hallucination_check(passed: bool, confidence: f32, flags: &[String]) -> Self {
        let description = if passed {
            "Response validated"
        } else {
            "Response flagged for review"
        };
        let step_confidence = if passed { confidence } else { 1.0 - confidence };

        let mut step = Self::new(StepKind::HallucinationCheck, description, step_confidence);
        step.details
            .insert("passed".to_string(), passed.to_string());
        step.details
            .insert("confidence".to_string(), format!("{confidence:.6}"));
        if !flags.is_empty() {
            step.details.insert("flags".to_string(), flags.join("; "));
        }
        step
    }
}

/// A complete reasoning trace for one answered query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub query: String,
    pub response: String,
    pub reasoning_trace: Vec<ReasoningStep>,
    pub overall_confidence: f32,
    pub summary: String,
}

/// Assembles explanations from per-stage reasoning steps
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationBuilder;

impl ExplanationBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Assemble an explanation from the accumulated trace
    ///
    /// Overall confidence is the arithmetic mean of step confidences; an
    /// empty trace yields zero.
    pub fn build(&self, query: &str, response: &str, steps: Vec<ReasoningStep>) -> Explanation {
        let overall_confidence = if steps.is_empty() {
            0.0
        } else {
            steps.iter().map(|s| s.confidence).sum::<f32>() / steps.len() as f32
        };
        let summary = summarize(&steps);

        Explanation {
            query: query.to_string(),
            response: response.to_string(),
            reasoning_trace: steps,
            overall_confidence,
            summary,
        }
    }
}

impl Explanation {
    /// Render as human-readable text with numbered steps and percentage
    /// confidences
    pub fn format_text(&self) -> String {
        let mut out = String::new();

        out.push_str("=== Query Explanation ===\n\n");
        out.push_str(&format!("Query: {}\n", self.query));
        out.push_str(&format!("Response: {}\n\n", self.response));
        out.push_str(&format!(
            "Overall Confidence: {:.2}%\n\n",
            self.overall_confidence * 100.0
        ));

        out.push_str("Reasoning Process:\n");
        for (i, step) in self.reasoning_trace.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} (confidence: {:.2}%)\n",
                i + 1,
                step.description,
                step.confidence * 100.0
            ));
            for (key, value) in &step.details {
                out.push_str(&format!("   - {key}: {value}\n"));
            }
            out.push('\n');
        }

        out.push_str(&format!("Summary: {}\n", self.summary));

        out
    }

    /// Render as JSON
    pub fn format_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

fn summarize(steps: &[ReasoningStep]) -> String {
    let mut sources = Vec::new();
    if steps.iter().any(|s| s.stage == StepKind::VectorSearch) {
        sources.push("vector search");
    }
    if steps.iter().any(|s| s.stage == StepKind::EpisodicRetrieval) {
        sources.push("conversation context");
    }
    if steps.iter().any(|s| s.stage == StepKind::SemanticActivation) {
        sources.push("semantic knowledge");
    }

    let mut summary = String::from("Response generated using ");
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            if i == sources.len() - 1 {
                summary.push_str(" and ");
            } else {
                summary.push_str(", ");
            }
        }
        summary.push_str(source);
    }
    summary.push('.');

    if let Some(check) = steps
        .iter()
        .find(|s| s.stage == StepKind::HallucinationCheck)
    {
        let passed = check
            .details
            .get("passed")
            .map(|v| v.as_str() == "true")
            .unwrap_or(true);
        if passed {
            summary.push_str(" Response validated against evidence.");
        } else {
            summary.push_str(" Response flagged for potential hallucination.");
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_vector_search_step_caps_examples() {
        let contents = strings(&["one", "two", "three", "four"]);
        let step = ReasoningStep::vector_search(4, 0.8, &contents);

        assert_eq!(step.stage, StepKind::VectorSearch);
        assert_eq!(step.confidence, 0.8);
        assert_eq!(step.details["num_results"], "4");
        assert_eq!(step.details["top_results"], "one; two; three");
    }

    #[test]
    fn test_semantic_step_joins_with_commas() {
        let concepts = strings(&["memory", "recall"]);
        let step = ReasoningStep::semantic_activation(2, 0.63, &concepts);

        assert_eq!(step.details["activated_concepts"], "memory, recall");
        assert_eq!(step.details["num_concepts"], "2");
    }

    #[test]
    fn test_hallucination_step_inverts_confidence_on_failure() {
        let flags = strings(&["Response contains hedging language"]);
        let step = ReasoningStep::hallucination_check(false, 0.2, &flags);

        assert_eq!(step.description, "Response flagged for review");
        assert!((step.confidence - 0.8).abs() < 1e-6);
        assert_eq!(step.details["passed"], "false");
        assert_eq!(step.details["flags"], "Response contains hedging language");

        let passed = ReasoningStep::hallucination_check(true, 0.9, &[]);
        assert_eq!(passed.description, "Response validated");
        assert_eq!(passed.confidence, 0.9);
        assert!(!passed.details.contains_key("flags"));
    }

    #[test]
    fn test_build_averages_step_confidences() {
        let builder = ExplanationBuilder::new();
        let steps = vec![
            ReasoningStep::vector_search(1, 0.8, &strings(&["a"])),
            ReasoningStep::hybrid_fusion(FusionWeights::default(), 0.6),
        ];

        let explanation = builder.build("q", "r", steps);
        assert!((explanation.overall_confidence - 0.7).abs() < 1e-6);
        assert_eq!(explanation.reasoning_trace.len(), 2);
    }

    #[test]
    fn test_build_with_empty_trace() {
        let builder = ExplanationBuilder::new();
        let explanation = builder.build("q", "r", Vec::new());

        assert_eq!(explanation.overall_confidence, 0.0);
        assert!(explanation.summary.starts_with("Response generated using"));
    }

    #[test]
    fn test_summary_joins_sources_with_and() {
        let builder = ExplanationBuilder::new();
        let steps = vec![
            ReasoningStep::vector_search(1, 0.8, &strings(&["a"])),
            ReasoningStep::episodic_retrieval(1, 0.7, &strings(&["ctx"])),
            ReasoningStep::semantic_activation(1, 0.6, &strings(&["concept"])),
        ];

        let explanation = builder.build("q", "r", steps);
        assert_eq!(
            explanation.summary,
            "Response generated using vector search, conversation context and semantic knowledge."
        );
    }

    #[test]
    fn test_summary_reports_validation_outcome() {
        let builder = ExplanationBuilder::new();

        let passed = builder.build(
            "q",
            "r",
            vec![
                ReasoningStep::vector_search(1, 0.8, &strings(&["a"])),
                ReasoningStep::hallucination_check(true, 0.9, &[]),
            ],
        );
        assert!(passed.summary.ends_with("Response validated against evidence."));

        let flagged = builder.build(
            "q",
            "r",
            vec![
                ReasoningStep::vector_search(1, 0.8, &strings(&["a"])),
                ReasoningStep::hallucination_check(false, 0.2, &strings(&["flag"])),
            ],
        );
        assert!(
            flagged
                .summary
                .ends_with("Response flagged for potential hallucination.")
        );
    }

    #[test]
    fn test_format_text_layout() {
        let builder = ExplanationBuilder::new();
        let steps = vec![ReasoningStep::vector_search(2, 0.75, &strings(&["a", "b"]))];
        let explanation = builder.build("what is rust?", "a language", steps);

        let text = explanation.format_text();
        assert!(text.starts_with("=== Query Explanation ===\n"));
        assert!(text.contains("Query: what is rust?\n"));
        assert!(text.contains("Overall Confidence: 75.00%"));
        assert!(text.contains("1. Vector similarity search (confidence: 75.00%)"));
        assert!(text.contains("   - num_results: 2\n"));
        assert!(text.contains("Summary: Response generated using vector search.\n"));
    }

    #[test]
    fn test_text_and_json_agree() {
        let builder = ExplanationBuilder::new();
        let steps = vec![
            ReasoningStep::vector_search(1, 0.8, &strings(&["a"])),
            ReasoningStep::hybrid_fusion(FusionWeights::default(), 0.4),
        ];
        let explanation = builder.build("q", "r", steps);

        let json = explanation.format_json().unwrap();
        let parsed: Explanation = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, explanation);
        assert_eq!(parsed.overall_confidence, explanation.overall_confidence);
    }
}
