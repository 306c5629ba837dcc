//! Cognitive query engine
//!
//! [`CognitiveEngine`] bundles the three retrieval stores with the fusion
//! and validation stages and runs the full pipeline for each query:
//! vector search, episodic recall, spreading activation, evidence fusion,
//! hallucination check, explanation.

use crate::config::EngineConfig;
use mnemo_core::{Embedding, Error, Metadata, Result, ScoredResult, SourceTag};
use mnemo_graph::ConceptGraph;
use mnemo_index::VectorIndex;
use mnemo_memory::{Episode, EpisodeId, EpisodicMemory};
use mnemo_reason::{
    Evidence, EvidenceFusion, Explanation, ExplanationBuilder, FusionWeights,
    HallucinationDetector, HallucinationReport, ReasoningStep,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

const INDEX_FILE: &str = "index.hnsw";
const EPISODES_FILE: &str = "episodes.snap";
const CONCEPTS_FILE: &str = "concepts.snap";

/// Per-query pipeline switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Consult episodic memory
    pub use_episodic: bool,

    /// Spread activation through the concept graph
    pub use_semantic: bool,

    /// Validate the answer against retrieved evidence
    pub check_hallucination: bool,

    /// Build a reasoning trace for the response
    pub generate_explanation: bool,

    /// Fused results to return
    pub top_k_results: usize,

    /// Confidence below this marks the answer as a hallucination
    pub hallucination_threshold: f32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            use_episodic: true,
            use_semantic: true,
            check_hallucination: true,
            generate_explanation: true,
            top_k_results: 10,
            hallucination_threshold: 0.5,
        }
    }
}

/// Everything produced for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The query as asked
    pub query: String,

    /// Content of the best fused result, or a placeholder when nothing
    /// matched
    pub answer: String,

    /// Fused results, best first
    pub results: Vec<ScoredResult>,

    /// Validation verdict, present when the check ran
    pub hallucination: Option<HallucinationReport>,

    /// Reasoning trace, present when requested
    pub explanation: Option<Explanation>,

    /// Score of the best fused result, zero when nothing matched
    pub confidence: f32,
}

/// One document in a batch indexing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDocument {
    pub doc_id: String,
    pub embedding: Embedding,
    pub content: String,
    pub metadata: Metadata,
}

impl BatchDocument {
    pub fn new(doc_id: impl Into<String>, embedding: Embedding, content: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            embedding,
            content: content.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Aggregated result of a batch indexing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    /// Fraction of documents indexed successfully
    pub fn success_rate(&self) -> f32 {
        if self.total > 0 {
            self.succeeded as f32 / self.total as f32
        } else {
            0.0
        }
    }
}

/// Point-in-time store sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub documents: usize,
    pub episodes: usize,
    pub episodic_capacity: usize,
    pub concept_nodes: usize,
    pub concept_edges: usize,
}

/// Orchestrates retrieval, fusion, validation and explanation
///
/// Each store sits behind its own mutex and is locked only for the
/// duration of its pipeline stage, so concurrent mutation may interleave
/// between stages of one query.
pub struct CognitiveEngine {
    config: EngineConfig,
    index: Mutex<VectorIndex>,
    episodes: Mutex<EpisodicMemory>,
    concepts: Mutex<ConceptGraph>,
    fusion: Mutex<EvidenceFusion>,
    detector: Mutex<HallucinationDetector>,
    explainer: ExplanationBuilder,
}

impl CognitiveEngine {
    /// Create an engine from configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        let fusion = EvidenceFusion::with_weights(config.weights)?;
        let index = VectorIndex::new(config.index.clone());

        info!(
            "Created cognitive engine (dimension {}, episodic capacity {})",
            config.index.dimension, config.episodic_capacity
        );

        Ok(Self {
            index: Mutex::new(index),
            episodes: Mutex::new(EpisodicMemory::new(config.episodic_capacity)),
            concepts: Mutex::new(ConceptGraph::new()),
            fusion: Mutex::new(fusion),
            detector: Mutex::new(HallucinationDetector::new()),
            explainer: ExplanationBuilder::new(),
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========== Query Pipeline ==========

    /// Answer a query by running the full cognitive pipeline
    ///
    /// Vector search always runs; episodic recall and spreading activation
    /// run when enabled and their stores are non-empty. Fused results
    /// supply the answer and its confidence; an empty fusion degrades to a
    /// placeholder answer with zero confidence rather than an error.
    pub fn process_query(
        &self,
        query: &str,
        query_embedding: &[f32],
        options: &QueryOptions,
    ) -> Result<QueryResponse> {
        debug!("Processing query: {}", query);

        let mut trace: Vec<ReasoningStep> = Vec::new();

        // Stage 1: vector search
        let vector_results: Vec<ScoredResult> = {
            let index = self
                .index
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;
            index
                .search(query_embedding, options.top_k_results)?
                .into_iter()
                .map(|hit| ScoredResult::new(hit.content, hit.similarity, SourceTag::Vector))
                .collect()
        };

        if !vector_results.is_empty() {
            let top = &vector_results[..vector_results.len().min(3)];
            let avg = top.iter().map(|r| r.score).sum::<f32>() / top.len() as f32;
            let contents: Vec<String> = top.iter().map(|r| snippet(&r.content, 50)).collect();
            trace.push(ReasoningStep::vector_search(
                vector_results.len(),
                avg,
                &contents,
            ));
        }

        // Stage 2: episodic recall
        let mut episodic_results: Vec<ScoredResult> = Vec::new();
        if options.use_episodic {
            let episodes = self
                .episodes
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))?;
            if !episodes.is_empty() {
                episodic_results = episodes
                    .retrieve_similar(
                        query_embedding,
                        self.config.episodic_top_k,
                        self.config.episodic_min_score,
                    )?
                    .into_iter()
                    .map(|hit| {
                        let content = format!(
                            "Previous context: Q: {} A: {}",
                            hit.episode.query, hit.episode.response
                        );
                        ScoredResult::new(content, hit.score, SourceTag::Episodic)
                    })
                    .collect();
            }
        }

        if !episodic_results.is_empty() {
            let top = &episodic_results[..episodic_results.len().min(2)];
            let avg = top.iter().map(|r| r.score).sum::<f32>() / top.len() as f32;
            let snippets: Vec<String> = top.iter().map(|r| snippet(&r.content, 40)).collect();
            trace.push(ReasoningStep::episodic_retrieval(
                episodic_results.len(),
                avg,
                &snippets,
            ));
        }

        // Stage 3: spreading activation
        let mut semantic_results: Vec<ScoredResult> = Vec::new();
        if options.use_semantic {
            let mut concepts = self
                .concepts
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire concepts lock".to_string()))?;
            if !concepts.is_empty() {
                let seeds = extract_concepts(query);
                semantic_results = concepts
                    .spread_activation(&seeds, &self.config.activation)
                    .into_iter()
                    .map(|(name, activation)| {
                        ScoredResult::new(name, activation, SourceTag::Semantic)
                    })
                    .collect();
            }
        }

        if !semantic_results.is_empty() {
            let names: Vec<String> = semantic_results
                .iter()
                .take(5)
                .map(|r| r.content.clone())
                .collect();
            // Activations come back sorted, so the first is the strongest
            let top_activation = semantic_results[0].score;
            trace.push(ReasoningStep::semantic_activation(
                semantic_results.len(),
                top_activation,
                &names,
            ));
        }

        // Stage 4: fusion
        let (fused_results, weights) = {
            let fusion = self
                .fusion
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire fusion lock".to_string()))?;
            (
                fusion.fuse(
                    &vector_results,
                    &episodic_results,
                    &semantic_results,
                    options.top_k_results,
                ),
                fusion.weights(),
            )
        };

        let (answer, confidence) = match fused_results.first() {
            Some(top) => {
                trace.push(ReasoningStep::hybrid_fusion(weights, top.score));
                (top.content.clone(), top.score)
            }
            None => ("No results found.".to_string(), 0.0),
        };

        // Stage 5: hallucination check
        let mut hallucination = None;
        if options.check_hallucination {
            let evidence: Vec<Evidence> = vector_results
                .iter()
                .chain(&episodic_results)
                .chain(&semantic_results)
                .map(|r| Evidence::new(r.source, r.score, r.content.clone()))
                .collect();

            let detector = self
                .detector
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire detector lock".to_string()))?;
            let report =
                detector.validate(query, &answer, &evidence, options.hallucination_threshold);

            trace.push(ReasoningStep::hallucination_check(
                !report.is_hallucination,
                report.confidence_score,
                &report.flags,
            ));
            hallucination = Some(report);
        }

        // Stage 6: explanation
        let explanation = options
            .generate_explanation
            .then(|| self.explainer.build(query, &answer, trace));

        Ok(QueryResponse {
            query: query.to_string(),
            answer,
            results: fused_results,
            hallucination,
            explanation,
            confidence,
        })
    }

    // ========== Documents ==========

    /// Index one document; returns false when the id already exists
    pub fn index_document(
        &self,
        doc_id: &str,
        embedding: Embedding,
        content: &str,
        metadata: Metadata,
    ) -> Result<bool> {
        let mut index = self
            .index
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;
        index.add(doc_id, embedding, content, metadata)
    }

    /// Remove a document; returns false when the id is unknown
    pub fn remove_document(&self, doc_id: &str) -> Result<bool> {
        let mut index = self
            .index
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;
        Ok(index.remove(doc_id))
    }

    /// Index a batch of documents, collecting per-document failures
    ///
    /// Duplicates and hard errors are recorded in the outcome and do not
    /// abort the rest of the batch.
    pub fn batch_index_documents(&self, documents: Vec<BatchDocument>) -> Result<BatchOutcome> {
        let start = Instant::now();
        let total = documents.len();
        let mut succeeded = 0;
        let mut failed = 0;
        let mut errors = Vec::new();

        let mut index = self
            .index
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;

        for doc in documents {
            match index.add(&doc.doc_id, doc.embedding, &doc.content, doc.metadata) {
                Ok(true) => succeeded += 1,
                Ok(false) => {
                    failed += 1;
                    errors.push(format!("Failed to add document: {}", doc.doc_id));
                }
                Err(e) => {
                    failed += 1;
                    errors.push(format!("Error for {}: {}", doc.doc_id, e));
                }
            }
        }

        let outcome = BatchOutcome {
            total,
            succeeded,
            failed,
            errors,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Batch indexed {} documents: {} succeeded, {} failed",
            outcome.total, outcome.succeeded, outcome.failed
        );

        Ok(outcome)
    }

    // ========== Episodic Memory ==========

    /// Record a completed exchange in episodic memory
    pub fn add_episode(
        &self,
        query: &str,
        response: &str,
        embedding: Embedding,
        metadata: Metadata,
    ) -> Result<EpisodeId> {
        let mut episodes = self
            .episodes
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))?;
        Ok(episodes.add(query, response, embedding, metadata))
    }

    /// Most recent episodes, oldest first
    pub fn retrieve_recent(&self, n: usize) -> Result<Vec<Episode>> {
        let episodes = self
            .episodes
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))?;
        Ok(episodes.get_recent(n))
    }

    // ========== Semantic Network ==========

    /// Bulk-load concepts and weighted relations into the graph
    pub fn populate_semantic_network(
        &self,
        concepts: Vec<(String, Option<Embedding>)>,
        relations: Vec<(String, String, f32)>,
    ) -> Result<()> {
        let mut graph = self
            .concepts
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire concepts lock".to_string()))?;

        for (name, embedding) in concepts {
            graph.add_node(&name, embedding);
        }
        for (source, target, weight) in relations {
            graph.add_edge(&source, &target, weight);
        }

        info!(
            "Semantic network has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }

    // ========== Tuning ==========

    /// Replace the fusion weights; invalid weights are rejected
    pub fn set_fusion_weights(&self, weights: FusionWeights) -> Result<()> {
        let mut fusion = self
            .fusion
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire fusion lock".to_string()))?;
        fusion.set_weights(weights)
    }

    /// Current normalized fusion weights
    pub fn fusion_weights(&self) -> Result<FusionWeights> {
        let fusion = self
            .fusion
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire fusion lock".to_string()))?;
        Ok(fusion.weights())
    }

    /// Adjust search breadth for subsequent queries (higher is more
    /// accurate and slower)
    pub fn set_search_precision(&self, ef: usize) -> Result<()> {
        let mut index = self
            .index
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;
        index.set_ef_search(ef);
        Ok(())
    }

    // ========== Introspection ==========

    /// Current store sizes
    pub fn stats(&self) -> Result<EngineStats> {
        let index = self
            .index
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;
        let episodes = self
            .episodes
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))?;
        let concepts = self
            .concepts
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire concepts lock".to_string()))?;

        Ok(EngineStats {
            documents: index.len(),
            episodes: episodes.len(),
            episodic_capacity: episodes.capacity(),
            concept_nodes: concepts.node_count(),
            concept_edges: concepts.edge_count(),
        })
    }

    // ========== Persistence ==========

    /// Persist all stores under fixed file names in `dir`
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        {
            let index = self
                .index
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))?;
            index.save(&dir.join(INDEX_FILE))?;
        }
        {
            let episodes = self
                .episodes
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))?;
            episodes.save(&dir.join(EPISODES_FILE))?;
        }
        {
            let concepts = self
                .concepts
                .lock()
                .map_err(|_| Error::Internal("Failed to acquire concepts lock".to_string()))?;
            concepts.save(&dir.join(CONCEPTS_FILE))?;
        }

        info!("Saved engine state to {}", dir.display());
        Ok(())
    }

    /// Restore all stores from `dir`
    ///
    /// Every store is loaded before any engine state is replaced, so a
    /// failed load leaves the engine untouched.
    pub fn load_from_dir(&self, dir: &Path) -> Result<()> {
        let index = VectorIndex::load(&dir.join(INDEX_FILE))?;
        let episodes = EpisodicMemory::load(&dir.join(EPISODES_FILE))?;
        let concepts = ConceptGraph::load(&dir.join(CONCEPTS_FILE))?;

        *self
            .index
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire index lock".to_string()))? = index;
        *self
            .episodes
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire episodes lock".to_string()))? =
            episodes;
        *self
            .concepts
            .lock()
            .map_err(|_| Error::Internal("Failed to acquire concepts lock".to_string()))? =
            concepts;

        info!("Loaded engine state from {}", dir.display());
        Ok(())
    }
}

/// First `limit` characters of `text` with a trailing ellipsis
fn snippet(text: &str, limit: usize) -> String {
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

/// Seed concepts from a query: lowercased whitespace tokens longer than 3
/// characters with stopwords removed. Crude stand-in for real entity
/// extraction; punctuation stays attached to tokens.
fn extract_concepts(query: &str) -> Vec<String> {
    const STOPWORDS: [&str; 24] = [
        "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in", "with", "to",
        "for", "of", "as", "by", "from", "how", "what", "where", "when", "why", "who",
    ];

    query
        .to_lowercase()
        .split_whitespace()
        .filter(|token| token.len() > 3 && !STOPWORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}
