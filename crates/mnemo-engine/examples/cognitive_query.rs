//! End-to-end cognitive query demo
//!
//! Indexes a few documents, records an episode, loads a small concept
//! graph and runs one query through the full pipeline, printing the
//! fused answer and its reasoning trace.
//!
//! Run with: cargo run --example cognitive_query

use mnemo_core::{Metadata, Result};
use mnemo_engine::{CognitiveEngine, EngineConfig, QueryOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Hand-rolled stand-ins for model embeddings: one axis per topic
fn topic_embedding(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; 4];
    v[axis] = 1.0;
    v
}

fn run(engine: &CognitiveEngine) -> Result<()> {
    // Populate the three stores
    engine.index_document(
        "doc-ownership",
        topic_embedding(0),
        "rust ownership prevents data races at compile time",
        Metadata::new(),
    )?;
    engine.index_document(
        "doc-borrowing",
        topic_embedding(1),
        "borrowing rules enforce unique mutable access",
        Metadata::new(),
    )?;
    engine.index_document(
        "doc-gc",
        topic_embedding(2),
        "garbage collection trades latency for convenience",
        Metadata::new(),
    )?;

    engine.add_episode(
        "does rust need a garbage collector",
        "no, ownership makes a garbage collector unnecessary",
        topic_embedding(0),
        Metadata::new(),
    )?;

    engine.populate_semantic_network(
        vec![
            ("ownership".to_string(), None),
            ("borrowing".to_string(), None),
            ("lifetimes".to_string(), None),
        ],
        vec![
            ("ownership".to_string(), "borrowing".to_string(), 0.9),
            ("borrowing".to_string(), "lifetimes".to_string(), 0.8),
        ],
    )?;

    let stats = engine.stats()?;
    info!(
        "Engine ready: {} documents, {} episodes, {} concepts",
        stats.documents, stats.episodes, stats.concept_nodes
    );

    // Ask a question
    let query = "explain rust ownership";
    let response = engine.process_query(query, &topic_embedding(0), &QueryOptions::default())?;

    println!("Query:      {}", response.query);
    println!("Answer:     {}", response.answer);
    println!("Confidence: {:.2}", response.confidence);
    println!();

    println!("Top results:");
    for result in response.results.iter().take(3) {
        println!("  [{:.3}] {}", result.score, result.content);
    }
    println!();

    if let Some(report) = &response.hallucination {
        if report.is_hallucination {
            println!("Validation flagged this answer:");
            for flag in &report.flags {
                println!("  - {}", flag);
            }
        } else {
            println!(
                "Validation passed (support score {:.2})",
                report.confidence_score
            );
        }
        println!();
    }

    if let Some(explanation) = &response.explanation {
        println!("{}", explanation.format_text());
    }

    Ok(())
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let engine = match CognitiveEngine::new(EngineConfig::new(4)) {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to create engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine) {
        error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
