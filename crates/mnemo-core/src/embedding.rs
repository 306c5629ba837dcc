//! Embedding vector math
//!
//! Plain `Vec<f32>` vectors and the similarity functions shared by every
//! store. Callers supply embeddings; nothing here talks to a model.

use crate::error::{Error, Result};

/// An embedding vector
pub type Embedding = Vec<f32>;

// ============== Vector Similarity Functions ==============

/// Normalize a vector to unit length (L2 norm) in place
///
/// Zero vectors are left unchanged.
pub fn normalize_vector(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Compute cosine similarity between two vectors
///
/// Returns a value between -1 and 1, where 1 means identical direction.
/// Mismatched lengths are an error; a zero-magnitude vector yields 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (mag_a * mag_b))
}

/// Compute the dot product of two equal-length vectors
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ============== Deterministic Test Embeddings ==============

/// Generate a deterministic pseudo-embedding from text
///
/// Hash-seeded and model-free, for tests and examples where real embeddings
/// are unavailable. Similar text does NOT produce similar vectors.
pub fn hash_embedding(text: &str, dimension: usize) -> Embedding {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut current = hasher.finish();

    let mut embedding = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        // LCG step for reproducible pseudo-random components
        current = current
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let value = ((current as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32;
        embedding.push(value);
    }

    normalize_vector(&mut embedding);
    embedding
}
