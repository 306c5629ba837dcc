//! Document-level vector index
//!
//! Wraps the HNSW graph with caller-assigned document ids, content, and
//! metadata. Embeddings are L2-normalized on the way in so inner product
//! equals cosine; reported similarity is mapped into [0, 1].

use crate::hnsw::HnswGraph;
use mnemo_core::{Error, Metadata, Result, normalize_vector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration for the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Embedding dimension, fixed per index
    pub dimension: usize,

    /// Maximum number of inserts over the index lifetime, tombstones included
    pub capacity: usize,

    /// Maximum number of connections per node per layer (default: 16)
    /// Higher values improve recall but increase memory and build time
    pub m: usize,

    /// Size of dynamic candidate list during construction (default: 200)
    pub ef_construction: usize,

    /// Size of dynamic candidate list during search (default: 50)
    /// Higher values improve recall but slow down search
    pub ef_search: usize,

    /// Maximum number of layers in the graph
    pub max_level: usize,

    /// Normalization multiplier for level generation
    /// Default: 1 / ln(m)
    pub ml: f32,
}

impl VectorIndexConfig {
    /// Default configuration for the given embedding dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            capacity: 100_000,
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            max_level: 16,
            ml: 1.0 / (16.0_f32).ln(),
        }
    }

    /// Configuration for small datasets (< 10,000 vectors)
    pub fn small(dimension: usize) -> Self {
        Self {
            dimension,
            capacity: 10_000,
            m: 8,
            ef_construction: 100,
            ef_search: 30,
            max_level: 10,
            ml: 1.0 / (8.0_f32).ln(),
        }
    }

    /// Configuration for large datasets (> 100,000 vectors)
    pub fn large(dimension: usize) -> Self {
        Self {
            dimension,
            capacity: 1_000_000,
            m: 32,
            ef_construction: 400,
            ef_search: 100,
            max_level: 20,
            ml: 1.0 / (32.0_f32).ln(),
        }
    }

    /// Builder: set the lifetime insert capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder: set connections per node, updating the level multiplier
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self.ml = 1.0 / (m as f32).ln();
        self
    }

    /// Builder: set construction-time candidate list size
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Builder: set search-time candidate list size
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self::new(768)
    }
}

/// An indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Caller-assigned unique identifier
    pub doc_id: String,

    /// The document text
    pub content: String,

    /// Caller metadata
    pub metadata: Metadata,

    /// Arena slot of the document's vector
    pub slot: u32,
}

/// One search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document identifier
    pub doc_id: String,

    /// Document text
    pub content: String,

    /// Similarity in [0, 1], 1.0 = identical direction
    pub similarity: f32,

    /// Caller metadata
    pub metadata: Metadata,
}

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Live documents
    pub documents: usize,

    /// Embedding dimension
    pub dimension: usize,

    /// Lifetime insert capacity
    pub capacity: usize,

    /// Slots ever assigned, tombstones included
    pub inserted_total: usize,

    /// Connections per node per layer
    pub m: usize,

    /// Construction-time candidate list size
    pub ef_construction: usize,

    /// Search-time candidate list size
    pub ef_search: usize,

    /// Rough memory footprint of vectors, edges, and content
    pub estimated_memory_bytes: usize,
}

/// Sidecar metadata stored next to the ANN snapshot
#[derive(Debug, Serialize, Deserialize)]
struct IndexMeta {
    dimension: usize,
    capacity: usize,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    max_level: usize,
    ml: f32,
    next_slot: u32,
    documents: Vec<DocumentRecord>,
}

/// Approximate nearest-neighbor index over documents
pub struct VectorIndex {
    config: VectorIndexConfig,
    graph: HnswGraph,
    documents: HashMap<String, DocumentRecord>,
    slot_to_doc: HashMap<u32, String>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(config: VectorIndexConfig) -> Self {
        let graph = HnswGraph::new(
            config.m,
            config.ef_construction,
            config.max_level,
            config.ml,
        );
        Self {
            config,
            graph,
            documents: HashMap::new(),
            slot_to_doc: HashMap::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &VectorIndexConfig {
        &self.config
    }

    // ========== Documents ==========

    /// Index a document
    ///
    /// Returns `Ok(false)` without touching the index when `doc_id` is
    /// already present. The embedding is normalized in place before insert.
    pub fn add(
        &mut self,
        doc_id: &str,
        mut embedding: Vec<f32>,
        content: &str,
        metadata: Metadata,
    ) -> Result<bool> {
        if self.documents.contains_key(doc_id) {
            return Ok(false);
        }

        if embedding.len() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                got: embedding.len(),
            });
        }

        // Capacity counts every slot ever assigned; tombstones are not reused
        if self.graph.len() >= self.config.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.config.capacity,
            });
        }

        normalize_vector(&mut embedding);
        let slot = self.graph.insert(embedding);

        self.documents.insert(
            doc_id.to_string(),
            DocumentRecord {
                doc_id: doc_id.to_string(),
                content: content.to_string(),
                metadata,
                slot,
            },
        );
        self.slot_to_doc.insert(slot, doc_id.to_string());

        debug!("Indexed document '{}' at slot {}", doc_id, slot);
        Ok(true)
    }

    /// Remove a document, tombstoning its vector
    ///
    /// Returns false when the id is not indexed. The slot is not reclaimed
    /// until the index is rebuilt.
    pub fn remove(&mut self, doc_id: &str) -> bool {
        match self.documents.remove(doc_id) {
            Some(record) => {
                self.graph.mark_deleted(record.slot);
                self.slot_to_doc.remove(&record.slot);
                debug!("Removed document '{}' from slot {}", doc_id, record.slot);
                true
            }
            None => false,
        }
    }

    /// Whether a live document with this id exists
    pub fn contains(&self, doc_id: &str) -> bool {
        self.documents.contains_key(doc_id)
    }

    /// Get a live document record
    pub fn get_document(&self, doc_id: &str) -> Option<&DocumentRecord> {
        self.documents.get(doc_id)
    }

    /// Number of live documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no live documents remain
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop all documents and rebuild an empty graph
    pub fn clear(&mut self) {
        self.graph = HnswGraph::new(
            self.config.m,
            self.config.ef_construction,
            self.config.max_level,
            self.config.ml,
        );
        self.documents.clear();
        self.slot_to_doc.clear();
    }

    // ========== Search ==========

    /// Find up to k documents nearest to the query embedding
    ///
    /// Results are ordered by similarity descending. An index with no
    /// inserts returns an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                got: query.len(),
            });
        }

        if self.graph.is_empty() {
            return Ok(Vec::new());
        }

        let mut normalized = query.to_vec();
        normalize_vector(&mut normalized);

        let hits = self.graph.search(&normalized, k, self.config.ef_search);

        // Tombstoned slots are already filtered by the graph
        Ok(hits
            .into_iter()
            .filter_map(|(slot, distance)| {
                let doc_id = self.slot_to_doc.get(&slot)?;
                let record = self.documents.get(doc_id)?;
                Some(SearchResult {
                    doc_id: record.doc_id.clone(),
                    content: record.content.clone(),
                    // distance = 1 - ip, so (ip + 1) / 2 = 1 - distance / 2
                    similarity: 1.0 - distance / 2.0,
                    metadata: record.metadata.clone(),
                })
            })
            .collect())
    }

    /// Current search-time candidate list size
    pub fn ef_search(&self) -> usize {
        self.config.ef_search
    }

    /// Adjust the recall/latency trade at query time
    pub fn set_ef_search(&mut self, ef: usize) {
        self.config.ef_search = ef;
    }

    /// Index statistics
    pub fn stats(&self) -> IndexStats {
        let per_node = self.config.dimension * 4 + self.config.m * 2 * 4;
        let content_bytes: usize = self.documents.values().map(|d| d.content.len()).sum();

        IndexStats {
            documents: self.documents.len(),
            dimension: self.config.dimension,
            capacity: self.config.capacity,
            inserted_total: self.graph.len(),
            m: self.config.m,
            ef_construction: self.config.ef_construction,
            ef_search: self.config.ef_search,
            estimated_memory_bytes: self.graph.len() * per_node + content_bytes,
        }
    }

    // ========== Persistence ==========

    /// Save the index as two coupled artifacts
    ///
    /// The ANN structure goes to `path` as a checksummed snapshot; the
    /// configuration and document records go to `path` + ".meta" as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        mnemo_core::write_snapshot(path, &self.graph)?;

        let mut documents: Vec<DocumentRecord> = self.documents.values().cloned().collect();
        documents.sort_by_key(|d| d.slot);

        let meta = IndexMeta {
            dimension: self.config.dimension,
            capacity: self.config.capacity,
            m: self.config.m,
            ef_construction: self.config.ef_construction,
            ef_search: self.config.ef_search,
            max_level: self.config.max_level,
            ml: self.config.ml,
            next_slot: self.graph.len() as u32,
            documents,
        };

        let json =
            serde_json::to_string_pretty(&meta).map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(meta_path(path), json)?;

        info!(
            "Saved vector index ({} documents, {} slots) to {}",
            self.documents.len(),
            self.graph.len(),
            path.display()
        );
        Ok(())
    }

    /// Load an index saved by [`VectorIndex::save`]
    ///
    /// Reads the sidecar first and validates it against the ANN snapshot;
    /// any inconsistency fails the load before an index is constructed, so
    /// an existing index a caller holds is never half-replaced.
    pub fn load(path: &Path) -> Result<VectorIndex> {
        let meta_path = meta_path(path);
        let json = match fs::read_to_string(&meta_path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SnapshotCorrupt(format!(
                    "missing index sidecar {}",
                    meta_path.display()
                )));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let meta: IndexMeta =
            serde_json::from_str(&json).map_err(|e| Error::Serialization(e.to_string()))?;

        let graph: HnswGraph = mnemo_core::read_snapshot(path)?;

        if graph.len() != meta.next_slot as usize {
            return Err(Error::SnapshotCorrupt(format!(
                "sidecar expects {} slots, ANN snapshot has {}",
                meta.next_slot,
                graph.len()
            )));
        }

        let mut documents = HashMap::with_capacity(meta.documents.len());
        let mut slot_to_doc = HashMap::with_capacity(meta.documents.len());

        for record in meta.documents {
            if !graph.is_alive(record.slot) {
                return Err(Error::SnapshotCorrupt(format!(
                    "document '{}' points at dead or missing slot {}",
                    record.doc_id, record.slot
                )));
            }
            if slot_to_doc
                .insert(record.slot, record.doc_id.clone())
                .is_some()
            {
                return Err(Error::SnapshotCorrupt(format!(
                    "slot {} referenced by more than one document",
                    record.slot
                )));
            }
            if documents.insert(record.doc_id.clone(), record).is_some() {
                return Err(Error::SnapshotCorrupt(
                    "duplicate document id in sidecar".to_string(),
                ));
            }
        }

        if graph.alive_count() != documents.len() {
            return Err(Error::SnapshotCorrupt(format!(
                "{} live slots but {} document records",
                graph.alive_count(),
                documents.len()
            )));
        }

        let config = VectorIndexConfig {
            dimension: meta.dimension,
            capacity: meta.capacity,
            m: meta.m,
            ef_construction: meta.ef_construction,
            ef_search: meta.ef_search,
            max_level: meta.max_level,
            ml: meta.ml,
        };

        info!(
            "Loaded vector index ({} documents) from {}",
            documents.len(),
            path.display()
        );

        Ok(VectorIndex {
            config,
            graph,
            documents,
            slot_to_doc,
        })
    }
}

fn meta_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.meta", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index(dimension: usize) -> VectorIndex {
        VectorIndex::new(VectorIndexConfig::small(dimension))
    }

    fn meta(key: &str, value: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert(key.to_string(), value.to_string());
        m
    }

    #[test]
    fn test_config_presets() {
        let small = VectorIndexConfig::small(128);
        let default = VectorIndexConfig::new(128);
        let large = VectorIndexConfig::large(128);

        assert!(small.m < default.m);
        assert!(default.m < large.m);
        assert_eq!(default.ef_search, 50);
        assert!((default.ml - 1.0 / (16.0_f32).ln()).abs() < 1e-6);

        let custom = VectorIndexConfig::new(128).with_m(32).with_ef_search(80);
        assert_eq!(custom.m, 32);
        assert_eq!(custom.ef_search, 80);
        assert!((custom.ml - 1.0 / (32.0_f32).ln()).abs() < 1e-6);
    }

    #[test]
    fn test_add_and_search_self() {
        let mut index = small_index(4);
        index
            .add("a", vec![1.0, 0.0, 0.0, 0.0], "doc a", Metadata::new())
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "a");
        assert_eq!(results[0].content, "doc a");
        assert!((results[0].similarity - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_add_duplicate_returns_false() {
        let mut index = small_index(2);
        assert!(index.add("a", vec![1.0, 0.0], "first", Metadata::new()).unwrap());
        assert!(!index.add("a", vec![0.0, 1.0], "second", Metadata::new()).unwrap());

        assert_eq!(index.len(), 1);
        assert_eq!(index.get_document("a").unwrap().content, "first");
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let mut index = small_index(4);
        let result = index.add("a", vec![1.0, 0.0], "short", Metadata::new());
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 4,
                got: 2
            })
        ));
    }

    #[test]
    fn test_capacity_counts_tombstones() {
        let config = VectorIndexConfig::small(2).with_capacity(2);
        let mut index = VectorIndex::new(config);

        index.add("a", vec![1.0, 0.0], "a", Metadata::new()).unwrap();
        index.add("b", vec![0.0, 1.0], "b", Metadata::new()).unwrap();

        let full = index.add("c", vec![1.0, 1.0], "c", Metadata::new());
        assert!(matches!(full, Err(Error::CapacityExceeded { capacity: 2 })));

        // Tombstoned slots are not reclaimed
        assert!(index.remove("a"));
        let still_full = index.add("c", vec![1.0, 1.0], "c", Metadata::new());
        assert!(matches!(
            still_full,
            Err(Error::CapacityExceeded { capacity: 2 })
        ));
    }

    #[test]
    fn test_search_empty_index() {
        let index = small_index(4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = small_index(4);
        assert!(index.search(&[1.0, 0.0], 5).is_err());
    }

    #[test]
    fn test_remove_excludes_from_search() {
        let mut index = small_index(2);
        index.add("a", vec![1.0, 0.0], "a", Metadata::new()).unwrap();
        index.add("b", vec![0.9, 0.1], "b", Metadata::new()).unwrap();

        assert!(index.remove("a"));
        assert!(!index.remove("a"));
        assert!(!index.contains("a"));
        assert_eq!(index.len(), 1);

        let results = index.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "b");
    }

    #[test]
    fn test_search_ranking() {
        let mut index = small_index(2);
        index.add("east", vec![1.0, 0.0], "east", Metadata::new()).unwrap();
        index.add("northeast", vec![1.0, 1.0], "northeast", Metadata::new()).unwrap();
        index.add("north", vec![0.0, 1.0], "north", Metadata::new()).unwrap();

        let results = index.search(&[1.0, 0.1], 3).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].doc_id, "east");
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_clear() {
        let mut index = small_index(2);
        index.add("a", vec![1.0, 0.0], "a", Metadata::new()).unwrap();
        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.stats().inserted_total, 0);
        assert!(index.search(&[1.0, 0.0], 1).unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let mut index = small_index(2);
        index.add("a", vec![1.0, 0.0], "aaaa", Metadata::new()).unwrap();
        index.add("b", vec![0.0, 1.0], "bb", Metadata::new()).unwrap();
        index.remove("b");

        let stats = index.stats();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.inserted_total, 2);
        assert_eq!(stats.dimension, 2);
        assert!(stats.estimated_memory_bytes > 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.hnsw");

        let mut index = small_index(4);
        index
            .add("a", vec![1.0, 0.0, 0.0, 0.0], "doc a", meta("lang", "en"))
            .unwrap();
        index
            .add("b", vec![0.0, 1.0, 0.0, 0.0], "doc b", Metadata::new())
            .unwrap();
        index
            .add("c", vec![0.0, 0.0, 1.0, 0.0], "doc c", Metadata::new())
            .unwrap();
        index.remove("b");
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.stats().inserted_total, 3);
        assert_eq!(
            loaded.get_document("a").unwrap().metadata["lang"],
            "en".to_string()
        );

        let before = index.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
        let after = loaded.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(before.len(), after.len());
        for (x, y) in before.iter().zip(after.iter()) {
            assert_eq!(x.doc_id, y.doc_id);
            assert!((x.similarity - y.similarity).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_missing_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.hnsw");

        let mut index = small_index(2);
        index.add("a", vec![1.0, 0.0], "a", Metadata::new()).unwrap();
        index.save(&path).unwrap();

        fs::remove_file(dir.path().join("index.hnsw.meta")).unwrap();

        let result = VectorIndex::load(&path);
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_load_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.hnsw");

        let mut index = small_index(2);
        index.add("a", vec![1.0, 0.0], "a", Metadata::new()).unwrap();
        index.save(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let result = VectorIndex::load(&path);
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));
    }

    #[test]
    fn test_load_inconsistent_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.hnsw");
        let path_b = dir.path().join("b.hnsw");

        let mut a = small_index(2);
        a.add("a1", vec![1.0, 0.0], "a1", Metadata::new()).unwrap();
        a.add("a2", vec![0.0, 1.0], "a2", Metadata::new()).unwrap();
        a.save(&path_a).unwrap();

        let mut b = small_index(2);
        b.add("b1", vec![1.0, 0.0], "b1", Metadata::new()).unwrap();
        b.save(&path_b).unwrap();

        // Pair A's ANN snapshot with B's sidecar
        fs::copy(
            dir.path().join("b.hnsw.meta"),
            dir.path().join("a.hnsw.meta"),
        )
        .unwrap();

        let result = VectorIndex::load(&path_a);
        assert!(matches!(result, Err(Error::SnapshotCorrupt(_))));
    }
}
