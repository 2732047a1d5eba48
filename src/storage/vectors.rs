use crate::core::error::{Error, Result};
use crate::indexing::chunker::Chunk;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A position in the index with its similarity to a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    pub position: usize,
    pub score: f32,
}

/// In-memory, append-only store of unit-norm embeddings and their chunks.
///
/// Position `i` of the vector store always describes `chunks()[i]`.
/// Search is an exact brute-force inner-product scan.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major, `len() * dimension` values
    vectors: Vec<f32>,
    metadata: Vec<Chunk>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Validation("vector dimension must be greater than 0".to_string()));
        }
        Ok(Self {
            dimension,
            vectors: Vec::new(),
            metadata: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Chunk stored at `position`
    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.metadata.get(position)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.metadata
    }

    /// Append vectors and their chunks.
    ///
    /// Nothing is appended unless every vector has the index dimension and
    /// the two sequences have the same length.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, metadata: Vec<Chunk>) -> Result<()> {
        if vectors.len() != metadata.len() {
            return Err(Error::Validation(format!(
                "got {} vectors for {} chunks",
                vectors.len(),
                metadata.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Validation(format!(
                "vector of dimension {} added to index of dimension {}",
                bad.len(),
                self.dimension
            )));
        }

        self.vectors.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.vectors.extend_from_slice(&vector);
        }
        self.metadata.extend(metadata);
        Ok(())
    }

    /// Top `k` positions by inner product, best first.
    ///
    /// Equal scores are ordered by ascending position. An empty index yields
    /// an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPosition>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::Validation(format!(
                "query of dimension {} against index of dimension {}",
                query.len(),
                self.dimension
            )));
        }

        // Worst candidate sits at the top of the heap.
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (position, vector) in self.vectors.chunks_exact(self.dimension).enumerate() {
            heap.push(Candidate(ScoredPosition {
                position,
                score: inner_product(query, vector),
            }));
            if heap.len() > k {
                heap.pop();
            }
        }

        Ok(heap.into_sorted_vec().into_iter().map(|c| c.0).collect())
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Heap entry ordered so that "greater" means a worse match
struct Candidate(ScoredPosition);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .total_cmp(&self.0.score)
            .then_with(|| self.0.position.cmp(&other.0.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chunk(name: &str) -> Chunk {
        Chunk {
            source_file: PathBuf::from(name),
            start_offset: 0,
            text: name.to_string(),
        }
    }

    fn unit(x: f32, y: f32) -> Vec<f32> {
        let norm = (x * x + y * y).sqrt();
        vec![x / norm, y / norm]
    }

    #[test]
    fn test_inner_product() {
        assert!((inner_product(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(inner_product(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((inner_product(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::new(3).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(VectorIndex::new(0).is_err());
    }

    #[test]
    fn test_search_orders_by_score() {
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add(
                vec![unit(0.0, 1.0), unit(1.0, 0.0), unit(1.0, 1.0)],
                vec![chunk("orthogonal"), chunk("same"), chunk("diagonal")],
            )
            .unwrap();

        let results = index.search(&unit(1.0, 0.0), 10).unwrap();
        assert_eq!(results.len(), 3);
        let order: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(results[0].score > 0.99);
        assert_eq!(index.chunk(results[0].position).unwrap().text, "same");
    }

    #[test]
    fn test_search_limits_to_k() {
        let mut index = VectorIndex::new(2).unwrap();
        let vectors: Vec<Vec<f32>> = (1..=20).map(|i| unit(i as f32, 3.0)).collect();
        let chunks: Vec<Chunk> = (1..=20).map(|i| chunk(&format!("c{i}"))).collect();
        index.add(vectors, chunks).unwrap();

        let results = index.search(&unit(1.0, 0.0), 5).unwrap();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Larger x component means closer to the query.
        assert_eq!(results[0].position, 19);
    }

    #[test]
    fn test_ties_break_by_position() {
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add(
                vec![unit(0.0, 1.0), unit(1.0, 0.0), unit(1.0, 0.0), unit(1.0, 0.0)],
                vec![chunk("a"), chunk("b"), chunk("c"), chunk("d")],
            )
            .unwrap();

        let results = index.search(&unit(1.0, 0.0), 2).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_add_rejects_mismatch_without_partial_append() {
        let mut index = VectorIndex::new(2).unwrap();
        assert!(index.add(vec![unit(1.0, 0.0)], vec![]).is_err());
        assert!(index
            .add(vec![unit(1.0, 0.0), vec![1.0, 0.0, 0.0]], vec![chunk("a"), chunk("b")])
            .is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_dimension_checked() {
        let mut index = VectorIndex::new(2).unwrap();
        index.add(vec![unit(1.0, 0.0)], vec![chunk("a")]).unwrap();
        assert!(matches!(index.search(&[1.0, 0.0, 0.0], 1), Err(Error::Validation(_))));
    }

    #[test]
    fn test_append_keeps_positions() {
        let mut index = VectorIndex::new(2).unwrap();
        index.add(vec![unit(1.0, 0.0)], vec![chunk("first")]).unwrap();
        index.add(vec![unit(0.0, 1.0)], vec![chunk("second")]).unwrap();

        let results = index.search(&unit(0.0, 1.0), 1).unwrap();
        assert_eq!(results[0].position, 1);
        assert_eq!(index.chunk(1).unwrap().text, "second");
        assert_eq!(index.len(), 2);
    }
}
