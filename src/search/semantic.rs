use crate::core::error::{Error, Result};
use crate::search::result::SearchResult;
use crate::storage::cache::{IndexCache, IndexedRepo};
use std::path::Path;
use std::sync::Arc;

/// Embeds a query and ranks cached chunks by similarity.
///
/// No score threshold is applied; every one of the top `k` hits is returned.
#[derive(Clone)]
pub struct SemanticSearcher {
    cache: Arc<IndexCache>,
}

impl SemanticSearcher {
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self { cache }
    }

    pub fn is_available(&self) -> bool {
        self.cache.embedder().is_available()
    }

    /// Search the active repository index. Empty if nothing has been built.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        validate(query, top_k)?;
        self.require_capability()?;
        match self.cache.active() {
            Some(repo) => self.search_in(&repo, query, top_k),
            None => Ok(Vec::new()),
        }
    }

    /// Build or reuse the index of `repo_path`, then search it.
    ///
    /// A repository that yields no index (nothing eligible, unreadable root)
    /// gives an empty result rather than an error.
    pub fn search_repo(&self, repo_path: &Path, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        validate(query, top_k)?;
        self.require_capability()?;
        match self.cache.ensure_index(repo_path) {
            Ok((repo, _)) => self.search_in(&repo, query, top_k),
            Err(Error::CapabilityUnavailable(reason)) => Err(Error::CapabilityUnavailable(reason)),
            Err(e) => {
                tracing::info!(repo = %repo_path.display(), "no semantic index: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn search_in(&self, repo: &IndexedRepo, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let embedded = self.cache.embedder().encode(&[query.to_string()])?;
        let query_vector = embedded
            .into_iter()
            .next()
            .ok_or_else(|| Error::Model("embedder returned no vector for the query".to_string()))?;

        let hits = repo.index().search(&query_vector, top_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                repo.index().chunk(hit.position).map(|chunk| SearchResult {
                    file_path: chunk.source_file.clone(),
                    offset: chunk.start_offset,
                    snippet: chunk.text.clone(),
                    score: Some(hit.score),
                })
            })
            .collect())
    }

    fn require_capability(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::CapabilityUnavailable(
                "semantic search needs an embedding model".to_string(),
            ))
        }
    }
}

fn validate(query: &str, top_k: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::Validation("query must not be empty".to_string()));
    }
    if top_k == 0 {
        return Err(Error::Validation("top_k must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::search::model::{DisabledEmbedder, Embedder};
    use std::fs;
    use tempfile::TempDir;

    /// One axis per keyword
    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    let raw: Vec<f32> = ["auth", "render", "database"]
                        .iter()
                        .map(|k| t.matches(k).count() as f32 + 0.01)
                        .collect();
                    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
                    raw.into_iter().map(|x| x / norm).collect()
                })
                .collect())
        }

        fn model_id(&self) -> &str {
            "axis"
        }
    }

    fn searcher(embedder: Arc<dyn Embedder>) -> SemanticSearcher {
        SemanticSearcher::new(Arc::new(IndexCache::new(&Config::default(), embedder).unwrap()))
    }

    #[test]
    fn test_search_repo_ranks_relevant_chunk_first() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("auth.py"), "def auth(): check auth token").unwrap();
        fs::write(repo.join("view.js"), "function render() { render() }").unwrap();
        fs::write(repo.join("db.md"), "database notes").unwrap();

        let searcher = searcher(Arc::new(AxisEmbedder));
        let results = searcher.search_repo(&repo, "how does auth work", 10).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].file_path.ends_with("auth.py"));
        assert_eq!(results[0].offset, 0);
        assert_eq!(results[0].snippet, "def auth(): check auth token");
        assert!(results.iter().all(|r| r.score.is_some()));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_top_k_limits_results() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        for i in 0..5 {
            fs::write(repo.join(format!("f{i}.md")), "render").unwrap();
        }

        let searcher = searcher(Arc::new(AxisEmbedder));
        assert_eq!(searcher.search_repo(&repo, "render", 2).unwrap().len(), 2);
        // Index is cached now; plain search uses it.
        assert_eq!(searcher.search("render", 3).unwrap().len(), 3);
    }

    #[test]
    fn test_search_without_index_is_empty() {
        let searcher = searcher(Arc::new(AxisEmbedder));
        assert!(searcher.search("auth", 10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_corpus_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("logo.svg"), "<svg/>").unwrap();

        let searcher = searcher(Arc::new(AxisEmbedder));
        assert!(searcher.search_repo(&repo, "auth", 10).unwrap().is_empty());
    }

    #[test]
    fn test_disabled_embedder_reports_capability() {
        let searcher = searcher(Arc::new(DisabledEmbedder::default()));
        assert!(!searcher.is_available());
        assert!(matches!(
            searcher.search("auth", 10),
            Err(Error::CapabilityUnavailable(_))
        ));
    }

    #[test]
    fn test_rejects_bad_input() {
        let searcher = searcher(Arc::new(AxisEmbedder));
        assert!(matches!(searcher.search("   ", 10), Err(Error::Validation(_))));
        assert!(matches!(searcher.search("auth", 0), Err(Error::Validation(_))));
    }
}
