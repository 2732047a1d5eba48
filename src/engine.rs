use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::indexing::discovery::FileCollector;
use crate::search::keyword::KeywordSearcher;
use crate::search::model::{load_embedder, Embedder};
use crate::search::result::{SearchMode, SearchOutcome, SearchResult};
use crate::search::semantic::SemanticSearcher;
use crate::storage::cache::IndexCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry point tying discovery, the index cache and both search strategies together
pub struct SearchEngine {
    config: Config,
    collector: FileCollector,
    cache: Arc<IndexCache>,
    semantic: SemanticSearcher,
    keyword: KeywordSearcher,
}

impl SearchEngine {
    /// Wire an engine around an already chosen embedder
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(IndexCache::new(&config, embedder)?);
        Ok(Self {
            collector: FileCollector::from_config(&config),
            semantic: SemanticSearcher::new(Arc::clone(&cache)),
            keyword: KeywordSearcher::from_config(&config),
            cache,
            config,
        })
    }

    /// Wire an engine with the embedder named by the configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = load_embedder(&config);
        Self::new(config, embedder)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    pub fn semantic(&self) -> &SemanticSearcher {
        &self.semantic
    }

    pub fn keyword(&self) -> &KeywordSearcher {
        &self.keyword
    }

    /// Whether semantic search can run at all
    pub fn capability_available(&self) -> bool {
        self.semantic.is_available()
    }

    pub fn collect_files(&self, repo_path: &Path) -> Result<Vec<PathBuf>> {
        self.collector.collect(repo_path)
    }

    pub fn build_or_reuse(&self, repo_path: &Path) -> bool {
        self.cache.build_or_reuse(repo_path)
    }

    /// Run one search. `limit` defaults to `top_k` or `max_results` by mode.
    pub fn search(
        &self,
        repo_path: &Path,
        query: &str,
        mode: SearchMode,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        match mode {
            SearchMode::Semantic => {
                let k = limit.unwrap_or(self.config.top_k);
                self.semantic.search_repo(repo_path, query, k)
            }
            SearchMode::Keyword => {
                let max = limit.unwrap_or(self.config.max_results);
                self.keyword.search(repo_path, query, max)
            }
        }
    }

    /// Like [`search`](Self::search), answering a semantic request with
    /// keyword search when no model is loaded or no index can be built.
    pub fn search_with_fallback(
        &self,
        repo_path: &Path,
        query: &str,
        mode: SearchMode,
        limit: Option<usize>,
    ) -> Result<SearchOutcome> {
        if mode == SearchMode::Semantic {
            if self.capability_available() && self.build_or_reuse(repo_path) {
                let results = self.search(repo_path, query, SearchMode::Semantic, limit)?;
                return Ok(SearchOutcome {
                    mode,
                    fell_back: false,
                    results,
                });
            }
            tracing::info!("semantic search unavailable, using keyword search");
        }

        let results = self.search(repo_path, query, SearchMode::Keyword, limit)?;
        Ok(SearchOutcome {
            mode: SearchMode::Keyword,
            fell_back: mode == SearchMode::Semantic,
            results,
        })
    }

    /// Semantic search that refuses to fall back
    pub fn semantic_only(&self, repo_path: &Path, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        if !self.capability_available() {
            return Err(Error::CapabilityUnavailable(
                "no embedding model loaded".to_string(),
            ));
        }
        self.search(repo_path, query, SearchMode::Semantic, limit)
    }
}
