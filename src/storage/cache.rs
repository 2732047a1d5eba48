use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::indexing::chunker::{Chunk, Chunker};
use crate::indexing::discovery::{read_text_lossy, FileCollector};
use crate::search::model::Embedder;
use crate::storage::vectors::VectorIndex;
use lru::LruCache;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::UNIX_EPOCH;

/// Identity of an indexed repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoKey {
    /// Canonicalized repository root
    pub path: PathBuf,
    /// Digest of the indexed files' metadata, when fingerprinting is on
    pub fingerprint: Option<String>,
}

/// A fully built index for one repository. Never mutated once cached.
#[derive(Debug)]
pub struct IndexedRepo {
    key: RepoKey,
    index: VectorIndex,
    file_count: usize,
    model_id: String,
}

impl IndexedRepo {
    pub fn key(&self) -> &RepoKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.key.path
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        self.index.chunks()
    }

    /// Number of files that contributed chunks
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// What `ensure_index` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Reused,
    Built { files: usize, chunks: usize },
}

struct CacheState {
    entries: LruCache<RepoKey, Arc<IndexedRepo>>,
    active: Option<RepoKey>,
}

/// Process-wide cache of built repository indexes.
///
/// Holds up to `cache_capacity` repositories, evicting the least recently
/// used. The most recently built or reused repository is the active one. A
/// new index is built outside the lock and installed in one step, so readers
/// only ever see complete indexes.
pub struct IndexCache {
    collector: FileCollector,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    max_files: usize,
    embed_batch_size: usize,
    fingerprint_repos: bool,
    state: RwLock<CacheState>,
    builds: AtomicUsize,
}

impl IndexCache {
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .ok_or_else(|| Error::Config("cache_capacity must be at least 1".to_string()))?;

        Ok(Self {
            collector: FileCollector::from_config(config),
            chunker: Chunker::new(config.chunk_size, config.chunk_overlap)?,
            embedder,
            max_files: config.max_files,
            embed_batch_size: config.embed_batch_size.max(1),
            fingerprint_repos: config.fingerprint_repos,
            state: RwLock::new(CacheState {
                entries: LruCache::new(capacity),
                active: None,
            }),
            builds: AtomicUsize::new(0),
        })
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Build the index for `repo_path` unless an up-to-date one is cached.
    ///
    /// Returns false when the embedder is unavailable, the path is not a
    /// directory or nothing could be chunked. The cache is left untouched in
    /// those cases.
    pub fn build_or_reuse(&self, repo_path: &Path) -> bool {
        match self.ensure_index(repo_path) {
            Ok(_) => true,
            Err(e) => {
                tracing::info!(repo = %repo_path.display(), "semantic index not built: {}", e);
                false
            }
        }
    }

    /// Like [`build_or_reuse`](Self::build_or_reuse), with the index and the reason on failure
    pub fn ensure_index(&self, repo_path: &Path) -> Result<(Arc<IndexedRepo>, BuildOutcome)> {
        if !self.embedder.is_available() {
            return Err(Error::CapabilityUnavailable(
                "no embedding model loaded".to_string(),
            ));
        }

        let root = std::fs::canonicalize(repo_path).map_err(|e| {
            Error::Validation(format!("Cannot resolve {}: {}", repo_path.display(), e))
        })?;

        // A path-only key is known before any scan, so reuse needs no walk.
        if !self.fingerprint_repos {
            let key = RepoKey {
                path: root.clone(),
                fingerprint: None,
            };
            if let Some(repo) = self.reuse(key)? {
                return Ok((repo, BuildOutcome::Reused));
            }
        }

        let mut files = self.collector.collect(&root)?;
        if files.len() > self.max_files {
            tracing::debug!(
                total = files.len(),
                cap = self.max_files,
                "file cap reached, remaining files not indexed"
            );
            files.truncate(self.max_files);
        }

        let key = RepoKey {
            fingerprint: self.fingerprint_repos.then(|| repo_fingerprint(&root, &files)),
            path: root,
        };

        if self.fingerprint_repos {
            if let Some(repo) = self.reuse(key.clone())? {
                return Ok((repo, BuildOutcome::Reused));
            }
        }

        let repo = Arc::new(self.build(key.clone(), &files)?);
        let outcome = BuildOutcome::Built {
            files: repo.file_count(),
            chunks: repo.index().len(),
        };

        let mut state = self.write_state()?;
        let stale: Vec<RepoKey> = state
            .entries
            .iter()
            .filter(|(k, _)| k.path == key.path && **k != key)
            .map(|(k, _)| k.clone())
            .collect();
        for old in &stale {
            state.entries.pop(old);
        }
        state.entries.put(key.clone(), Arc::clone(&repo));
        state.active = Some(key);
        self.builds.fetch_add(1, Ordering::SeqCst);

        Ok((repo, outcome))
    }

    /// Activate and return the cached index for `key`, if resident
    fn reuse(&self, key: RepoKey) -> Result<Option<Arc<IndexedRepo>>> {
        let mut state = self.write_state()?;
        let Some(repo) = state.entries.get(&key).cloned() else {
            return Ok(None);
        };
        state.active = Some(key);
        tracing::debug!(repo = %repo.path().display(), "reusing cached index");
        Ok(Some(repo))
    }

    fn build(&self, key: RepoKey, files: &[PathBuf]) -> Result<IndexedRepo> {
        tracing::info!(repo = %key.path.display(), files = files.len(), "building semantic index");

        let chunker = self.chunker;
        let per_file: Vec<Vec<Chunk>> = files
            .par_iter()
            .map(|path| match read_text_lossy(path) {
                Ok(text) => chunker.chunk(path, &text),
                Err(e) => {
                    tracing::debug!(file = %path.display(), "skipping unreadable file: {}", e);
                    Vec::new()
                }
            })
            .collect();

        let file_count = per_file.iter().filter(|c| !c.is_empty()).count();
        let chunks: Vec<Chunk> = per_file.into_iter().flatten().collect();
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus(key.path));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embed_batch_size) {
            let encoded = self.embedder.encode(batch)?;
            if encoded.len() != batch.len() {
                return Err(Error::Model(format!(
                    "embedder returned {} vectors for {} texts",
                    encoded.len(),
                    batch.len()
                )));
            }
            vectors.extend(encoded);
        }

        let dimension = vectors.first().map_or(0, |v| v.len());
        let mut index = VectorIndex::new(dimension)?;
        index.add(vectors, chunks)?;

        tracing::info!(
            repo = %key.path.display(),
            files = file_count,
            chunks = index.len(),
            "semantic index built"
        );

        Ok(IndexedRepo {
            key,
            index,
            file_count,
            model_id: self.embedder.model_id().to_string(),
        })
    }

    /// The most recently built or reused repository
    pub fn active(&self) -> Option<Arc<IndexedRepo>> {
        let state = self.state.read().ok()?;
        let key = state.active.as_ref()?;
        state.entries.peek(key).cloned()
    }

    /// Whether any index for `repo_path` is resident, fresh or not
    pub fn contains(&self, repo_path: &Path) -> bool {
        let Ok(root) = std::fs::canonicalize(repo_path) else {
            return false;
        };
        self.state
            .read()
            .map(|state| state.entries.iter().any(|(k, _)| k.path == root))
            .unwrap_or(false)
    }

    /// Number of resident repositories
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completed builds since creation
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Drop every cached index
    pub fn clear(&self) -> Result<()> {
        let mut state = self.write_state()?;
        state.entries.clear();
        state.active = None;
        Ok(())
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, CacheState>> {
        self.state
            .write()
            .map_err(|e| Error::Cache(format!("Index cache lock poisoned: {}", e)))
    }
}

/// SHA-256 over the relative path, size and modification time of `files`
pub fn repo_fingerprint(root: &Path, files: &[PathBuf]) -> String {
    let mut entries: Vec<String> = files
        .iter()
        .map(|path| {
            let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
            match std::fs::metadata(path) {
                Ok(meta) => {
                    let modified = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map_or(0, |d| d.as_nanos());
                    format!("{}\0{}\0{}", relative, meta.len(), modified)
                }
                Err(_) => format!("{}\0?", relative),
            }
        })
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for entry in &entries {
        hasher.update(entry.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
