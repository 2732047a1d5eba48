// Core functionality
pub mod core {
    pub mod config;
    pub mod error;
}

// In-memory index storage
pub mod storage {
    pub mod cache;
    pub mod vectors;
}

// Indexing pipeline
pub mod indexing {
    pub mod chunker;
    pub mod discovery;
}

// Search & ML
pub mod search {
    pub mod keyword;
    pub mod model;
    pub mod result;
    pub mod semantic;
}

// User interfaces
pub mod ui {
    pub mod cli;
}

pub mod engine;

// Re-export commonly used types
pub use crate::core::config::{Config, EmbedderKind};
pub use crate::core::error::{Error, Result};
pub use crate::engine::SearchEngine;
pub use crate::indexing::chunker::{chunk_text, Chunk, Chunker};
pub use crate::indexing::discovery::{collect_files, FileCollector};
pub use crate::search::keyword::KeywordSearcher;
pub use crate::search::model::{load_embedder, BertEmbedder, DisabledEmbedder, Embedder};
pub use crate::search::result::{SearchMode, SearchOutcome, SearchResult};
pub use crate::search::semantic::SemanticSearcher;
pub use crate::storage::cache::{BuildOutcome, IndexCache, IndexedRepo, RepoKey};
pub use crate::storage::vectors::{ScoredPosition, VectorIndex};
pub use crate::ui::cli::Cli;
