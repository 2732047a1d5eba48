use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Nearest neighbours of the query embedding
    Semantic,
    /// Case-insensitive substring match, in discovery order
    Keyword,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => write!(f, "semantic"),
            Self::Keyword => write!(f, "keyword"),
        }
    }
}

/// One hit: where it is, what it says and, for semantic hits, how close it is
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub file_path: PathBuf,
    /// Character offset of the snippet within the file
    pub offset: usize,
    pub snippet: String,
    /// Inner-product similarity; absent for keyword hits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchResult {
    /// Path relative to `root`, or the full path if it lies elsewhere
    pub fn relative_path(&self, root: &Path) -> &Path {
        self.file_path.strip_prefix(root).unwrap_or(&self.file_path)
    }

    /// `path @ offset (score: 0.123)` heading used when listing results
    pub fn heading(&self, root: &Path) -> String {
        match self.score {
            Some(score) => format!(
                "{} @ {}  (score: {:.3})",
                self.relative_path(root).display(),
                self.offset,
                score
            ),
            None => format!("{} @ {}", self.relative_path(root).display(), self.offset),
        }
    }
}

/// Results plus the strategy that actually produced them
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub mode: SearchMode,
    /// Set when a semantic request was answered by keyword search
    pub fell_back: bool,
    pub results: Vec<SearchResult>,
}
