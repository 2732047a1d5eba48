use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::indexing::discovery::{read_text_lossy, FileCollector};
use crate::search::result::SearchResult;
use std::path::Path;

/// Case-insensitive substring scan over a repository's files.
///
/// Independent of any index or embedder. Each file contributes at most one
/// hit (its first match) and files are visited in discovery order, so the
/// ordering says nothing about relevance.
#[derive(Debug, Clone)]
pub struct KeywordSearcher {
    collector: FileCollector,
    context: usize,
}

impl Default for KeywordSearcher {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl KeywordSearcher {
    /// `context` is the number of characters kept on each side of a match
    pub fn new(collector: FileCollector, context: usize) -> Self {
        Self { collector, context }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(FileCollector::from_config(config), config.snippet_context)
    }

    /// Stops as soon as `max_results` files have matched. An empty or
    /// whitespace-only query is rejected, as in semantic search.
    pub fn search(&self, repo_path: &Path, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }
        if max_results == 0 {
            return Err(Error::Validation("max_results must be at least 1".to_string()));
        }

        let needle: Vec<char> = query.chars().map(fold_char).collect();
        let mut results = Vec::new();

        for path in self.collector.collect(repo_path)? {
            let text = match read_text_lossy(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(file = %path.display(), "skipping unreadable file: {}", e);
                    continue;
                }
            };

            if let Some((offset, snippet)) = self.first_match(&text, &needle) {
                results.push(SearchResult {
                    file_path: path,
                    offset,
                    snippet,
                    score: None,
                });
                if results.len() >= max_results {
                    break;
                }
            }
        }

        Ok(results)
    }

    /// Snippet around the first occurrence of `needle`, with its character offset
    fn first_match(&self, text: &str, needle: &[char]) -> Option<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        if needle.len() > chars.len() {
            return None;
        }
        let folded: Vec<char> = chars.iter().copied().map(fold_char).collect();
        let idx = folded.windows(needle.len()).position(|w| w == needle)?;

        let start = idx.saturating_sub(self.context);
        let end = (idx + needle.len() + self.context).min(chars.len());
        Some((start, chars[start..end].iter().collect()))
    }
}

/// Single-character lowercase, so folded text stays aligned with the original
fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}
