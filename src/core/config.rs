use super::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Default embedding model, a small sentence-transformers BERT.
/// https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Which embedding backend to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// No embedding capability; semantic search reports itself unavailable
    Disabled,
    /// Candle BERT model fetched from the HuggingFace Hub
    Bert,
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "bert" => Ok(Self::Bert),
            other => Err(Error::Config(format!("Unknown embedder: {}", other))),
        }
    }
}

/// Configuration for codeseek
#[derive(Debug, Clone)]
pub struct Config {
    /// Window size of a chunk, in characters
    pub chunk_size: usize,
    /// Characters shared by two consecutive chunks
    pub chunk_overlap: usize,
    /// Maximum number of files considered when building an index
    pub max_files: usize,
    /// Default number of semantic results
    pub top_k: usize,
    /// Default number of keyword results
    pub max_results: usize,
    /// Characters kept on each side of a keyword match
    pub snippet_context: usize,
    /// Eligible file extensions, lowercase and without the leading dot
    pub extensions: Vec<String>,
    /// Directory names skipped during traversal, in addition to hidden entries.
    /// Empty by default.
    pub ignored_dirs: Vec<String>,
    /// Embedding backend
    pub embedder: EmbedderKind,
    /// HuggingFace model repository
    pub model_id: String,
    /// Directory for cached model files
    pub models_dir: PathBuf,
    /// Texts per embedding call during a build
    pub embed_batch_size: usize,
    /// Number of repositories whose index stays resident
    pub cache_capacity: usize,
    /// Key cached indexes by file metadata as well as by path
    pub fingerprint_repos: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_files: 200,
            top_k: 10,
            max_results: 30,
            snippet_context: 200,
            extensions: crate::indexing::discovery::DEFAULT_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            ignored_dirs: Vec::new(),
            embedder: EmbedderKind::Bert,
            model_id: DEFAULT_MODEL_ID.to_string(),
            models_dir: Self::default_base_dir()
                .map(|base| base.join("models"))
                .unwrap_or_else(|_| PathBuf::from(".codeseek").join("models")),
            embed_batch_size: 64,
            cache_capacity: 1,
            fingerprint_repos: true,
        }
    }
}

impl Config {
    /// Get the default data directory
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
            .map(|home| home.join(".codeseek"))
    }

    /// Defaults with `CODESEEK_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("CODESEEK_MODEL") {
            config.model_id = model;
        }
        if let Some(dir) = lookup("CODESEEK_MODELS_DIR") {
            config.models_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup("CODESEEK_EMBEDDER") {
            config.embedder = kind.parse()?;
        }
        if lookup("CODESEEK_FAST_MODE").as_deref() == Some("1") {
            config.embedder = EmbedderKind::Disabled;
        }
        if let Some(v) = lookup("CODESEEK_CHUNK_SIZE") {
            config.chunk_size = parse_var("CODESEEK_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("CODESEEK_CHUNK_OVERLAP") {
            config.chunk_overlap = parse_var("CODESEEK_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("CODESEEK_MAX_FILES") {
            config.max_files = parse_var("CODESEEK_MAX_FILES", &v)?;
        }
        if let Some(list) = lookup("CODESEEK_IGNORED_DIRS") {
            config.ignored_dirs = list
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("CODESEEK_CACHE_CAPACITY") {
            config.cache_capacity = parse_var("CODESEEK_CACHE_CAPACITY", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail deep inside a build
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(Error::Validation(format!(
                "chunk_size must be positive and greater than chunk_overlap (got {} / {})",
                self.chunk_size, self.chunk_overlap
            )));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be at least 1".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Config("embed_batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_var(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.max_files, 200);
        assert_eq!(config.cache_capacity, 1);
        assert!(config.extensions.contains(&"py".to_string()));
        assert!(config.ignored_dirs.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ignored_dirs_opt_in() {
        let config = Config::from_lookup(lookup_from(&[("CODESEEK_IGNORED_DIRS", "node_modules, dist,")])).unwrap();
        assert_eq!(config.ignored_dirs, vec!["node_modules".to_string(), "dist".to_string()]);
    }

    #[test]
    fn test_fast_mode_disables_embedder() {
        let config = Config::from_lookup(lookup_from(&[("CODESEEK_FAST_MODE", "1")])).unwrap();
        assert_eq!(config.embedder, EmbedderKind::Disabled);
    }

    #[test]
    fn test_numeric_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CODESEEK_CHUNK_SIZE", "400"),
            ("CODESEEK_CHUNK_OVERLAP", "50"),
            ("CODESEEK_CACHE_CAPACITY", "4"),
        ]))
        .unwrap();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.cache_capacity, 4);
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let result = Config::from_lookup(lookup_from(&[("CODESEEK_MAX_FILES", "lots")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overlap_not_below_chunk_size_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("CODESEEK_CHUNK_SIZE", "100"),
            ("CODESEEK_CHUNK_OVERLAP", "100"),
        ]));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_embedder_kind_parse() {
        assert_eq!("BERT".parse::<EmbedderKind>().unwrap(), EmbedderKind::Bert);
        assert_eq!("off".parse::<EmbedderKind>().unwrap(), EmbedderKind::Disabled);
        assert!("word2vec".parse::<EmbedderKind>().is_err());
    }
}
