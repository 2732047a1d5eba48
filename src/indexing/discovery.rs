use crate::core::config::Config;
use crate::core::error::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Source, markup and config extensions searched by default
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "md", "json", "yaml", "yml", "html", "css",
];

/// Dependency and build output directories, for callers that opt out of them.
/// Not skipped unless listed in `Config::ignored_dirs`.
pub const VENDORED_DIRS: &[&str] = &["node_modules", "__pycache__", "venv", "dist", "build"];

/// Enumerates the eligible text files of a repository
#[derive(Debug, Clone)]
pub struct FileCollector {
    extensions: Vec<String>,
    ignored_dirs: Vec<String>,
}

impl Default for FileCollector {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FileCollector {
    /// Create a collector with explicit allow/ignore lists
    pub fn new(extensions: Vec<String>, ignored_dirs: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            ignored_dirs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.extensions.clone(), config.ignored_dirs.clone())
    }

    /// Collect eligible files under `root` in traversal order.
    ///
    /// Hidden files and directories (names starting with `.`) are skipped, as
    /// are any configured ignored directories (none by default). Entries that
    /// cannot be read are left out; only a missing or non-directory root is an
    /// error.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::Validation(format!(
                "Directory does not exist: {}",
                root.display()
            )));
        }

        if !root.is_dir() {
            return Err(Error::Validation(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let ignored_dirs = self.ignored_dirs.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if name.starts_with('.') {
                    return false;
                }
                let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
                !(is_dir && ignored_dirs.iter().any(|d| *d == name))
            })
            .build();

        let mut files = Vec::new();
        for result in walker {
            match result {
                Ok(entry) => {
                    if !entry.file_type().map_or(false, |ft| ft.is_file()) {
                        continue;
                    }
                    if self.is_eligible(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(err) => {
                    tracing::debug!("skipping unreadable entry: {}", err);
                }
            }
        }

        Ok(files)
    }

    /// Check a path against the extension allow-list
    pub fn is_eligible(&self, path: &Path) -> bool {
        is_eligible_file(path, &self.extensions)
    }
}

/// Collect files with the default allow-list
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    FileCollector::default().collect(root)
}

/// Check if a file has one of the given extensions (case-insensitive)
pub fn is_eligible_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Read a file as text, replacing invalid UTF-8 instead of failing
pub fn read_text_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}
