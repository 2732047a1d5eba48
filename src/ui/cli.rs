use crate::search::result::SearchMode;
use clap::{Parser, Subcommand};

/// codeseek - Semantic and keyword search over a code repository
#[derive(Parser, Debug)]
#[command(name = "codeseek")]
#[command(about = "Search a cloned repository by meaning or by substring", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the embedding model so later searches work offline
    Init {
        /// HuggingFace model id (default: sentence-transformers/all-MiniLM-L6-v2)
        #[arg(long)]
        model: Option<String>,
        /// Directory for cached models (default: ~/.codeseek/models)
        #[arg(long)]
        models_dir: Option<String>,
    },
    /// Search a repository
    Search {
        /// Path to the repository root
        repo: String,
        /// Search query
        query: String,
        /// Search strategy
        #[arg(short, long, value_enum, default_value_t = SearchMode::Semantic)]
        mode: SearchMode,
        /// Maximum number of results (default: 10 semantic, 30 keyword)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Skip loading the embedding model
        #[arg(long)]
        fast: bool,
    },
    /// List the files a search would look at
    Files {
        /// Path to the repository root
        repo: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::parse_from(["codeseek", "search", "/repo", "login flow"]);
        match cli.command {
            Commands::Search {
                repo,
                query,
                mode,
                limit,
                json,
                fast,
            } => {
                assert_eq!(repo, "/repo");
                assert_eq!(query, "login flow");
                assert_eq!(mode, SearchMode::Semantic);
                assert_eq!(limit, None);
                assert!(!json && !fast);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_keyword_mode() {
        let cli = Cli::parse_from(["codeseek", "search", ".", "TODO", "--mode", "keyword", "-l", "5"]);
        assert!(matches!(
            cli.command,
            Commands::Search {
                mode: SearchMode::Keyword,
                limit: Some(5),
                ..
            }
        ));
    }
}
