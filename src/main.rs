use anyhow::Context;
use clap::Parser;
use codeseek::ui::cli::{Cli, Commands};
use codeseek::{BertEmbedder, Config, EmbedderKind, SearchEngine, SearchMode};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codeseek=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { model, models_dir } => handle_init(model, models_dir),
        Commands::Search {
            repo,
            query,
            mode,
            limit,
            json,
            fast,
        } => handle_search(Path::new(&repo), &query, mode, limit, json, fast),
        Commands::Files { repo } => handle_files(Path::new(&repo)),
    }
}

fn handle_init(model: Option<String>, models_dir: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(model) = model {
        config.model_id = model;
    }
    if let Some(dir) = models_dir {
        config.models_dir = PathBuf::from(dir);
    }

    println!("Preparing embedding model {}...", config.model_id);
    BertEmbedder::load(&config, true)
        .with_context(|| format!("could not load {}", config.model_id))?;
    println!("✓ Model cached in {}", BertEmbedder::model_dir(&config).display());
    Ok(())
}

fn handle_search(
    repo: &Path,
    query: &str,
    mode: SearchMode,
    limit: Option<usize>,
    json: bool,
    fast: bool,
) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if fast || mode == SearchMode::Keyword {
        config.embedder = EmbedderKind::Disabled;
    }

    let engine = SearchEngine::from_config(config)?;
    let outcome = engine
        .search_with_fallback(repo, query, mode, limit)
        .with_context(|| format!("search in {} failed", repo.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.fell_back {
        println!("Semantic search unavailable, showing keyword matches instead.");
    }

    if outcome.results.is_empty() {
        println!("No results found for \"{}\".", query);
        return Ok(());
    }

    let root = std::fs::canonicalize(repo).unwrap_or_else(|_| repo.to_path_buf());
    println!("Found {} {} results:", outcome.results.len(), outcome.mode);
    for (i, result) in outcome.results.iter().enumerate() {
        println!("\n{}. {}", i + 1, result.heading(&root));
        for line in result.snippet.lines() {
            println!("   {}", line);
        }
    }

    Ok(())
}

fn handle_files(repo: &Path) -> anyhow::Result<()> {
    let config = Config {
        embedder: EmbedderKind::Disabled,
        ..Config::from_env()?
    };
    let engine = SearchEngine::from_config(config)?;
    let files = engine.collect_files(repo)?;

    for file in &files {
        println!("{}", file.strip_prefix(repo).unwrap_or(file).display());
    }
    println!("\n{} eligible files", files.len());
    Ok(())
}
