use docseek::cli::{Cli, Commands, ConfigAction};
use docseek::config::{Config, ConfigValidator};
use docseek::error::{DocseekError, Result};
use docseek::indexing::{BatchStats, DocumentIndexer};
use docseek::retrieval::HybridSearcher;
use docseek::storage::StorageLayout;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Index {
            paths,
            full,
            incremental,
            concurrency,
        } => {
            cmd_index(cli.config, paths, full, incremental, concurrency)?;
        }
        Commands::Search {
            query,
            limit,
            staged,
            json,
        } => {
            cmd_search(cli.config, &query, limit, staged, json)?;
        }
        Commands::Remove { path } => {
            cmd_remove(cli.config, &path)?;
        }
        Commands::Stats { json } => {
            cmd_stats(cli.config, json)?;
        }
        Commands::Compact => {
            cmd_compact(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "docseek=debug" } else { "docseek=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_index(
    config_path: Option<PathBuf>,
    paths: Vec<PathBuf>,
    full: bool,
    incremental: bool,
    concurrency: usize,
) -> Result<()> {
    let config = load_config(config_path)?;
    let indexer = Arc::new(DocumentIndexer::open(&config)?);

    let stats = if full {
        indexer.full_reindex()?
    } else if incremental {
        indexer.incremental_index()?
    } else if paths.is_empty() {
        println!("Specify --full, --incremental, or one or more paths to index.");
        return Ok(());
    } else {
        let mut files = Vec::new();
        for path in &paths {
            if path.is_dir() {
                files.extend(indexer.collect_files(path)?);
            } else {
                files.push(path.clone());
            }
        }

        if concurrency > 1 {
            let runtime = tokio::runtime::Runtime::new()
                .map_err(|e| DocseekError::io(e, "Failed to start async runtime"))?;
            runtime.block_on(indexer.index_paths_concurrent(files, concurrency))?
        } else {
            indexer.index_paths(&files)?
        }
    };

    print_batch(&stats);
    Ok(())
}

fn print_batch(stats: &BatchStats) {
    println!("✓ Indexing complete");
    println!("  Processed: {}", stats.processed);
    println!("  Indexed:   {}", stats.indexed);
    println!("  Errors:    {}", stats.errors);
}

fn cmd_search(
    config_path: Option<PathBuf>,
    query: &str,
    limit: Option<usize>,
    staged: Vec<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let indexer = Arc::new(DocumentIndexer::open(&config)?);
    let searcher = HybridSearcher::new(&config, indexer);
    searcher.set_staged_paths(staged)?;

    let results = searcher.search(query, limit.unwrap_or(config.search.max_results))?;

    if json {
        let out = serde_json::to_string_pretty(&results).map_err(|e| DocseekError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {} [{:.3}, {}]",
            rank + 1,
            result.name,
            result.score,
            result.source.label()
        );
        println!("    {}", result.path);
        if let Some(preview) = &result.preview {
            println!("    {}", preview.replace('\n', " "));
        }
    }

    Ok(())
}

fn cmd_remove(config_path: Option<PathBuf>, path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let indexer = DocumentIndexer::open(&config)?;

    if indexer.remove_file_from_index(path)? {
        println!("✓ Removed {}", path.display());
        println!(
            "  {} orphaned vector slots; run 'docseek compact' to reclaim them",
            indexer.orphaned_slots()?
        );
    } else {
        println!("{} is not indexed", path.display());
    }
    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let indexer = DocumentIndexer::open(&config)?;
    let stats = indexer.get_stats()?;

    if json {
        let out = serde_json::to_string_pretty(&stats).map_err(|e| DocseekError::Json {
            source: e,
            context: "Failed to serialize stats".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    let layout = StorageLayout::new(config.storage.data_dir.clone())?;

    println!("Docseek Index");
    println!("=============");
    println!("\nDocuments:      {}", stats.total_documents);
    println!("Chunks:         {}", stats.total_chunks);
    println!("Vectors:        {}", stats.vector_count);
    println!("Orphaned slots: {}", stats.orphaned_slots);
    println!("Vector index:   {:.2} MB", stats.index_size_mb);
    println!(
        "Data directory: {} ({})",
        layout.base_path().display(),
        StorageLayout::format_size(layout.total_size()?)
    );
    Ok(())
}

fn cmd_compact(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let indexer = DocumentIndexer::open(&config)?;

    let reclaimed = indexer.compact()?;
    println!("✓ Compacted vector index ({} slots reclaimed)", reclaimed);
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let value = config_value(&config)?;
            let shown = match &section {
                Some(section) => value.get(section).ok_or_else(|| {
                    DocseekError::Config(format!("Unknown config section: {}", section))
                })?,
                None => &value,
            };
            println!("{}", to_pretty_json(shown)?);
        }
        ConfigAction::Get { key } => {
            let config = load_config(config_path)?;
            let value = config_value(&config)?;
            let pointer = format!("/{}", key.replace('.', "/"));
            let found = value
                .pointer(&pointer)
                .ok_or_else(|| DocseekError::Config(format!("Unknown config key: {}", key)))?;
            println!("{}", to_pretty_json(found)?);
        }
        ConfigAction::Set { key, value } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            };
            let mut updated = set_config_key(&config, &key, &value)?;
            updated.meta.last_modified = chrono::Utc::now().to_rfc3339();
            ConfigValidator::validate(&updated)?;
            updated.save(&path)?;
            println!("✓ Set {} = {}", key, value);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn config_value(config: &Config) -> Result<serde_json::Value> {
    serde_json::to_value(config).map_err(|e| DocseekError::Json {
        source: e,
        context: "Failed to serialize config".to_string(),
    })
}

fn to_pretty_json(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| DocseekError::Json {
        source: e,
        context: "Failed to serialize config".to_string(),
    })
}

/// Replace one dotted key, keeping the value's existing type
fn set_config_key(config: &Config, key: &str, raw: &str) -> Result<Config> {
    let mut value = config_value(config)?;
    let pointer = format!("/{}", key.replace('.', "/"));
    let slot = value
        .pointer_mut(&pointer)
        .ok_or_else(|| DocseekError::Config(format!("Unknown config key: {}", key)))?;

    let invalid = |message: &str| DocseekError::InvalidConfigValue {
        path: key.to_string(),
        message: message.to_string(),
    };

    *slot = match &*slot {
        serde_json::Value::Bool(_) => serde_json::Value::Bool(
            raw.parse()
                .map_err(|_| invalid("expected true or false"))?,
        ),
        serde_json::Value::Number(n) if n.is_u64() => serde_json::Value::from(
            raw.parse::<u64>()
                .map_err(|_| invalid("expected a non-negative integer"))?,
        ),
        serde_json::Value::Number(_) => serde_json::Value::from(
            raw.parse::<f64>().map_err(|_| invalid("expected a number"))?,
        ),
        serde_json::Value::Array(_) => serde_json::Value::from(
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>(),
        ),
        _ => serde_json::Value::String(raw.to_string()),
    };

    serde_json::from_value(value).map_err(|e| DocseekError::Json {
        source: e,
        context: format!("Invalid value for {}", key),
    })
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = if path.exists() {
        Config::load(&path)?
    } else {
        tracing::warn!(
            "Config file not found, using defaults. Run 'docseek config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        config
    };

    config.storage.data_dir = expand_path(&config.storage.data_dir)?;
    config.scan.paths = config
        .scan
        .paths
        .iter()
        .map(|p| expand_path(p))
        .collect::<Result<_>>()?;

    Ok(config)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| DocseekError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| DocseekError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
