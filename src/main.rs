use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use taskmatch::config::{data_dir, load_config};
use taskmatch::task::load_tasks;
use taskmatch::{
    expand_with_synonyms, fuzzy_score, get_synonyms, levenshtein_distance, strip_extracted_terms, ClassifierKind,
    MatchConfig, MatchEngine,
};

/// taskmatch - find similar and duplicate tasks
#[derive(Parser)]
#[command(name = "taskmatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fuzzy matching and duplicate detection for task lists", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to .taskmatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Classifier override: mock or keyword
    #[arg(long, global = true)]
    classifier: Option<ClassifierKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two texts
    Compare {
        a: String,
        b: String,
    },

    /// Find tasks with a title similar to the given one
    Similar {
        /// JSON file with an array of tasks
        #[arg(long)]
        tasks: PathBuf,
        /// Title to match against
        #[arg(long)]
        title: String,
        /// Minimum similarity (defaults to config)
        #[arg(long)]
        threshold: Option<f64>,
        /// Also run the edit-distance pass
        #[arg(long)]
        fuzzy: bool,
        #[arg(long)]
        json: bool,
    },

    /// Group near-duplicate tasks
    Dedup {
        /// JSON file with an array of tasks
        #[arg(long)]
        tasks: PathBuf,
        /// Minimum similarity (defaults to config)
        #[arg(long)]
        threshold: Option<f64>,
        /// Show at most this many groups
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Extract search filters from a free-text query
    Filters {
        query: String,
        #[arg(long)]
        json: bool,
    },

    /// Expand a query with synonyms
    Expand {
        query: String,
    },

    /// List synonyms for a word
    Synonyms {
        word: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)  // Keep stdout clean for --json
        .init();

    let config = resolve_config(cli.config.as_deref(), cli.classifier)?;
    debug!("Using classifier {:?}", config.classifier);

    match cli.command {
        Commands::Compare { a, b } => {
            let engine = MatchEngine::new(config);
            let similarity = engine.get_similarity(&a, &b).await?;
            println!("Similarity:    {:.3}", similarity);
            println!("Fuzzy score:   {:.3}", fuzzy_score(&a, &b));
            println!("Edit distance: {}", levenshtein_distance(&a.to_lowercase(), &b.to_lowercase()));
        }
        Commands::Similar { tasks, title, threshold, fuzzy, json } => {
            let threshold = threshold.unwrap_or(config.similar_threshold);
            let tasks = read_tasks(&tasks)?;
            let engine = MatchEngine::new(config);

            let similar = engine.find_similar_tasks(&tasks, &title, threshold, fuzzy).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&similar)?);
            } else if similar.is_empty() {
                println!("No tasks similar to \"{}\" (threshold {:.2})", title, threshold);
            } else {
                for task in &similar {
                    println!("{:>5.1}%  [{}] {}", task.similarity * 100.0, task.id, task.title);
                }
            }
        }
        Commands::Dedup { tasks, threshold, limit, json } => {
            let threshold = threshold.unwrap_or(config.duplicate_threshold);
            let tasks = read_tasks(&tasks)?;
            let engine = MatchEngine::new(config);

            info!("Checking {} tasks for duplicates", tasks.len());
            let mut groups = engine.find_duplicate_groups(&tasks, threshold).await?;
            groups.sort_by(|a, b| {
                b.max_similarity
                    .partial_cmp(&a.max_similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if let Some(limit) = limit {
                groups.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No duplicate groups found (threshold {:.2})", threshold);
            } else {
                for (n, group) in groups.iter().enumerate() {
                    println!("Group {} (max similarity {:.1}%)", n + 1, group.max_similarity * 100.0);
                    for task in &group.tasks {
                        println!("   [{}] {}", task.id, task.title);
                    }
                }
            }
        }
        Commands::Filters { query, json } => {
            let engine = MatchEngine::new(config);
            let filters = engine.extract_search_filters(&query).await?;
            let cleaned = strip_extracted_terms(&filters);

            if json {
                let mut value = serde_json::to_value(&filters)?;
                value["cleanedQuery"] = serde_json::Value::String(cleaned);
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Query:     {}", cleaned);
                if let Some(status) = &filters.status {
                    println!("Status:    {}", status);
                }
                if let Some(readiness) = &filters.readiness {
                    println!("Readiness: {}", readiness);
                }
                if let Some(priority) = &filters.priority {
                    println!("Priority:  {}", priority);
                }
                if !filters.tags.is_empty() {
                    println!("Tags:      {}", filters.tags.join(", "));
                }
                if !filters.action_types.is_empty() {
                    println!("Actions:   {}", filters.action_types.join(", "));
                }
            }
        }
        Commands::Expand { query } => {
            println!("{}", expand_with_synonyms(&query).join(" "));
        }
        Commands::Synonyms { word } => {
            let synonyms = get_synonyms(&word);
            if synonyms.is_empty() {
                println!("No synonyms for \"{}\"", word);
            } else {
                println!("{}", synonyms.join(", "));
            }
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&Path>, classifier: Option<ClassifierKind>) -> Result<MatchConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => data_dir()?.join("config.toml"),
    };

    let mut config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;
    if let Some(kind) = classifier {
        config.classifier = kind;
    }
    Ok(config)
}

fn read_tasks(path: &Path) -> Result<Vec<taskmatch::Task>> {
    load_tasks(path).with_context(|| format!("reading tasks from {}", path.display()))
}
