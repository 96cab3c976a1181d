use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tcode_catalog::CsvSource;
use tcode_search::{Query, SearchOutcome, SearchProfile, TransactionFinder};
use tcode_vector_store::{
    default_cache_dir, model_dir, Embedder, EmbeddingCache, EmbeddingMode, EmbeddingModel,
    DEFAULT_MODEL_ID,
};

mod render;

#[derive(Parser)]
#[command(name = "tcode-finder")]
#[command(about = "Find the transaction code for what you want to do", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Override embedding backend (TCODE_EMBEDDING_MODE)
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Override embedding model id (TCODE_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Model assets directory (overrides TCODE_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Phrase-vector cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Do not read or write cached phrase vectors
    #[arg(long, global = true)]
    no_cache: bool,

    /// Bundled search profile (general|strict; TCODE_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// JSON/TOML profile layered over `general`
    #[arg(long, global = true)]
    profile_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one query against a transaction table
    Search(SearchArgs),

    /// Load a table once and answer queries read from stdin
    Repl(ReplArgs),

    /// Show how a table was loaded
    Inspect(InspectArgs),
}

#[derive(Args)]
struct TableArgs {
    /// CSV file with the transaction table
    #[arg(long)]
    table: PathBuf,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    table: TableArgs,

    /// What you want to do, in plain words
    query: String,

    /// Only return codes whose group carries this tag (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReplArgs {
    #[command(flatten)]
    table: TableArgs,

    /// Category tag applied to every query (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Output one JSON object per query
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    table: TableArgs,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedMode {
    Fast,
    Stub,
}

impl EmbedMode {
    const fn as_domain(self) -> EmbeddingMode {
        match self {
            Self::Fast => EmbeddingMode::Fast,
            Self::Stub => EmbeddingMode::Stub,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers.
    let json_output = match &cli.command {
        Commands::Search(args) => args.json,
        Commands::Repl(args) => args.json,
        Commands::Inspect(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ORT is extremely noisy
    if !cli.verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();

    let profile = load_profile(&cli)?;
    let embedder = load_embedder(&cli)?;
    let mut finder = TransactionFinder::new(&profile, embedder);
    if !cli.no_cache {
        let dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
        finder = finder.with_cache(EmbeddingCache::new(dir));
    }

    match cli.command {
        Commands::Search(args) => run_search(&finder, args).await,
        Commands::Repl(args) => run_repl(&finder, args).await,
        Commands::Inspect(args) => run_inspect(&finder, &profile, args).await,
    }
}

fn load_profile(cli: &Cli) -> Result<SearchProfile> {
    let name = cli
        .profile
        .clone()
        .or_else(|| env::var("TCODE_PROFILE").ok())
        .unwrap_or_else(|| "general".to_string());

    let profile = match &cli.profile_file {
        Some(path) => SearchProfile::from_file(&name, path)
            .with_context(|| format!("Failed to load profile from {}", path.display()))?,
        None => SearchProfile::builtin(&name)?,
    };
    log::debug!("Using search profile '{}'", profile.name());
    Ok(profile)
}

fn load_embedder(cli: &Cli) -> Result<Arc<dyn Embedder>> {
    let mode = match cli.embed_mode {
        Some(mode) => mode.as_domain(),
        None => EmbeddingMode::from_env()?,
    };
    let model_id = cli
        .embed_model
        .clone()
        .or_else(|| env::var("TCODE_EMBEDDING_MODEL").ok())
        .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
    let dir = cli.model_dir.clone().unwrap_or_else(model_dir);

    let model = EmbeddingModel::new(mode, &model_id, &dir).with_context(|| {
        format!(
            "Failed to initialise {} embedding model '{model_id}'",
            mode.as_str()
        )
    })?;
    Ok(Arc::new(model))
}

fn table_source(args: &TableArgs) -> Result<CsvSource> {
    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("Delimiter {:?} must be a single ASCII character", args.delimiter))?;
    Ok(CsvSource::new(&args.table).with_delimiter(delimiter))
}

/// Loads the table; a missing table is reported and leaves the finder
/// without data rather than failing the command.
async fn load_table(finder: &TransactionFinder, args: &TableArgs) -> Result<()> {
    let source = table_source(args)?;
    if let Err(err) = finder.load_source(&source).await {
        eprintln!("Transaction table unavailable: {err}");
    }
    Ok(())
}

async fn run_search(finder: &TransactionFinder, args: SearchArgs) -> Result<()> {
    load_table(finder, &args.table).await?;

    let query = Query {
        text: args.query,
        categories: args.categories,
    };
    let outcome = finder.search(&query).await?;
    print_outcome(&outcome, args.json)
}

async fn run_repl(finder: &TransactionFinder, args: ReplArgs) -> Result<()> {
    load_table(finder, &args.table).await?;

    let stdin = io::stdin();
    loop {
        if !args.json {
            eprint!("> ");
            io::stderr().flush()?;
        }
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }

        let query = Query {
            text: text.to_string(),
            categories: args.categories.clone(),
        };
        match finder.search(&query).await {
            Ok(outcome) => print_outcome(&outcome, args.json)?,
            Err(err) => eprintln!("Error: {err}"),
        }
    }
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
    } else {
        print!("{}", render::outcome_table(outcome));
    }
    Ok(())
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    table: &'a Path,
    profile: &'a str,
    model: String,
    fingerprint: String,
    phrases: usize,
    #[serde(flatten)]
    report: &'a tcode_catalog::LoadReport,
}

async fn run_inspect(
    finder: &TransactionFinder,
    profile: &SearchProfile,
    args: InspectArgs,
) -> Result<()> {
    let source = table_source(&args.table)?;
    finder
        .load_source(&source)
        .await
        .with_context(|| format!("Failed to load {}", args.table.table.display()))?;
    let snapshot = finder
        .snapshot()
        .context("Table loaded but no snapshot was published")?;

    let output = InspectOutput {
        table: &args.table.table,
        profile: profile.name(),
        model: snapshot.model_id().to_string(),
        fingerprint: snapshot.fingerprint().to_string(),
        phrases: snapshot.phrases().len(),
        report: snapshot.report(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render::inspect_summary(&output));
    }
    Ok(())
}
