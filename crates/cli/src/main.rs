use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use vault_suggest_pipeline::{
    scan_trigger, PipelineState, ReplayRetriever, SuggestConfig, SuggestionBatch,
    SuggestionPipeline, TriggerEvent,
};
use vault_suggest_protocol::{Candidate, PositionSpan};
use vault_suggest_search::{CachedCorpus, CandidateResolver};
use vault_suggest_sectioner::{
    extract_input_rows_with_limit, section_span, BoundaryPattern, InputRow, SectionSplitter,
};

use crate::vault::VaultCorpus;

mod vault;

const AUTH_TOKEN_ENV: &str = "VAULT_SUGGEST_AUTH_TOKEN";

#[derive(Parser)]
#[command(name = "vault-suggest")]
#[command(about = "Section-level link suggestions for a Markdown vault", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a note into sections
    Sections(SectionsArgs),

    /// Print embedding input rows for every note in the vault
    Input(VaultArgs),

    /// Resolve one candidate to a heading position
    Resolve(ResolveArgs),

    /// Resolve a JSON array of candidates
    #[command(name = "resolve-batch")]
    ResolveBatch(BatchArgs),

    /// Find the bracket trigger under the cursor
    Scan(ScanArgs),

    /// Run the debounced pipeline; every stdin line is a trigger
    Suggest(SuggestArgs),
}

#[derive(Args)]
struct SectionsArgs {
    /// Markdown file to split
    file: PathBuf,

    /// Boundary pattern overriding the configured one
    #[arg(long)]
    pattern: Option<String>,
}

#[derive(Args)]
struct VaultArgs {
    /// Vault root directory
    #[arg(long, default_value = ".")]
    vault: PathBuf,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    vault: VaultArgs,

    /// Document name, e.g. "Broadcast.md"
    #[arg(long)]
    name: String,

    /// Heading text to locate
    #[arg(long)]
    header: String,
}

#[derive(Args)]
struct BatchArgs {
    #[command(flatten)]
    vault: VaultArgs,

    /// JSON file holding an array of {"name", "header"} objects
    #[arg(long)]
    candidates: PathBuf,
}

#[derive(Args)]
struct ScanArgs {
    /// Current editor line
    #[arg(long)]
    line: String,

    /// Cursor column in characters
    #[arg(long)]
    cursor: usize,
}

#[derive(Args)]
struct SuggestArgs {
    #[command(flatten)]
    batch: BatchArgs,

    /// How stdin lines are treated
    #[arg(long, value_enum, default_value_t = SourceArg::Query)]
    source: SourceArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Query,
    Selection,
}

impl SourceArg {
    fn event(self, text: String) -> TriggerEvent {
        match self {
            Self::Query => TriggerEvent::query(text),
            Self::Selection => TriggerEvent::selection(text),
        }
    }
}

#[derive(Serialize)]
struct SectionOutput {
    text: String,
    start: usize,
    end: usize,
    span: PositionSpan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sections(args) => run_sections(args, &config)?,
        Commands::Input(args) => run_input(args, &config)?,
        Commands::Resolve(args) => run_resolve(args, &config).await?,
        Commands::ResolveBatch(args) => run_resolve_batch(args, &config).await?,
        Commands::Scan(args) => run_scan(args)?,
        Commands::Suggest(args) => run_suggest(args, &config).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SuggestConfig> {
    match path {
        Some(path) => SuggestConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(SuggestConfig::default()),
    }
}

fn build_resolver(
    vault: &Path,
    config: &SuggestConfig,
) -> Result<CandidateResolver<CachedCorpus<VaultCorpus>>> {
    let root = vault
        .canonicalize()
        .with_context(|| format!("Invalid vault path {}", vault.display()))?;
    let corpus = CachedCorpus::with_capacity(
        VaultCorpus::new(&root, &config.ignored_folders),
        config.cache_capacity,
    );
    Ok(CandidateResolver::new(corpus, config.splitter()?).with_min_match_run(config.min_match_run))
}

fn read_replay(path: &Path) -> Result<ReplayRetriever> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read candidates {}", path.display()))?;
    ReplayRetriever::from_json(&raw).context("Candidates must be a JSON array of {name, header}")
}

fn run_sections(args: SectionsArgs, config: &SuggestConfig) -> Result<()> {
    let splitter = match &args.pattern {
        Some(pattern) => SectionSplitter::new(BoundaryPattern::new(pattern)?),
        None => config.splitter()?,
    };
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut output = Vec::new();
    for section in splitter.split(&text) {
        let span = section_span(&text, &section)?;
        output.push(SectionOutput {
            text: section.text,
            start: section.start,
            end: section.end,
            span,
        });
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_input(args: VaultArgs, config: &SuggestConfig) -> Result<()> {
    let pattern = config.boundary_pattern()?;
    let limit = config.max_input_chars;
    let corpus = VaultCorpus::new(&args.vault, &config.ignored_folders);

    let mut rows: Vec<InputRow> = Vec::new();
    for entry in corpus.scan() {
        let text = match fs::read_to_string(&entry.absolute) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("Skipping {}: {err}", entry.document.path);
                continue;
            }
        };
        rows.extend(extract_input_rows_with_limit(
            &entry.document.name,
            &entry.mtime.to_string(),
            &text,
            &pattern,
            limit,
        ));
    }

    log::info!("Extracted {} input rows", rows.len());
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn run_resolve(args: ResolveArgs, config: &SuggestConfig) -> Result<()> {
    let resolver = build_resolver(&args.vault.vault, config)?;
    let suggestion = resolver
        .resolve(Candidate::new(args.name, args.header))
        .await;
    println!("{}", serde_json::to_string_pretty(&suggestion)?);
    Ok(())
}

async fn run_resolve_batch(args: BatchArgs, config: &SuggestConfig) -> Result<()> {
    let resolver = build_resolver(&args.vault.vault, config)?;
    let candidates = read_replay(&args.candidates)?.into_candidates();
    let suggestions = resolver.resolve_all(candidates).await;
    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let span = scan_trigger(&args.line, args.cursor);
    println!("{}", serde_json::to_string_pretty(&span)?);
    Ok(())
}

async fn run_suggest(args: SuggestArgs, config: &SuggestConfig) -> Result<()> {
    let resolver = build_resolver(&args.batch.vault.vault, config)?;
    let retriever = read_replay(&args.batch.candidates)?;
    let auth_token = env::var(AUTH_TOKEN_ENV).unwrap_or_default();

    let pipeline = SuggestionPipeline::start(
        Arc::new(retriever),
        Arc::new(resolver),
        auth_token,
        config.pipeline_config(),
    );
    let mut batches = pipeline.subscribe();
    let mut status = pipeline.status_stream();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut submitted = 0u64;
    let mut eof = false;

    while !eof {
        tokio::select! {
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => {
                    pipeline.submit(args.source.event(line)).await?;
                    submitted += 1;
                }
                None => eof = true,
            },
            Ok(batch) = batches.recv() => print_batch(&batch)?,
        }
    }

    status
        .wait_for(|s| s.triggers >= submitted && s.state == PipelineState::Idle)
        .await
        .context("Suggestion pipeline stopped early")?;
    while let Ok(batch) = batches.try_recv() {
        print_batch(&batch)?;
    }

    pipeline.shutdown().await;
    Ok(())
}

fn print_batch(batch: &SuggestionBatch) -> Result<()> {
    println!("{}", serde_json::to_string(batch)?);
    Ok(())
}
