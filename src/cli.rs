use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::{RUN_CHECKPOINT_INTERVAL, SCORE_CHECKPOINT_INTERVAL};

#[derive(Parser, Debug)]
#[command(
    name = "medbt",
    version,
    about = "Checkpointed back-translation evaluation of LLM medical translations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the documents found in the corpus.
    Docs(DocsArgs),
    /// Translate, back-translate and score every pending work item.
    Run(RunArgs),
    /// Run a single item without persisting anything.
    Probe(ProbeArgs),
    /// Compute metrics for existing results.
    Score(ScoreArgs),
    /// Summarize metrics by model, language and category.
    Aggregate(AggregateArgs),
    /// Reload one language's professional translations and re-score.
    Refresh(RefreshArgs),
    /// Select high-disagreement documents for human review.
    Review(ReviewArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    #[arg(long, default_value = "data/extracted_text")]
    pub data_root: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DocsArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[arg(long = "model")]
    pub models: Vec<String>,

    #[arg(long = "language")]
    pub languages: Vec<String>,

    #[arg(long, default_value_t = false)]
    pub no_resume: bool,

    #[arg(long, default_value_t = false)]
    pub retry_failed: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value_t = RUN_CHECKPOINT_INTERVAL)]
    pub checkpoint_interval: usize,

    /// Leave scoring to a later `score` invocation.
    #[arg(long, default_value_t = false)]
    pub no_score: bool,

    #[command(flatten)]
    pub pacing: PacingArgs,

    #[command(flatten)]
    pub scorer: ScorerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PacingArgs {
    /// Pause between dependent calls and between items.
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    #[arg(long, default_value_t = 2000)]
    pub retry_base_ms: u64,

    #[arg(long, default_value_t = 60_000)]
    pub retry_max_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ScorerArgs {
    /// Command line of a JSON-lines scorer process for neural metrics.
    #[arg(long)]
    pub scorer_command: Option<String>,

    /// Seconds to wait for each scorer reply before giving up on the process.
    #[arg(long, default_value_t = 600)]
    pub scorer_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Index into the `docs` listing.
    #[arg(long, default_value_t = 0)]
    pub doc: usize,

    #[arg(long, default_value = "gpt-5.1")]
    pub model: String,

    #[arg(long, default_value = "spanish")]
    pub language: String,

    #[arg(long, default_value_t = false)]
    pub score: bool,

    #[arg(long, default_value_t = 500)]
    pub excerpt_chars: usize,

    #[command(flatten)]
    pub pacing: PacingArgs,

    #[command(flatten)]
    pub scorer: ScorerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Results file to score; defaults to the run ledger.
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_resume: bool,

    #[arg(long, default_value_t = SCORE_CHECKPOINT_INTERVAL)]
    pub checkpoint_interval: usize,

    #[command(flatten)]
    pub scorer: ScorerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[arg(long)]
    pub metrics_path: Option<PathBuf>,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[arg(long)]
    pub language: String,

    /// Re-score every record of the language, not only changed ones.
    #[arg(long, default_value_t = false)]
    pub rescore_all: bool,

    #[command(flatten)]
    pub pacing: PacingArgs,

    #[command(flatten)]
    pub scorer: ScorerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[arg(long = "language", required = true)]
    pub languages: Vec<String>,

    #[arg(long, default_value = "cancer")]
    pub category: String,

    #[arg(long, default_value = "same_lang_comet")]
    pub metric: String,

    #[arg(long, default_value_t = 2)]
    pub count: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}
