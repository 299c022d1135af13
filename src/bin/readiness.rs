//! Readiness CLI - Command-line interface for Synheart Readiness
//!
//! Commands:
//! - score: Compute the daily readiness report for a date
//! - baseline: Recompute (and optionally persist) the rolling baseline
//! - directive: Print the directive for a recovery/sleep score pair

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

use synheart_readiness::sources::{
    BaselineStore, HistoryDocument, InMemoryBaselineStore, InMemoryHealthData,
    JsonFileBaselineStore,
};
use synheart_readiness::{
    Directive, ReadinessProcessor, ScoreError, ScoringConfig, PRODUCER_NAME, READINESS_VERSION,
};

/// Readiness - Daily recovery and sleep scores from wearable biomarkers
#[derive(Parser)]
#[command(name = "readiness")]
#[command(author = "Synheart AI Inc")]
#[command(version = READINESS_VERSION)]
#[command(about = "Score daily recovery and sleep against personal baselines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the readiness report for one date
    Score {
        /// History document path (use - for stdin)
        #[arg(long)]
        history: PathBuf,

        /// Date to score (YYYY-MM-DD); defaults to the local date at the history's reference time
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Baseline file, read before and written after refreshing
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Minutes the user's local day is offset from UTC (overrides the history)
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,

        /// Scoring configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Recompute the baseline from history and print it
    Baseline {
        /// History document path (use - for stdin)
        #[arg(long)]
        history: PathBuf,

        /// Baseline file to persist the result to
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Minutes the user's local day is offset from UTC (overrides the history)
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,

        /// Scoring configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the directive for a recovery and sleep score
    Directive {
        /// Recovery score (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        recovery: u8,

        /// Sleep score (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        sleep: u8,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays a clean JSON document
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "synheart_readiness=info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<(), ReadinessCliError> {
    match cli.command {
        Commands::Score {
            history,
            date,
            baseline,
            utc_offset_minutes,
            config,
            pretty,
        } => {
            let source = HistorySource::new(&history, baseline.as_deref(), utc_offset_minutes);
            cmd_score(source, date, config.as_deref(), pretty).await
        }

        Commands::Baseline {
            history,
            baseline,
            utc_offset_minutes,
            config,
        } => {
            let source = HistorySource::new(&history, baseline.as_deref(), utc_offset_minutes);
            cmd_baseline(source, config.as_deref()).await
        }

        Commands::Directive {
            recovery,
            sleep,
            json,
        } => cmd_directive(recovery, sleep, json),
    }
}

async fn cmd_score(
    source: HistorySource<'_>,
    date: Option<NaiveDate>,
    config: Option<&Path>,
    pretty: bool,
) -> Result<(), ReadinessCliError> {
    let (processor, now, today) = build_processor(source, config)?;
    let date = date.unwrap_or(today);
    debug!(%date, %now, "scoring");

    processor.load().await;
    let report = processor.daily_report_at(date, now).await?;

    if pretty {
        println!("{}", report.to_json_pretty()?);
    } else {
        println!("{}", report.to_json()?);
    }
    Ok(())
}

async fn cmd_baseline(
    source: HistorySource<'_>,
    config: Option<&Path>,
) -> Result<(), ReadinessCliError> {
    let (processor, now, _) = build_processor(source, config)?;

    processor.load().await;
    let refreshed = processor.engine().refresh_at(now).await;

    println!("{}", serde_json::to_string_pretty(&refreshed)?);
    Ok(())
}

fn cmd_directive(recovery: u8, sleep: u8, json: bool) -> Result<(), ReadinessCliError> {
    let directive = Directive::from_scores(recovery, sleep);

    if json {
        let output = DirectiveOutput {
            recovery_score: recovery,
            sleep_score: sleep,
            directive,
            message: directive.message().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", directive.message());
    }
    Ok(())
}

/// Where a command reads history from and persists the baseline to
struct HistorySource<'a> {
    history: &'a Path,
    baseline: Option<&'a Path>,
    utc_offset_minutes: Option<i32>,
}

impl<'a> HistorySource<'a> {
    fn new(history: &'a Path, baseline: Option<&'a Path>, utc_offset_minutes: Option<i32>) -> Self {
        Self {
            history,
            baseline,
            utc_offset_minutes,
        }
    }
}

/// Wire a processor to the history document and optional baseline file.
///
/// Returns the processor along with "now" (the history's reference time when
/// it has one, otherwise the wall clock) and the user's local date at "now".
fn build_processor(
    source: HistorySource<'_>,
    config: Option<&Path>,
) -> Result<(ReadinessProcessor, DateTime<Utc>, NaiveDate), ReadinessCliError> {
    let config = match config {
        Some(path) => ScoringConfig::from_file(path)?,
        None => ScoringConfig::default(),
    };

    let mut document: HistoryDocument = serde_json::from_str(&read_input(source.history)?)?;
    if document.samples.is_empty() && document.sleep.is_empty() {
        return Err(ReadinessCliError::EmptyHistory);
    }
    if let Some(minutes) = source.utc_offset_minutes {
        document.utc_offset_minutes = minutes;
    }
    let now = document.reference_time.unwrap_or_else(Utc::now);
    let provider = Arc::new(InMemoryHealthData::from_document(document));
    let today = provider.local_date(now);

    let store: Arc<dyn BaselineStore> = match source.baseline {
        Some(path) => Arc::new(JsonFileBaselineStore::new(path)),
        None => Arc::new(InMemoryBaselineStore::new()),
    };

    let processor = ReadinessProcessor::new(provider, store, config)?;
    Ok((processor, now, today))
}

fn read_input(path: &Path) -> Result<String, ReadinessCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(ReadinessCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

#[derive(serde::Serialize)]
struct DirectiveOutput {
    recovery_score: u8,
    sleep_score: u8,
    directive: Directive,
    message: String,
}

// Error types

#[derive(Debug)]
enum ReadinessCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Score(ScoreError),
    NoInput,
    EmptyHistory,
}

impl From<io::Error> for ReadinessCliError {
    fn from(e: io::Error) -> Self {
        ReadinessCliError::Io(e)
    }
}

impl From<serde_json::Error> for ReadinessCliError {
    fn from(e: serde_json::Error) -> Self {
        ReadinessCliError::Json(e)
    }
}

impl From<ScoreError> for ReadinessCliError {
    fn from(e: ScoreError) -> Self {
        ReadinessCliError::Score(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
    producer: String,
}

impl CliError {
    fn new(code: &str, message: String, hint: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
            producer: PRODUCER_NAME.to_string(),
        }
    }
}

impl From<ReadinessCliError> for CliError {
    fn from(e: ReadinessCliError) -> Self {
        match e {
            ReadinessCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), Some("Check file paths and permissions"))
            }
            ReadinessCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), Some("Check JSON syntax"))
            }
            ReadinessCliError::NoInput => CliError::new(
                "NO_INPUT",
                "stdin is a terminal, expected a piped history document".to_string(),
                Some("Pipe a history file or pass --history <path>"),
            ),
            ReadinessCliError::EmptyHistory => CliError::new(
                "EMPTY_HISTORY",
                "History contains no samples or sleep sessions".to_string(),
                Some("Ensure the history document has 'samples' or 'sleep' entries"),
            ),
            ReadinessCliError::Score(e) => {
                let (code, hint) = match &e {
                    ScoreError::DataUnavailable { .. } => (
                        "DATA_UNAVAILABLE",
                        Some("Check that the history covers the requested date"),
                    ),
                    ScoreError::InsufficientHistory(_) => (
                        "INSUFFICIENT_HISTORY",
                        Some("Add more history or disable strict_calibration"),
                    ),
                    ScoreError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", Some("Window and refresh values must be non-zero"))
                    }
                    ScoreError::StoreFailure(_) => {
                        ("STORE_FAILURE", Some("Check the baseline file path and contents"))
                    }
                    ScoreError::Provider(_) => ("PROVIDER_ERROR", None),
                    ScoreError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax")),
                    ScoreError::IoError(_) => {
                        ("IO_ERROR", Some("Check file paths and permissions"))
                    }
                };
                CliError::new(code, e.to_string(), hint)
            }
        }
    }
}
