use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commitment_consistency::{init_telemetry, EngineSettings, MeetingFailure, MeetingRecord};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "commitcheck")]
#[command(about = "Check meeting commitments for lifecycle contradictions")]
#[command(long_about = "commitcheck replays the commitment acts of annotated meeting transcripts \
                       (ASSIGN, CONFIRM, REVISE, CANCEL) and reports protocol violations together \
                       with per-meeting and batch contradiction rates.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more meeting files and print the analysis as JSON
    Analyze {
        /// Meeting JSON files, each holding one meeting or an array of meetings
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Configuration file to use instead of commitment-consistency.toml
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
        /// Disable the parallel worker pool
        #[arg(long, help = "Process commitments and meetings on a single thread")]
        sequential: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Configuration file to use instead of commitment-consistency.toml
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    EngineSettings::load_env_file()?;

    match cli.command {
        Commands::Analyze {
            files,
            config,
            sequential,
        } => analyze_command(&files, config.as_deref(), sequential),
        Commands::Config { config } => config_command(config.as_deref()),
    }
}

fn analyze_command(files: &[PathBuf], config: Option<&Path>, sequential: bool) -> Result<()> {
    let mut settings = EngineSettings::load(config).context("Failed to load configuration")?;
    if sequential {
        settings.engine.parallel = false;
    }
    init_telemetry(&settings.observability)?;

    let engine = settings.build_engine()?;

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    for path in files {
        read_meetings(path, &mut records, &mut rejected)?;
    }
    info!(
        files = files.len(),
        meetings = records.len(),
        malformed = rejected.len(),
        "Loaded meeting records"
    );

    let mut batch = engine.analyze_batch(records);
    batch.failures.extend(rejected);
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}

fn config_command(config: Option<&Path>) -> Result<()> {
    let settings = EngineSettings::load(config).context("Failed to load configuration")?;
    settings
        .engine_config()
        .context("Configuration is not usable")?;
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

/// Read a file holding one meeting or an array of meetings. A meeting that
/// does not match the record shape is reported as a failure on its own.
fn read_meetings(
    path: &Path,
    records: &mut Vec<MeetingRecord>,
    rejected: &mut Vec<MeetingFailure>,
) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse meeting file {}", path.display()))?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        single => vec![single],
    };
    for (idx, entry) in entries.into_iter().enumerate() {
        let meeting_id = entry
            .get("meeting_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}[{}]", path.display(), idx));

        match serde_json::from_value::<MeetingRecord>(entry) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(file = %path.display(), meeting_id = %meeting_id, error = %e, "Skipping malformed meeting");
                rejected.push(MeetingFailure {
                    meeting_id,
                    error: format!("Malformed meeting in {}: {}", path.display(), e),
                });
            }
        }
    }
    Ok(())
}
