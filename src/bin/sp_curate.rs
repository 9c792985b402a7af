use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use signalp_curator::app::Curator;
use signalp_curator::catalog::JsonCatalogFile;
use signalp_curator::config::{ConfigLoader, ResolvedConfig};
use signalp_curator::domain::Label;
use signalp_curator::error::CurateError;
use signalp_curator::output::{JsonOutput, LogSink, OutputMode, TextOutput};
use signalp_curator::store::ArtifactStore;

#[derive(Parser)]
#[command(name = "sp-curate")]
#[command(about = "Curate signal-peptide datasets: extract, reduce redundancy, split and fold")]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Pipeline configuration (defaults to ./sp-curate.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Filter saved catalog search results into a labeled table and FASTA")]
    Extract(ExtractArgs),
    #[command(about = "Reduce clusters, split, assign folds and merge sequences")]
    Curate(DirArgs),
    #[command(about = "Recount the stage tables of a finished run")]
    Summarize(DirArgs),
}

#[derive(Args)]
struct ExtractArgs {
    #[arg(long)]
    catalog: Utf8PathBuf,

    #[arg(long, value_enum)]
    label: Label,

    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,
}

#[derive(Args)]
struct DirArgs {
    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CurateError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CurateError) -> u8 {
    match error {
        CurateError::MissingInput(_)
        | CurateError::ConfigRead(_)
        | CurateError::ConfigParse(_)
        | CurateError::InvalidSplit(_) => 2,
        CurateError::Integrity { .. }
        | CurateError::DuplicateAccession { .. }
        | CurateError::ConflictingCluster { .. }
        | CurateError::LabelMismatch { .. }
        | CurateError::MergeGap { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract(args) => run_extract(args, config, output_mode),
        Commands::Curate(args) => run_curate(args, config, output_mode),
        Commands::Summarize(args) => run_summarize(args, config, output_mode),
    }
}

fn run_extract(
    args: ExtractArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let curator = Curator::new(ArtifactStore::new(args.out_dir), config);
    let source = JsonCatalogFile::new(args.catalog);
    let result = curator.extract(&source, args.label, &LogSink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_extract(&result).into_diagnostic(),
        OutputMode::Text => TextOutput::print_extract(&result).into_diagnostic(),
    }
}

fn run_curate(args: DirArgs, config: ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let curator = Curator::new(ArtifactStore::new(args.out_dir), config);
    let result = curator.curate(&LogSink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_curate(&result).into_diagnostic(),
        OutputMode::Text => TextOutput::print_curate(&result).into_diagnostic(),
    }
}

fn run_summarize(
    args: DirArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let curator = Curator::new(ArtifactStore::new(args.out_dir), config);
    let report = curator.summarize()?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&report).into_diagnostic(),
        OutputMode::Text => TextOutput::print_summary(&report).into_diagnostic(),
    }
}
