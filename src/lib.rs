pub mod cli;
pub mod config;
pub mod input;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod storage;

use anyhow::Context;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use cli::{ColorMode, Commands, cli_parse};
pub use input::InputStream;
pub use parser::{Address, DecodeError, FieldValue, ParseSummary, Record, RecordCodec, Schema};
pub use pipeline::{BatchFilter, FilterSummary};
pub use query::{CompileError, CompiledQuery, EvalError};
pub use report::ErrorChannel;

/// Exit status for a query that fails to compile
const EXIT_COMPILE_ERROR: u8 = 2;

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };

    let filter =
        EnvFilter::try_from_env("ELB_LOGS_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when embedded; keep that one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn apply_color_mode(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    };
    colored::control::set_override(enabled);
}

fn open_input(path: &Path) -> anyhow::Result<InputStream> {
    InputStream::open(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

fn run_parse<W: Write, E: Write>(
    files: &[PathBuf],
    out: &mut W,
    errors: &mut ErrorChannel<E>,
) -> anyhow::Result<ParseSummary> {
    let codec = RecordCodec::default();
    let mut summary = ParseSummary::default();

    for file in files {
        let input = open_input(file)?;
        summary += codec
            .parse_stream(input, out, errors)
            .with_context(|| format!("Failed while parsing '{}'", file.display()))?;
    }

    Ok(summary)
}

fn run_filter<W: Write, E: Write>(
    filter: &BatchFilter,
    files: &[PathBuf],
    out: &mut W,
    errors: &mut ErrorChannel<E>,
) -> anyhow::Result<FilterSummary> {
    let mut summary = FilterSummary::default();

    if files.is_empty() {
        summary += filter
            .filter_stream(InputStream::stdin(), out, errors)
            .context("Failed while filtering stdin")?;
    }

    for file in files {
        let input = open_input(file)?;
        summary += filter
            .filter_stream(input, out, errors)
            .with_context(|| format!("Failed while filtering '{}'", file.display()))?;
    }

    Ok(summary)
}

pub fn run() -> anyhow::Result<ExitCode> {
    let cli = cli_parse();
    init_tracing(cli.verbose, cli.quiet);
    apply_color_mode(cli.color);

    let config = config::load_config(cli.config.as_deref()).context("Failed to load config")?;
    let mut out = BufWriter::new(io::stdout().lock());
    let mut errors = ErrorChannel::new(io::stderr().lock());

    match cli.command {
        Commands::Parse { files } => {
            let summary = run_parse(&files, &mut out, &mut errors)?;
            out.flush().context("Failed to flush output")?;
            info!(
                records = summary.records,
                errors = summary.errors,
                "parse finished"
            );
        }
        Commands::Filter {
            expression,
            batch_size,
            files,
        } => {
            let batch_size = config.batch_size(batch_size)?;
            let filter = match BatchFilter::compile(&expression, batch_size) {
                Ok(filter) => filter,
                Err(e) => {
                    errors.report(
                        format_args!("invalid query expression: {e}"),
                        Some(expression.as_str()),
                    )?;
                    return Ok(ExitCode::from(EXIT_COMPILE_ERROR));
                }
            };

            info!(expression = %filter.query(), batch_size = batch_size.get(), "filter starting");
            let summary = run_filter(&filter, &files, &mut out, &mut errors)?;
            out.flush().context("Failed to flush output")?;
            info!(
                batches = summary.batches,
                records = summary.records,
                emitted = summary.emitted,
                parse_errors = summary.parse_errors,
                eval_errors = summary.eval_errors,
                "filter finished"
            );
        }
        Commands::Prefix {
            account,
            region,
            elb,
            time_prefix,
            bucket,
            output_dir,
            mirror,
        } => {
            let region = region
                .or(config.storage.region)
                .context("--region is required to build the key prefix")?;
            let time = storage::TimePrefix::parse(&time_prefix)?;
            let prefix = storage::LogPrefix::new(account, region, elb, time);
            let key_prefix = prefix.key_prefix();

            writeln!(out, "{key_prefix}")?;
            if let Some(bucket) = bucket.or(config.storage.bucket) {
                let output_dir = output_dir
                    .or(config.storage.output_dir)
                    .map_or_else(std::env::current_dir, Ok)
                    .context("Failed to resolve the output directory")?;
                let dir = storage::download_dir(&output_dir, &bucket, &prefix.time);
                writeln!(out, "{}", dir.display())?;
            }
            if let Some(mirror) = mirror {
                use storage::ObjectSource;

                let source = storage::LocalObjectSource::new(mirror);
                for key in source.list(&key_prefix)? {
                    writeln!(out, "{key}")?;
                }
            }
            out.flush().context("Failed to flush output")?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
