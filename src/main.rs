//! CLI entry point for album-downloader.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use album_downloader::{AlbumPipeline, HttpClient, PipelineError, PipelineReport};
use album_downloader::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod console;

use app_config::FileConfig;
use cli::{Args, ErrorPolicy, ExistsPolicy};
use console::{ProgressStatusSink, TerminalPromptSink};

/// Exit code for a run that ended without saving everything it was asked to.
const EXIT_PARTIAL: u8 = 1;
/// Exit code for a fatal parse error or invalid configuration.
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let config = match app_config::load_default_file_config() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    init_tracing(&args, &config);
    debug!(?args, ?config, "arguments and configuration loaded");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(async {
        match run(args, config).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("error: {e:#}");
                match e.downcast_ref::<PipelineError>() {
                    Some(PipelineError::Parse(_)) => ExitCode::from(EXIT_FATAL),
                    _ => ExitCode::FAILURE,
                }
            }
        }
    });
    // A terminal prompt may still be blocked reading stdin.
    runtime.shutdown_background();
    code
}

/// Log level precedence: `RUST_LOG` > `--quiet` > `-v` count > config verbosity > info.
fn init_tracing(args: &Args, config: &FileConfig) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => config.verbosity.map_or("info", |v| v.log_level()),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args, config: FileConfig) -> Result<ExitCode> {
    let output_dir = args
        .output_dir
        .clone()
        .or(config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let connect_timeout = args
        .connect_timeout
        .or(config.connect_timeout_secs)
        .unwrap_or(CONNECT_TIMEOUT_SECS);
    let read_timeout = args
        .read_timeout
        .or(config.read_timeout_secs)
        .unwrap_or(READ_TIMEOUT_SECS);
    let on_exists = args.on_exists.or(config.on_exists).unwrap_or(ExistsPolicy::Ask);
    let on_error = args.on_error.or(config.on_error).unwrap_or(ErrorPolicy::Ask);
    let tolerate = !args.strict && config.tolerate_parse_errors.unwrap_or(true);

    let client = HttpClient::with_timeouts(connect_timeout, read_timeout)
        .context("Failed to build HTTP client")?;
    let progress = Arc::new(ProgressStatusSink::new(args.quiet || args.json));
    let prompt = Arc::new(TerminalPromptSink::new(
        on_exists,
        on_error,
        Arc::clone(&progress),
    ));
    let pipeline = Arc::new(
        AlbumPipeline::new(client, progress, prompt).tolerate_parse_errors(tolerate),
    );

    let ctrl_c = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current step");
                pipeline.abort();
            }
        })
    };

    let code = if args.dry_run {
        dry_run(&pipeline, &args).await
    } else {
        download(&pipeline, &args, &output_dir).await
    };
    ctrl_c.abort();
    code
}

async fn dry_run(pipeline: &AlbumPipeline, args: &Args) -> Result<ExitCode> {
    let Some(assets) = pipeline.extract_only(&args.url).await? else {
        info!("album page not available");
        return Ok(ExitCode::from(EXIT_PARTIAL));
    };
    if args.json {
        let urls: Vec<&str> = assets.iter().map(|a| a.source_url()).collect();
        println!("{}", serde_json::to_string_pretty(&urls)?);
    } else {
        for asset in &assets {
            println!("{}", asset.source_url());
        }
    }
    info!(count = assets.len(), "dry run complete");
    Ok(ExitCode::SUCCESS)
}

async fn download(pipeline: &AlbumPipeline, args: &Args, output_dir: &Path) -> Result<ExitCode> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory '{}'", output_dir.display()))?;

    let report = pipeline.run(&args.url, output_dir).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(ExitCode::from(exit_status(&report)))
}

fn print_summary(report: &PipelineReport) {
    if report.page_unavailable {
        println!("album page not available, nothing downloaded");
        return;
    }
    let download = &report.download;
    println!(
        "{} photos found, {} saved, {} skipped, {} ignored{}",
        report.assets_found,
        download.completed.len(),
        download.skipped.len(),
        download.ignored.len(),
        if report.aborted { " (aborted)" } else { "" }
    );
}

fn exit_status(report: &PipelineReport) -> u8 {
    if report.aborted || report.page_unavailable || !report.download.ignored.is_empty() {
        EXIT_PARTIAL
    } else {
        0
    }
}
