//! batchresize CLI - Batch JPEG Downsizer
//!
//! Resizes every PNG/JPEG under a source tree into a flat destination
//! directory of quality-100 JPEGs, sequentially or with one task per file.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use batchresize::parallel::{ProgressTracker, ProgressUpdate};
use batchresize::{
    init, BatchReport, BatchResizer, CancellationToken, Cleaner, Config, Finder, LoggingConfig,
    TaskStatus,
};

/// batchresize - Batch JPEG Downsizer
#[derive(Parser)]
#[command(
    name = "batchresize",
    version,
    about = "Downsize a tree of PNG/JPEG images into quality-100 JPEGs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Resize every image under the input tree into the output directory
    Resize(ResizeArgs),
    /// Delete every file under a directory, creating it if missing
    Clean {
        /// Destination directory
        dest: PathBuf,
    },
    /// List the images a resize run would pick up
    Find {
        /// Source directory
        source: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path (.toml or .yaml)
        #[arg(default_value = "batchresize.toml")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct ResizeArgs {
    /// Source directory, searched recursively
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Destination directory (created if missing)
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Scale factor applied to width and height
    #[arg(short, long, value_name = "FACTOR")]
    scale: Option<f64>,

    /// Process files one at a time and stop at the first error
    #[arg(long)]
    sync: bool,

    /// Maximum transforms in flight (default: logical CPUs)
    #[arg(short, long, value_name = "COUNT")]
    jobs: Option<usize>,

    /// Empty the destination before resizing
    #[arg(long)]
    clean: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            1
        }
    };
    process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Resize(args) => {
            let mut config = match &args.config {
                Some(path) => Config::from_file(path)
                    .with_context(|| format!("Failed to load configuration {:?}", path))?,
                None => Config::default(),
            };
            apply_verbosity(&mut config.logging, cli.verbose, cli.quiet);
            init(&config.logging);
            run_resize(args, config, cli.quiet).await
        }
        Commands::Clean { dest } => {
            init(&verbosity_logging(cli.verbose, cli.quiet));
            let removed = Cleaner::clean(&dest)?;
            println!("{}: removed {} files from {}",
                     style("Success").green().bold(), removed, dest.display());
            Ok(0)
        }
        Commands::Find { source } => {
            init(&verbosity_logging(cli.verbose, cli.quiet));
            let files = Finder::find(&source)?;
            for file in &files {
                println!("{}", file.display());
            }
            info!("{} images found", files.len());
            Ok(0)
        }
        Commands::ExampleConfig { output } => {
            Config::default().to_file(&output)?;
            println!("{}: Generated example configuration: {}",
                     style("Success").green().bold(), output.display());
            Ok(0)
        }
    }
}

fn verbosity_logging(verbose: bool, quiet: bool) -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    apply_verbosity(&mut logging, verbose, quiet);
    logging
}

fn apply_verbosity(logging: &mut LoggingConfig, verbose: bool, quiet: bool) {
    if quiet {
        logging.level = "error".to_string();
    } else if verbose {
        logging.level = "debug".to_string();
    }
}

/// Run one batch; exit code 2 signals that some tasks did not complete
async fn run_resize(args: ResizeArgs, mut config: Config, quiet: bool) -> Result<i32> {
    if let Some(scale) = args.scale {
        config.resize.scale = scale;
    }
    if args.sync {
        config.resize.concurrent = false;
    }
    if args.jobs.is_some() {
        config.resize.max_concurrent = args.jobs;
    }
    config.validate()?;

    info!("Input: {:?}", args.input);
    info!("Output: {:?}", args.output);

    if args.clean {
        Cleaner::clean(&args.output)?;
    }

    let resizer = BatchResizer::new(config.resize.clone());
    let cancel = CancellationToken::new();
    if config.resize.concurrent {
        cancel_on_ctrl_c(cancel.clone());
    }

    let progress = if args.json || quiet {
        None
    } else {
        Some(spawn_progress_bar(&resizer.progress())?)
    };

    let result = resizer.run(&args.input, &args.output, &cancel).await;

    // Closing the channel ends the progress task even when the run failed early
    drop(resizer);
    if let Some(handle) = progress {
        let _ = handle.await;
    }

    let report = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &args.output);
    }

    Ok(if report.is_success() { 0 } else { 2 })
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; tasks that have not started will be cancelled");
            cancel.cancel();
        }
    });
}

fn spawn_progress_bar(tracker: &ProgressTracker) -> Result<JoinHandle<()>> {
    let mut updates = tracker.subscribe();
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    Ok(tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ProgressUpdate::Started { total }) => pb.set_length(total as u64),
                Ok(ProgressUpdate::TaskStarted { source, .. }) => pb.set_message(file_label(&source)),
                Ok(ProgressUpdate::TaskFinished { source, status, .. }) => {
                    if status == TaskStatus::Failed {
                        pb.println(format!("{} {}", style("failed").red(), source.display()));
                    }
                    pb.inc(1);
                }
                Ok(ProgressUpdate::BatchFinished { .. }) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => continue,
            }
        }
        pb.finish_and_clear();
    }))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Print processing summary
fn print_summary(report: &BatchReport, output: &Path) {
    println!();
    println!("{}", style("Processing Summary:").bold());
    println!("  {}: {}", style("Completed").green(), report.completed());
    if report.failed() > 0 {
        println!("  {}: {}", style("Failed").red(), report.failed());
    }
    if report.cancelled() > 0 {
        println!("  {}: {}", style("Cancelled").yellow(), report.cancelled());
    }
    println!("  {}: {:.2}s", style("Duration").blue(), report.elapsed.as_secs_f64());
    println!("  {}: {}", style("Output").cyan(), output.display());

    if !report.is_success() {
        println!();
        println!("{}", style("Tasks:").bold());
        for line in report.status_lines() {
            println!("  {}", line);
        }
    }
}
