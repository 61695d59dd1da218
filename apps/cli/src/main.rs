//! Boxcar CLI - package an image-classification workload for a managed training platform
//!
//! This CLI provides a `boxcar` command that downloads and converts the
//! CIFAR-10 dataset into framed record files, uploads it to object storage,
//! and builds, pushes and runs the training/serving container.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use boxcar_container::ContainerError;
use commands::types::{
    BuildArgs, ConvertArgs, FetchArgs, InspectArgs, PushArgs, ServeArgs, TrainArgs, UploadArgs,
};
use commands::{convert, fetch, image, inspect, run, upload};
use config::BoxcarConfig;

/// Boxcar - dataset conversion and container tooling for image classification
#[derive(Parser, Debug)]
#[command(
    name = "boxcar",
    author,
    version,
    about = "Boxcar - CIFAR-10 record conversion and training container tooling",
    long_about = "Boxcar converts the CIFAR-10 binary distribution into checksummed record files\nand drives the container runtime used to train and serve the model."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "BOXCAR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Configuration file (defaults to ~/.boxcar/config.toml merged with ./boxcar.toml)
    #[arg(short, long, global = true, env = "BOXCAR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the dataset archive
    Fetch(FetchArgs),

    /// Convert raw batch files into per-split record files
    Convert(ConvertArgs),

    /// Verify and summarize a converted dataset or record file
    Inspect(InspectArgs),

    /// Upload a converted dataset to object storage
    Upload(UploadArgs),

    /// Build the training/serving image
    Build(BuildArgs),

    /// Tag and push the image to its registry
    Push(PushArgs),

    /// Run the training entrypoint locally
    Train(TrainArgs),

    /// Run the serving entrypoint locally
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match BoxcarConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(2);
        }
    };

    // Initialize tracing
    let level = match args.log_level.as_deref().or(config.log_level.as_deref()).unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("{} {e}", "warning:".yellow());
    }

    if let Err(e) = run_command(args.command, &config).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(exit_code(&e));
    }
}

async fn run_command(command: Command, config: &BoxcarConfig) -> anyhow::Result<()> {
    match command {
        Command::Fetch(args) => fetch::execute(args, config).await,
        Command::Convert(args) => convert::execute(args, config).await,
        Command::Inspect(args) => inspect::execute(args).await,
        Command::Upload(args) => upload::execute(args, config).await,
        Command::Build(args) => image::build(args, config).await,
        Command::Push(args) => image::push(args, config).await,
        Command::Train(args) => run::train(args, config).await,
        Command::Serve(args) => run::serve(args, config).await,
    }
}

/// External tool failures hand their own exit code back to the operator.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ContainerError>())
        .and_then(ContainerError::exit_code)
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
