//! Command argument definitions shared between main.rs and the command modules.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Archive URL (defaults to [dataset].url)
    #[arg(long, env = "BOXCAR_DATASET_URL")]
    pub url: Option<String>,

    /// Where to store the archive (defaults to [dataset].archive)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Download even if the archive already exists
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Archive (.tar.gz) or directory holding the batch files (defaults to [dataset].archive)
    #[arg(short, long, env = "BOXCAR_SOURCE")]
    pub source: Option<PathBuf>,

    /// Destination directory for the record files (defaults to [dataset].output)
    #[arg(short, long, env = "BOXCAR_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Batch file for the train split (repeatable; replaces the configured mapping)
    #[arg(long = "train", value_name = "BATCH")]
    pub train: Vec<String>,

    /// Batch file for the validation split (repeatable)
    #[arg(long = "validation", value_name = "BATCH")]
    pub validation: Vec<String>,

    /// Batch file for the eval split (repeatable)
    #[arg(long = "eval", value_name = "BATCH")]
    pub eval: Vec<String>,

    /// Skip writing manifest.json
    #[arg(long)]
    pub no_manifest: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConvertArgs {
    pub fn overrides_splits(&self) -> bool {
        !(self.train.is_empty() && self.validation.is_empty() && self.eval.is_empty())
    }
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Converted dataset directory or a single .records file
    pub path: PathBuf,

    /// Print the first N records of each file
    #[arg(long, default_value_t = 0)]
    pub show: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Converted dataset directory (defaults to [dataset].output)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Destination bucket (defaults to [storage].bucket)
    #[arg(long, env = "BOXCAR_BUCKET")]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket (defaults to [storage].prefix)
    #[arg(long, env = "BOXCAR_PREFIX")]
    pub prefix: Option<String>,

    /// Region passed to the storage CLI (defaults to [storage].region)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

/// Image selection shared by the container commands.
#[derive(Args, Debug, Clone)]
pub struct ImageArgs {
    /// Image reference `[registry/]name[:tag]` (defaults to [image])
    #[arg(short, long, env = "BOXCAR_IMAGE")]
    pub image: Option<String>,

    /// Container runtime executable (defaults to [image].runtime)
    #[arg(long, env = "BOXCAR_RUNTIME")]
    pub runtime: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Build context directory (defaults to [image].context)
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Dockerfile path (defaults to [image].dockerfile)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    #[command(flatten)]
    pub image: ImageArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Local directory mounted at /opt/ml (defaults to [local].dir)
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Converted dataset directory copied into the data channel (defaults to [dataset].output)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// JSON file of hyperparameters merged over [hyperparameters]
    #[arg(long, value_name = "FILE")]
    pub hyperparameters: Option<PathBuf>,

    /// Single hyperparameter `key=value` (value parsed as JSON, else kept as a string)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Local directory mounted at /opt/ml (defaults to [local].dir)
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Host port mapped to the serving port (defaults to [local].port)
    #[arg(short, long, env = "BOXCAR_PORT")]
    pub port: Option<u16>,

    /// Run the container in the background
    #[arg(short, long)]
    pub detach: bool,
}
